//! Failure injection tests: unhealthy backends, dead backends, recovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

fn short_probes(config: &mut balancerd::config::BalancerConfig) {
    config.health_check.enabled = true;
    config.health_check.interval = Duration::from_millis(100);
    config.health_check.timeout = Duration::from_millis(50);
}

#[tokio::test]
async fn test_no_healthy_backend_returns_503() {
    // Port 9 is unassigned on loopback: the probe gets connection refused.
    let mut config = common::test_config(vec!["http://127.0.0.1:9".to_string()]);
    short_probes(&mut config);
    let (proxy, shutdown, pool) = common::start_proxy(config).await;

    let evicted =
        common::wait_until(Duration::from_secs(2), || !pool.all()[0].is_healthy()).await;
    assert!(evicted, "dead backend was never marked unhealthy");

    let client = common::http_client();
    let res = client
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "No healthy backends");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_failure_returns_502() {
    // Health checks off: the dead backend stays eligible, so the forward
    // itself fails after selection.
    let config = common::test_config(vec!["http://127.0.0.1:9".to_string()]);
    let (proxy, shutdown, pool) = common::start_proxy(config).await;

    let client = common::http_client();
    let res = client
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);

    // The failed forward released its accounting.
    let drained =
        common::wait_until(Duration::from_secs(1), || pool.all()[0].active() == 0).await;
    assert!(drained, "active count leaked after upstream failure");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unhealthy_backend_excluded_from_selection() {
    let good = common::start_mock_backend("alive").await;
    let bad =
        common::start_programmable_backend(|_head| async move { (500, "broken".to_string()) })
            .await;

    let mut config = common::test_config(vec![format!("http://{good}"), format!("http://{bad}")]);
    short_probes(&mut config);
    let (proxy, shutdown, pool) = common::start_proxy(config).await;

    let evicted =
        common::wait_until(Duration::from_secs(2), || !pool.all()[1].is_healthy()).await;
    assert!(evicted, "500-ing backend was never marked unhealthy");

    let client = common::http_client();
    for _ in 0..5 {
        let body = client
            .get(format!("http://{proxy}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "alive");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_backend_recovers_after_probes_pass() {
    let failing = Arc::new(AtomicBool::new(true));
    let state = failing.clone();
    let backend = common::start_programmable_backend(move |_head| {
        let state = state.clone();
        async move {
            if state.load(Ordering::SeqCst) {
                (500, "down".to_string())
            } else {
                (200, "recovered".to_string())
            }
        }
    })
    .await;

    let mut config = common::test_config(vec![format!("http://{backend}")]);
    short_probes(&mut config);
    let (proxy, shutdown, pool) = common::start_proxy(config).await;

    let evicted =
        common::wait_until(Duration::from_secs(2), || !pool.all()[0].is_healthy()).await;
    assert!(evicted, "failing backend was never marked unhealthy");

    let client = common::http_client();
    let res = client
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    // Heal the backend; the next passing probe must re-admit it.
    failing.store(false, Ordering::SeqCst);
    let readmitted =
        common::wait_until(Duration::from_secs(2), || pool.all()[0].is_healthy()).await;
    assert!(readmitted, "healed backend was never re-admitted");

    let body = client
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "recovered");

    shutdown.trigger();
}
