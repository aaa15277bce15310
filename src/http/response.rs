//! Response streaming with connection accounting.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::load_balancer::backend::ConnectionGuard;

/// Response body that carries the chosen backend's connection guard.
///
/// The active-connection count must cover the whole forwarding window, not
/// just the handler's lifetime: the upstream response may still be streaming
/// to the client long after the handler returned. Dropping this body — end of
/// stream, request timeout, or client disconnect — releases the guard, which
/// decrements the counter exactly once.
#[derive(Debug)]
pub struct TrackedBody {
    inner: Body,
    _guard: ConnectionGuard,
}

impl TrackedBody {
    pub fn new(inner: Body, guard: ConnectionGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
