//! Server-sent event plumbing for partner live channels.
//!
//! A [`LiveEventStream`] wraps the receiving half of a broker channel together with its [`Subscription`] handle.
//! The stream yields one `data:` frame per [`LiveEvent`]; when the HTTP connection goes away actix drops the
//! stream, the subscription's drop guard runs, and the sink is removed from the broker synchronously.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use actix_web::web::Bytes;
use futures::Stream;
use mesa_engine::events::{LiveEvent, Subscription};
use tokio::sync::mpsc;

use crate::errors::ServerError;

pub struct LiveEventStream {
    // Held for its drop guard; unsubscribes when the stream is dropped.
    _subscription: Subscription,
    receiver: mpsc::UnboundedReceiver<LiveEvent>,
}

impl LiveEventStream {
    pub fn new(subscription: Subscription, receiver: mpsc::UnboundedReceiver<LiveEvent>) -> Self {
        Self { _subscription: subscription, receiver }
    }
}

impl Stream for LiveEventStream {
    type Item = Result<Bytes, ServerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(sse_frame(&event))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn sse_frame(event: &LiveEvent) -> Result<Bytes, ServerError> {
    let json = serde_json::to_string(event).map_err(|e| ServerError::Unspecified(e.to_string()))?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
