//! Receiving side of a channel-backed subscriber.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

use super::subscriber::SubscriberId;
use super::{Broadcaster, Message};

/// Messages for one subscriber, starting with its history window.
///
/// Dropping the subscription removes it from the broadcaster.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<Message>,
    broadcaster: Broadcaster,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriberId,
        rx: mpsc::UnboundedReceiver<Message>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            id,
            rx,
            broadcaster,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the subscriber has been removed and every queued
    /// message has been received.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.leave(self.id);
    }
}
