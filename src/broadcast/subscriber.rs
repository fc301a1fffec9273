//! Subscriber handles.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{DeliveryError, Message};

/// Opaque identity of one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Send capability of a subscriber.
///
/// `send` is called with the registry lock held and must not block.
pub trait Subscriber: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber can no longer receive messages.
    fn send(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Subscriber backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelSubscriber {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

impl Subscriber for ChannelSubscriber {
    fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        self.tx
            .send(message.clone())
            .map_err(|_| DeliveryError::Closed)
    }
}
