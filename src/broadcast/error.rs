//! Broadcast error types.

/// Errors reported by a subscriber when a message cannot be delivered.
///
/// Any delivery error removes the subscriber from the registry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The receiving side is gone.
    #[error("Subscriber channel closed")]
    Closed,

    /// The transport refused the message.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}
