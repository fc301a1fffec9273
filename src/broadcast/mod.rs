//! Multi-subscriber fan-out of tailed lines.

mod broadcaster;
mod error;
mod message;
mod subscriber;
mod subscription;

pub use broadcaster::Broadcaster;
pub use error::DeliveryError;
pub use message::Message;
pub use subscriber::{ChannelSubscriber, Subscriber, SubscriberId};
pub use subscription::Subscription;
