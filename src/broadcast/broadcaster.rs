//! Subscriber registry and line fan-out.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::subscriber::{ChannelSubscriber, Subscriber, SubscriberId};
use super::subscription::Subscription;
use super::Message;
use crate::history::RingHistory;
use crate::watcher::Line;

struct Registered {
    subscriber: Box<dyn Subscriber>,
    /// Highest line sequence number this subscriber already has.
    seen_through: Option<u64>,
}

impl Registered {
    fn has_seen(&self, seq: u64) -> bool {
        self.seen_through.is_some_and(|seen| seq <= seen)
    }
}

struct Inner {
    history: Arc<RingHistory<Line>>,
    registry: Mutex<HashMap<SubscriberId, Registered>>,
}

/// Fans new lines out to every registered subscriber.
///
/// A joining subscriber first receives the history window, then every line
/// that was not part of it. The registry lock covers join and fan-out, and
/// each subscriber tracks the last sequence number it has seen, so a line
/// racing a join arrives exactly once. Cloning shares the same registry.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    /// Create a broadcaster replaying `history` to new subscribers.
    #[must_use]
    pub fn new(history: Arc<RingHistory<Line>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                history,
                registry: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriberId, Registered>> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber and send it the current history window.
    ///
    /// A subscriber whose initial delivery fails is not kept. Joining with
    /// an id that is already registered replaces the old subscriber.
    pub fn join(&self, id: SubscriberId, subscriber: impl Subscriber + 'static) {
        let mut registry = self.registry();

        let snapshot = self.inner.history.snapshot();
        let seen_through = snapshot.last().map(|line| line.seq);
        let message = Message::Initial {
            lines: snapshot.into_iter().map(|line| line.text).collect(),
        };

        if let Err(e) = subscriber.send(&message) {
            tracing::warn!(
                subscriber = %id,
                error = %e,
                "Failed to send history, dropping subscriber"
            );
            return;
        }

        registry.insert(
            id,
            Registered {
                subscriber: Box::new(subscriber),
                seen_through,
            },
        );
        tracing::info!(subscriber = %id, total = registry.len(), "Subscriber joined");
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn leave(&self, id: SubscriberId) {
        let mut registry = self.registry();
        if registry.remove(&id).is_some() {
            tracing::info!(subscriber = %id, total = registry.len(), "Subscriber left");
        }
    }

    /// Deliver one new line to every registered subscriber.
    ///
    /// Subscribers whose delivery fails are removed; the rest still receive
    /// the line.
    pub fn on_line(&self, line: &Line) {
        let message = Message::Update {
            line: line.text.clone(),
        };

        self.registry().retain(|id, entry| {
            if entry.has_seen(line.seq) {
                return true;
            }
            match entry.subscriber.send(&message) {
                Ok(()) => {
                    entry.seen_through = Some(line.seq);
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        subscriber = %id,
                        error = %e,
                        "Dropping subscriber after failed send"
                    );
                    false
                }
            }
        });
    }

    /// Join a channel-backed subscriber and return its receiving side.
    ///
    /// The subscriber leaves the registry when the [`Subscription`] drops.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId::new();
        self.join(id, ChannelSubscriber::new(tx));
        Subscription::new(id, rx, self.clone())
    }

    /// Consume lines from the watcher channel until it closes or `cancel`
    /// fires, fanning each one out.
    pub async fn forward(
        &self,
        mut lines: mpsc::UnboundedReceiver<Line>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                line = lines.recv() => match line {
                    Some(line) => self.on_line(&line),
                    None => break,
                },
            }
        }
        tracing::debug!("Line forwarder stopped");
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.registry().contains_key(&id)
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
