//! HTTP handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::api::{HistoryResponse, StatusResponse};
use crate::broadcast::Broadcaster;
use crate::hub::TailHub;
use crate::watcher::TailWatcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub watcher: Arc<TailWatcher>,
    pub broadcaster: Broadcaster,
    /// Ends open streams on shutdown.
    pub cancel: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(watcher: Arc<TailWatcher>, broadcaster: Broadcaster) -> Self {
        Self {
            watcher,
            broadcaster,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    /// State serving the watcher and broadcaster of a running hub.
    #[must_use]
    pub fn from_hub(hub: &TailHub) -> Self {
        Self::new(Arc::clone(hub.watcher()), hub.broadcaster().clone())
    }
}

/// GET /api/stream - SSE stream: one `initial` event, then `update` events.
pub async fn get_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broadcaster.subscribe();
    tracing::debug!(subscriber = %subscription.id(), "Stream opened");

    let stream = subscription
        .take_until(state.cancel.cancelled_owned())
        .filter_map(|message| async move {
            let data = serde_json::to_string(&message).ok()?;
            Some(Ok(Event::default().event(message.kind()).data(data)))
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/history - Current history window.
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        lines: state.watcher.history(),
    })
}

/// GET /api/status - Watcher and subscriber status.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        path: state.watcher.path().display().to_string(),
        state: state.watcher.state(),
        offset: state.watcher.offset(),
        subscribers: state.broadcaster.subscriber_count(),
        history_len: state.watcher.history_lines().len(),
        started_at: state.started_at,
    })
}
