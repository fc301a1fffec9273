//! HTTP transport: server-sent event stream, JSON endpoints and static files.

mod api;
mod error;
mod handlers;
mod server;

pub use api::{HistoryResponse, StatusResponse};
pub use error::ServerError;
pub use handlers::{get_history, get_status, get_stream, AppState};
pub use server::TailServer;
