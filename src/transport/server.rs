//! HTTP server with axum router and graceful shutdown.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::error::ServerError;
use super::handlers::{get_history, get_status, get_stream, AppState};
use crate::config::ServerConfig;

/// HTTP front end streaming tailed lines to browsers.
pub struct TailServer {
    /// Server configuration.
    config: ServerConfig,
    /// Application state shared across handlers.
    state: AppState,
}

impl TailServer {
    /// Create a new server with default configuration.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            config: ServerConfig::default(),
            state,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router with all routes and middleware.
    ///
    /// Paths outside `/api` are served from the web root.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/api/stream", get(get_stream))
            .route("/api/history", get(get_history))
            .route("/api/status", get(get_status))
            .fallback_service(ServeDir::new(&self.config.web_root))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server, binding to the configured address.
    ///
    /// The server runs until the state's cancellation token is triggered,
    /// at which point open streams end and it shuts down gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.address();
        let cancel = self.state.cancel.clone();
        let app = self.build_router();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::BindError {
                address: addr.clone(),
                source,
            })?;

        tracing::info!(
            address = %addr,
            web_root = %self.config.web_root.display(),
            "Starting HTTP server"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("HTTP server shutting down gracefully");
            })
            .await
            .map_err(ServerError::Serve)
    }
}
