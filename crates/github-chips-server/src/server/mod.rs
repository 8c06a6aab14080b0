use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use github_chips::{AddOn, AnonymousOAuth, GitHubOAuth, OAuthProvider};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

mod routes;

/// Server application state
pub struct AppState {
    pub addon: AddOn,
    pub oauth: Arc<GitHubOAuth>,
    /// Public URL of this service, without a trailing slash
    pub base_url: String,
}

impl AppState {
    pub fn new(addon: AddOn, oauth: Arc<GitHubOAuth>, base_url: impl Into<String>) -> Self {
        Self {
            addon,
            oauth,
            base_url: base_url.into(),
        }
    }

    /// OAuth capability for the invoking user. Callers without an identity
    /// never read or store a token.
    pub fn oauth_for(&self, user: Option<&str>) -> Box<dyn OAuthProvider> {
        match user {
            Some(user) => Box::new(self.oauth.for_user(user)),
            None => Box::new(AnonymousOAuth),
        }
    }
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = create_router(state);

    info!("Starting Axum HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(routes::addon::router())
        .merge(routes::oauth::router())
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Liveness check (for load balancers)
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "github-chips-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
