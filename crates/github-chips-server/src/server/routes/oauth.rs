//! GitHub OAuth redirect target
//!
//! - GET /oauth/callback - completes authorization started from a card

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const SUCCESS_MESSAGE: &str = "Success! You can close this tab.";
pub const DENIED_MESSAGE: &str = "Denied. You can close this tab and try again.";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/oauth/callback", get(oauth_callback_handler))
}

/// Query parameters GitHub appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined
    pub error: Option<String>,
}

#[instrument(skip_all)]
async fn oauth_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Html<String> {
    if let Some(ref error) = query.error {
        warn!(error = %error, "GitHub authorization declined");
        return Html(page(DENIED_MESSAGE));
    }

    let (Some(code), Some(oauth_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        warn!("OAuth callback missing code or state");
        return Html(page(DENIED_MESSAGE));
    };

    match state.oauth.handle_callback(code, oauth_state).await {
        Ok(user) => {
            info!(user = %user, "GitHub account connected");
            Html(page(SUCCESS_MESSAGE))
        }
        Err(e) => {
            warn!(error = %e, "GitHub authorization failed");
            Html(page(DENIED_MESSAGE))
        }
    }
}

fn page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>GitHub Smart Chips</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
            margin: 0;
        }}
    </style>
</head>
<body>
    <p>{message}</p>
</body>
</html>"#
    )
}
