//! GitHub OAuth2 authorization.
//!
//! The add-on only needs three things from OAuth, captured by
//! [`OAuthProvider`]: the current token (if any), a URL that starts the
//! authorization flow, and a way to forget the token. [`GitHubOAuth`]
//! implements the flow against github.com and keeps tokens in a
//! [`PropertyStore`], one entry per user. Callers without a stable identity
//! get [`AnonymousOAuth`], which never holds a token and never offers one.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// Repository and project read access.
pub const GITHUB_SCOPE: &str = "repo read:project";

/// Minutes an issued `state` stays redeemable.
const STATE_TTL_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Authorization state expired")]
    StateExpired,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
}

/// Per-user OAuth capability handed to the add-on entry points.
pub trait OAuthProvider: Send + Sync {
    /// The user's access token, or `None` when they have not authorized.
    fn access_token(&self) -> Option<String>;

    /// URL that starts the authorization flow, or `None` when the caller
    /// has no identity a token could be stored under.
    fn authorization_url(&self) -> Option<String>;

    /// Forget the user's token.
    fn reset(&self);
}

/// Opaque string key/value storage for tokens and pending states.
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn delete(&self, key: &str);
}

/// In-process [`PropertyStore`]; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    values: DashMap<String, String>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.values.remove(key);
    }
}

/// Capability for callers without an identity: no token, no authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousOAuth;

impl OAuthProvider for AnonymousOAuth {
    fn access_token(&self) -> Option<String> {
        None
    }

    fn authorization_url(&self) -> Option<String> {
        None
    }

    fn reset(&self) {}
}

/// OAuth app registration and endpoints.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Where GitHub sends the user back with `code` and `state`.
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
}

impl OAuthConfig {
    /// Configuration for a github.com OAuth app.
    pub fn github(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            authorize_url: GITHUB_AUTHORIZE_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            scope: GITHUB_SCOPE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// An issued `state` waiting for its callback.
#[derive(Debug, Clone)]
struct PendingAuthorization {
    user: String,
    expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// GitHub OAuth2 web flow backed by a property store.
pub struct GitHubOAuth {
    config: OAuthConfig,
    store: Arc<dyn PropertyStore>,
    http: reqwest::Client,
    pending: DashMap<String, PendingAuthorization>,
    state_ttl: TimeDelta,
}

impl GitHubOAuth {
    pub fn new(config: OAuthConfig, store: Arc<dyn PropertyStore>, http: reqwest::Client) -> Self {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            warn!("GitHub OAuth client id or secret not configured; authorization will fail");
        }
        Self {
            config,
            store,
            http,
            pending: DashMap::new(),
            state_ttl: TimeDelta::minutes(STATE_TTL_MINUTES),
        }
    }

    /// How long an issued `state` stays redeemable.
    pub fn with_state_ttl(mut self, ttl: TimeDelta) -> Self {
        self.state_ttl = ttl;
        self
    }

    fn token_key(user: &str) -> String {
        format!("oauth2.github.{user}")
    }

    /// Number of issued states not yet redeemed or pruned.
    pub fn pending_states(&self) -> usize {
        self.pending.len()
    }

    fn prune_expired(&self) {
        let before = self.pending.len();
        self.pending.retain(|_, p| !p.is_expired());
        let pruned = before.saturating_sub(self.pending.len());
        if pruned > 0 {
            debug!(pruned, "Pruned expired authorization states");
        }
    }

    /// The OAuth capability for one user.
    pub fn for_user(self: &Arc<Self>, user: impl Into<String>) -> UserOAuth {
        UserOAuth {
            service: Arc::clone(self),
            user: user.into(),
        }
    }

    pub fn access_token(&self, user: &str) -> Option<String> {
        self.store
            .get(&Self::token_key(user))
            .filter(|t| !t.is_empty())
    }

    /// Build an authorization URL with a fresh `state` bound to `user`.
    /// Expired states are dropped first.
    pub fn authorization_url(&self, user: &str) -> String {
        self.prune_expired();

        let state = hex::encode(rand::random::<[u8; 16]>());
        self.pending.insert(
            state.clone(),
            PendingAuthorization {
                user: user.to_string(),
                expires_at: Utc::now() + self.state_ttl,
            },
        );

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope)
            .append_pair("state", &state)
            .finish();
        format!("{}?{query}", self.config.authorize_url)
    }

    pub fn reset(&self, user: &str) {
        debug!(user = %user, "Resetting GitHub authorization");
        self.store.delete(&Self::token_key(user));
    }

    /// Complete the flow: resolve `state` to its user, exchange `code` for a
    /// token and store it. Returns the user the token now belongs to.
    /// A state is consumed by its first callback, expired or not.
    #[instrument(skip(self, code, state))]
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<String, OAuthError> {
        let (_, pending) = self.pending.remove(state).ok_or(OAuthError::InvalidState)?;
        if pending.is_expired() {
            warn!(user = %pending.user, "Authorization state expired");
            return Err(OAuthError::StateExpired);
        }
        let user = pending.user;

        let token = self.exchange_code(code).await?;
        self.store.set(&Self::token_key(&user), token);
        info!(user = %user, "GitHub authorization completed");
        Ok(user)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let res = self
            .http
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchangeFailed(format!(
                "token endpoint {}: {}",
                status, body
            )));
        }

        // GitHub reports exchange errors with a 200 and an `error` field.
        let token = res
            .json::<TokenResponse>()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(format!("Invalid token response: {}", e)))?;

        match (token.access_token, token.error) {
            (_, Some(error)) => Err(OAuthError::Denied(
                token.error_description.unwrap_or(error),
            )),
            (Some(access_token), None) if !access_token.is_empty() => Ok(access_token),
            _ => Err(OAuthError::TokenExchangeFailed(
                "token response missing access_token".to_string(),
            )),
        }
    }
}

/// [`GitHubOAuth`] bound to one user.
#[derive(Clone)]
pub struct UserOAuth {
    service: Arc<GitHubOAuth>,
    user: String,
}

impl UserOAuth {
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl OAuthProvider for UserOAuth {
    fn access_token(&self) -> Option<String> {
        self.service.access_token(&self.user)
    }

    fn authorization_url(&self) -> Option<String> {
        Some(self.service.authorization_url(&self.user))
    }

    fn reset(&self) {
        self.service.reset(&self.user)
    }
}
