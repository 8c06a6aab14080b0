//! Server configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `GITHUB_CHIPS_`. Nested keys use a
//! double underscore, so `github.client_id` is read from
//! `GITHUB_CHIPS_GITHUB__CLIENT_ID`.
//!
//! # Examples
//!
//! ```bash
//! GITHUB_CHIPS_BASE_URL=https://chips.example.com \
//! GITHUB_CHIPS_GITHUB__CLIENT_ID=Iv1.abc \
//! GITHUB_CHIPS_GITHUB__CLIENT_SECRET=secret \
//! cargo run -p github-chips-server
//! ```

use clap::ValueEnum;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const ENV_PREFIX: &str = "GITHUB_CHIPS";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output for local development
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// GitHub OAuth app and API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub client_id: String,
    pub client_secret: String,
    /// REST root; GraphQL is served at `{api_base}/graphql`
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: github_chips::client::DEFAULT_API_BASE.to_string(),
            timeout_secs: github_chips::client::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Public URL of this service, used for action endpoints and the OAuth
    /// redirect
    pub base_url: String,
    pub log_format: LogFormat,
    pub github: GitHubSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            base_url: "http://localhost:8080".to_string(),
            log_format: LogFormat::default(),
            github: GitHubSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Where GitHub sends the user after authorization.
    pub fn redirect_uri(&self) -> String {
        format!("{}/oauth/callback", self.base_url)
    }

    pub fn github_timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs)
    }

    pub fn log_config(&self) {
        info!(listen = %self.listen, base_url = %self.base_url, "Server configuration");
        info!(api_base = %self.github.api_base, timeout_secs = self.github.timeout_secs, "GitHub API");
        if self.github.client_id.is_empty() {
            warn!("GitHub OAuth client id is not set; only public resources can be previewed");
        }
    }
}
