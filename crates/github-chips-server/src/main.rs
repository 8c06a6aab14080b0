use anyhow::{Context, Result};
use clap::Parser;
use github_chips::{AddOn, GitHubOAuth, MemoryPropertyStore, OAuthConfig, ReqwestTransport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod server;
mod telemetry;
mod workspace;

use crate::config::{LogFormat, ServerConfig};
use crate::server::AppState;

/// GitHub Smart Chips - link previews for GitHub URLs in Google Workspace
#[derive(Parser, Debug)]
#[command(name = "github-chips-server")]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GITHUB_CHIPS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the configuration)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log output format (overrides the configuration)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }

    telemetry::init(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to init telemetry: {}", e))?;

    info!("GitHub Smart Chips starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.log_config();

    let transport = ReqwestTransport::new(config.github_timeout())
        .context("Failed to build GitHub HTTP client")?;
    let addon = AddOn::new(Arc::new(transport)).with_api_base(&config.github.api_base);

    let oauth_http = reqwest::Client::builder()
        .timeout(config.github_timeout())
        .build()
        .context("Failed to build OAuth HTTP client")?;
    let oauth = Arc::new(GitHubOAuth::new(
        OAuthConfig::github(
            &config.github.client_id,
            &config.github.client_secret,
            config.redirect_uri(),
        ),
        Arc::new(MemoryPropertyStore::new()),
        oauth_http,
    ));

    let state = Arc::new(AppState::new(addon, oauth, &config.base_url));
    server::start(state, config.listen).await?;

    Ok(())
}
