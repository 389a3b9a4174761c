//! bdaybook server — application entry point.

use std::env;

use anyhow::Context;
use bdaybook_auth::sweep::{self, start_expiry_sweeper};
use bdaybook_auth::{AuthConfig, AuthService, RefreshTokenLedger};
use bdaybook_core::mailer::LogMailer;
use bdaybook_store::{MemoryRefreshTokenRepository, MemoryUserRepository};
use tracing_subscriber::EnvFilter;

/// Build the auth configuration from the environment. Secrets are
/// required; TTLs fall back to the policy defaults.
fn auth_config_from_env() -> anyhow::Result<AuthConfig> {
    let mut config = AuthConfig {
        access_token_secret: env::var("BDAYBOOK_ACCESS_SECRET")
            .context("BDAYBOOK_ACCESS_SECRET is not set")?,
        refresh_token_secret: env::var("BDAYBOOK_REFRESH_SECRET")
            .context("BDAYBOOK_REFRESH_SECRET is not set")?,
        verification_token_secret: env::var("BDAYBOOK_VERIFICATION_SECRET")
            .context("BDAYBOOK_VERIFICATION_SECRET is not set")?,
        pepper: env::var("BDAYBOOK_PASSWORD_PEPPER").ok(),
        ..AuthConfig::default()
    };
    if let Ok(base_url) = env::var("BDAYBOOK_BASE_URL") {
        config.verification_base_url = base_url;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("bdaybook=info".parse()?),
        )
        .json()
        .init();

    tracing::info!("Starting bdaybook server...");

    let config = auth_config_from_env()?;

    let user_repo = MemoryUserRepository::new();
    let token_repo = MemoryRefreshTokenRepository::new();
    let ledger = RefreshTokenLedger::new(token_repo, config.clone());

    let sweeper = start_expiry_sweeper(ledger.clone(), sweep::DAILY);

    // TODO: mount the HTTP routing layer over the facade
    let _service = AuthService::new(user_repo, ledger, LogMailer, config);

    tracing::info!("bdaybook auth core ready");

    tokio::signal::ctrl_c().await?;
    sweeper.abort();

    tracing::info!("bdaybook server stopped.");
    Ok(())
}
