//! Background expiry sweep for the refresh token ledger.

use std::time::Duration;

use bdaybook_core::repository::RefreshTokenRepository;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::ledger::RefreshTokenLedger;

/// Default sweep cadence.
pub const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// Start the periodic expired-token sweeper.
///
/// Runs independently of request traffic; a row deleted by a concurrent
/// rotation just before the sweep examines it is benign. Errors are
/// logged and never stop the loop.
pub fn start_expiry_sweeper<R>(
    ledger: RefreshTokenLedger<R>,
    interval: Duration,
) -> JoinHandle<()>
where
    R: RefreshTokenRepository + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);

        loop {
            timer.tick().await;
            match ledger.sweep_expired(Utc::now()).await {
                Ok(count) if count > 0 => {
                    debug!(rows_cleaned = count, "expired refresh tokens cleaned");
                }
                Err(e) => error!(error = %e, "refresh token sweep failed"),
                _ => {}
            }
        }
    })
}
