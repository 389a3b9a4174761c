//! Outbound email abstraction.
//!
//! The auth flows need three notifications: the verification link sent at
//! signup (and on resend), the temporary password sent by the reset flow,
//! and the notice sent after a password change. Delivery itself (SMTP,
//! API, queue) lives behind this trait.

use tracing::info;

use crate::error::CoreResult;

pub trait Mailer: Send + Sync {
    fn send_verification(
        &self,
        email: &str,
        url: &str,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Deliver a temporary password out-of-band after a reset.
    fn send_password_reset(
        &self,
        email: &str,
        temp_password: &str,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    fn send_password_changed(&self, email: &str) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send_verification(&self, email: &str, url: &str) -> CoreResult<()> {
        info!(to = %email, %url, "verification mail send stub");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, _temp_password: &str) -> CoreResult<()> {
        // The temporary password is deliberately not logged.
        info!(to = %email, "password reset mail send stub");
        Ok(())
    }

    async fn send_password_changed(&self, email: &str) -> CoreResult<()> {
        info!(to = %email, "password changed notice send stub");
        Ok(())
    }
}
