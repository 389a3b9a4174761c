//! Session facade — signup, login, logout, refresh, verification, and
//! password management orchestrated over the credential store, hashing
//! service, token issuer, refresh ledger, and mailer.

use bdaybook_core::error::CoreError;
use bdaybook_core::mailer::Mailer;
use bdaybook_core::models::user::{CreateUser, PublicUser, UpdateUser, User};
use bdaybook_core::repository::{RefreshTokenRepository, UserRepository};
use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::guard;
use crate::ledger::RefreshTokenLedger;
use crate::password;
use crate::token::{self, TokenPair};

/// Length of the temporary passwords minted by the reset flow.
const TEMP_PASSWORD_LEN: usize = 12;

/// Input for the signup flow.
#[derive(Debug)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub birthday: NaiveDate,
}

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for the password change flow.
#[derive(Debug)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Authentication facade.
///
/// Generic over the repository and mailer implementations so that the
/// auth layer has no dependency on the storage or delivery crates.
pub struct AuthService<U, R, M> {
    user_repo: U,
    ledger: RefreshTokenLedger<R>,
    mailer: M,
    config: AuthConfig,
}

impl<U, R, M> AuthService<U, R, M>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    M: Mailer,
{
    pub fn new(user_repo: U, ledger: RefreshTokenLedger<R>, mailer: M, config: AuthConfig) -> Self {
        Self {
            user_repo,
            ledger,
            mailer,
            config,
        }
    }

    /// Create an account and log it in: hash the password, store the
    /// user, send the verification mail, and issue a token pair.
    ///
    /// A duplicate email fails with `EmailTaken`. A failed verification
    /// mail does NOT abort the signup — the account stays usable and can
    /// request a resend.
    pub async fn signup(&self, input: SignupInput) -> AuthResult<TokenPair> {
        self.check_password_policy(&input.password)?;
        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = self
            .user_repo
            .create(CreateUser {
                email: input.email,
                password_hash,
                full_name: input.full_name,
                birthday: input.birthday,
            })
            .await
            .map_err(|e| match e {
                CoreError::AlreadyExists { .. } => AuthError::EmailTaken,
                other => AuthError::from(other),
            })?;

        if let Err(err) = self.send_verification_mail(&user).await {
            warn!(user_id = %user.id, error = %err, "verification mail failed at signup");
        }

        self.issue_session(user.id, &user.email).await
    }

    /// Authenticate with email + password and issue a token pair.
    ///
    /// Unknown email and wrong password are the same `InvalidCredentials`
    /// kind, and both paths cost one Argon2id computation.
    pub async fn login(&self, input: LoginInput) -> AuthResult<TokenPair> {
        let user = match self.user_repo.get_by_email(&input.email).await {
            Ok(user) => user,
            Err(CoreError::NotFound { .. }) => {
                // Burn a hash so unknown accounts are not cheaper to probe
                // than wrong passwords.
                let _ = password::hash_password(&input.password, self.config.pepper.as_deref());
                return Err(AuthError::InvalidCredentials);
            }
            Err(other) => return Err(other.into()),
        };

        let matches = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(user.id, &user.email).await
    }

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// Any failure — bad signature, lapsed TTL, unknown subject, absent
    /// or already-rotated ledger row — is the same `RefreshDenied`.
    pub async fn refresh(&self, presented_token: &str) -> AuthResult<TokenPair> {
        let claims = token::decode_token(presented_token, &self.config.refresh_token_secret)
            .map_err(|_| AuthError::RefreshDenied)?;
        let user_id = claims.subject().map_err(|_| AuthError::RefreshDenied)?;

        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => AuthError::RefreshDenied,
                other => AuthError::from(other),
            })?;

        self.ledger.rotate(user.id, &user.email, presented_token).await
    }

    /// Revoke one refresh token, or all of the caller's tokens when
    /// `token` is `None`.
    pub async fn logout(&self, user_id: Uuid, token: Option<&str>) -> AuthResult<()> {
        self.ledger.revoke(user_id, token).await
    }

    /// Change the caller's password. Verifies the current password,
    /// rehashes, revokes every refresh token (forces re-login on all
    /// devices), and sends a changed-notice mail (non-fatal).
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> AuthResult<()> {
        let user = self.get_user(user_id).await?;

        let matches = password::verify_password(
            &input.current_password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        self.check_password_policy(&input.new_password)?;
        let new_hash =
            password::hash_password(&input.new_password, self.config.pepper.as_deref())?;
        self.user_repo
            .update(
                user.id,
                UpdateUser {
                    password_hash: Some(new_hash),
                    ..Default::default()
                },
            )
            .await?;

        if let Err(err) = self.mailer.send_password_changed(&user.email).await {
            warn!(user_id = %user.id, error = %err, "password changed notice failed");
        }

        self.ledger.revoke(user.id, None).await
    }

    /// Redeem a verification token: sets `verified = true` on the
    /// subject. Redeeming for an already-verified user is a no-op
    /// success; a subject that no longer exists is `TokenInvalid`.
    pub async fn verify_email(&self, verification_token: &str) -> AuthResult<()> {
        let claims =
            token::decode_token(verification_token, &self.config.verification_token_secret)?;
        let user_id = claims.subject()?;

        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    AuthError::TokenInvalid("unknown subject".into())
                }
                other => AuthError::from(other),
            })?;

        if user.verified {
            return Ok(());
        }

        self.user_repo
            .update(
                user.id,
                UpdateUser {
                    verified: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Re-send the verification mail. Unknown emails fail with
    /// `UserNotFound`; already-verified users are re-sent anyway.
    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        let user = self.get_user_by_email(email).await?;
        self.send_verification_mail(&user).await
    }

    /// Reset a forgotten password: overwrite the stored hash with a
    /// random temporary password, revoke every refresh token, and
    /// deliver the temporary password out-of-band.
    pub async fn forget_password(&self, email: &str) -> AuthResult<()> {
        let user = self.get_user_by_email(email).await?;

        let temp_password = password::generate_temp_password(TEMP_PASSWORD_LEN);
        let password_hash =
            password::hash_password(&temp_password, self.config.pepper.as_deref())?;
        self.user_repo
            .update(
                user.id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        self.ledger.revoke(user.id, None).await?;

        self.mailer
            .send_password_reset(&user.email, &temp_password)
            .await
            .map_err(|e| AuthError::Mail(e.to_string()))
    }

    /// Delete the account and every refresh token it owns.
    pub async fn delete_account(&self, user_id: Uuid) -> AuthResult<()> {
        self.user_repo
            .delete(user_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => AuthError::UserNotFound,
                other => AuthError::from(other),
            })?;
        self.ledger.revoke(user_id, None).await
    }

    /// Resolve an access token to its user, secrets stripped.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<PublicUser> {
        guard::authorize(&self.user_repo, &self.config, access_token)
            .await
            .map(PublicUser::from)
    }

    async fn issue_session(&self, user_id: Uuid, email: &str) -> AuthResult<TokenPair> {
        let pair = token::issue_token_pair(user_id, email, &self.config)?;
        self.ledger.record(user_id, &pair.refresh_token).await?;
        Ok(pair)
    }

    async fn send_verification_mail(&self, user: &User) -> AuthResult<()> {
        let verification_token = token::issue_purpose_token(
            user.id,
            &user.email,
            self.config.verification_token_ttl_secs as i64,
            &self.config.verification_token_secret,
        )?;
        let url = format!(
            "{}/auth/verification/{}",
            self.config.verification_base_url, verification_token
        );
        self.mailer
            .send_verification(&user.email, &url)
            .await
            .map_err(|e| AuthError::Mail(e.to_string()))
    }

    fn check_password_policy(&self, password: &str) -> AuthResult<()> {
        if password.len() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> AuthResult<User> {
        self.user_repo.get_by_id(user_id).await.map_err(|e| match e {
            CoreError::NotFound { .. } => AuthError::UserNotFound,
            other => AuthError::from(other),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        self.user_repo
            .get_by_email(email)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => AuthError::UserNotFound,
                other => AuthError::from(other),
            })
    }
}
