//! Integration tests for the session facade, run against the in-memory
//! store.

use std::sync::{Arc, Mutex};

use bdaybook_auth::ledger::RefreshTokenLedger;
use bdaybook_auth::service::{AuthService, ChangePasswordInput, LoginInput, SignupInput};
use bdaybook_auth::sweep::start_expiry_sweeper;
use bdaybook_auth::token::{self, TokenPair};
use bdaybook_auth::{AuthConfig, AuthError, guard};
use bdaybook_core::error::{CoreError, CoreResult};
use bdaybook_core::mailer::Mailer;
use bdaybook_core::models::refresh_token::CreateRefreshToken;
use bdaybook_core::repository::{RefreshTokenRepository, UserRepository};
use bdaybook_store::{MemoryRefreshTokenRepository, MemoryUserRepository};
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

/// Captures outbound mail; optionally fails verification sends.
#[derive(Clone, Default)]
struct TestMailer {
    fail_verification: bool,
    verification_urls: Arc<Mutex<Vec<String>>>,
    last_temp_password: Arc<Mutex<Option<String>>>,
}

impl Mailer for TestMailer {
    async fn send_verification(&self, _email: &str, url: &str) -> CoreResult<()> {
        if self.fail_verification {
            return Err(CoreError::MailDelivery("smtp unreachable".into()));
        }
        self.verification_urls.lock().unwrap().push(url.to_owned());
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str, temp_password: &str) -> CoreResult<()> {
        *self.last_temp_password.lock().unwrap() = Some(temp_password.to_owned());
        Ok(())
    }

    async fn send_password_changed(&self, _email: &str) -> CoreResult<()> {
        Ok(())
    }
}

type TestService = AuthService<MemoryUserRepository, MemoryRefreshTokenRepository, TestMailer>;

fn test_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "test-access-secret".into(),
        refresh_token_secret: "test-refresh-secret".into(),
        verification_token_secret: "test-verification-secret".into(),
        verification_base_url: "http://localhost:3000".into(),
        min_password_length: 6,
        ..Default::default()
    }
}

fn setup_with_mailer(
    mailer: TestMailer,
) -> (
    TestService,
    MemoryUserRepository,
    MemoryRefreshTokenRepository,
    TestMailer,
) {
    let config = test_config();
    let user_repo = MemoryUserRepository::new();
    let token_repo = MemoryRefreshTokenRepository::new();
    let ledger = RefreshTokenLedger::new(token_repo.clone(), config.clone());
    let svc = AuthService::new(user_repo.clone(), ledger, mailer.clone(), config);
    (svc, user_repo, token_repo, mailer)
}

fn setup() -> (
    TestService,
    MemoryUserRepository,
    MemoryRefreshTokenRepository,
    TestMailer,
) {
    setup_with_mailer(TestMailer::default())
}

fn alice_signup() -> SignupInput {
    SignupInput {
        email: "a@x.com".into(),
        password: "abc123".into(),
        full_name: "Alice Example".into(),
        birthday: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
    }
}

async fn signup_alice(svc: &TestService) -> TokenPair {
    svc.signup(alice_signup()).await.unwrap()
}

async fn alice_id(user_repo: &MemoryUserRepository) -> Uuid {
    user_repo.get_by_email("a@x.com").await.unwrap().id
}

// -----------------------------------------------------------------------
// Signup & login
// -----------------------------------------------------------------------

#[tokio::test]
async fn signup_issues_pair_and_records_refresh_token() {
    let (svc, user_repo, token_repo, mailer) = setup();
    let config = test_config();

    let pair = signup_alice(&svc).await;
    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());

    let claims = token::decode_token(&pair.access_token, &config.access_token_secret).unwrap();
    assert_eq!(claims.email, "a@x.com");

    // The refresh token is retrievable via the ledger for that user.
    let user_id = alice_id(&user_repo).await;
    assert_eq!(claims.subject().unwrap(), user_id);
    assert_eq!(token_repo.count_for_user(user_id).await, 1);

    // Verification mail went out.
    assert_eq!(mailer.verification_urls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn signup_duplicate_email_is_rejected() {
    let (svc, _, _, _) = setup();
    signup_alice(&svc).await;

    let err = svc.signup(alice_signup()).await.unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken));
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let (svc, _, _, _) = setup();
    let err = svc
        .signup(SignupInput {
            password: "abc".into(),
            ..alice_signup()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn signup_survives_mail_failure() {
    let mailer = TestMailer {
        fail_verification: true,
        ..Default::default()
    };
    let (svc, _, _, _) = setup_with_mailer(mailer);

    // Mail failure is non-fatal: the account exists and can log in.
    signup_alice(&svc).await;
    let result = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn login_happy_path() {
    let (svc, user_repo, token_repo, _) = setup();
    signup_alice(&svc).await;

    let pair = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap();
    assert!(!pair.access_token.is_empty());

    // One row from signup, one from login — concurrent sessions.
    let user_id = alice_id(&user_repo).await;
    assert_eq!(token_repo.count_for_user(user_id).await, 2);
}

#[tokio::test]
async fn login_wrong_password_and_unknown_email_are_the_same_kind() {
    let (svc, _, _, _) = setup();
    signup_alice(&svc).await;

    let wrong_password = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));

    let unknown_email = svc
        .login(LoginInput {
            email: "missing@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
}

// -----------------------------------------------------------------------
// Refresh rotation
// -----------------------------------------------------------------------

#[tokio::test]
async fn refresh_rotates_and_blocks_replay() {
    let (svc, _, _, _) = setup();
    let pair = signup_alice(&svc).await;

    let rotated = svc.refresh(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // The presented token was redeemed exactly once.
    let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));

    // The replacement still works.
    assert!(svc.refresh(&rotated.refresh_token).await.is_ok());
}

#[tokio::test]
async fn refresh_with_garbage_token_is_denied() {
    let (svc, _, _, _) = setup();
    signup_alice(&svc).await;

    let err = svc.refresh("totally-bogus-token").await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));
}

#[tokio::test]
async fn refresh_with_expired_jwt_is_denied() {
    let (svc, user_repo, _, _) = setup();
    let config = test_config();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    let expired = token::issue_purpose_token(
        user_id,
        "a@x.com",
        -3600,
        &config.refresh_token_secret,
    )
    .unwrap();

    let err = svc.refresh(&expired).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));
}

#[tokio::test]
async fn refresh_with_expired_ledger_row_is_denied() {
    let (svc, user_repo, token_repo, _) = setup();
    let config = test_config();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    // Valid JWT, but the ledger row has already lapsed.
    let refresh = token::issue_refresh_token(user_id, "a@x.com", &config).unwrap();
    token_repo
        .create(CreateRefreshToken {
            user_id,
            token: refresh.clone(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

    let err = svc.refresh(&refresh).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));

    // The expired row was consumed, not left behind.
    let err = svc.refresh(&refresh).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));
}

#[tokio::test]
async fn refresh_after_account_deletion_is_denied() {
    let (svc, user_repo, _, _) = setup();
    let pair = signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    svc.delete_account(user_id).await.unwrap();

    let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));
}

// -----------------------------------------------------------------------
// Logout & revocation
// -----------------------------------------------------------------------

#[tokio::test]
async fn logout_single_session_leaves_others_alive() {
    let (svc, user_repo, _, _) = setup();
    let first = signup_alice(&svc).await;
    let second = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap();
    let user_id = alice_id(&user_repo).await;

    svc.logout(user_id, Some(second.refresh_token.as_str()))
        .await
        .unwrap();

    let err = svc.refresh(&second.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));
    assert!(svc.refresh(&first.refresh_token).await.is_ok());
}

#[tokio::test]
async fn logout_all_blocks_every_previously_issued_token() {
    let (svc, user_repo, token_repo, _) = setup();
    let first = signup_alice(&svc).await;
    let second = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap();
    let user_id = alice_id(&user_repo).await;

    svc.logout(user_id, None).await.unwrap();
    assert_eq!(token_repo.count_for_user(user_id).await, 0);

    for token in [&first.refresh_token, &second.refresh_token] {
        let err = svc.refresh(token).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshDenied));
    }
}

// -----------------------------------------------------------------------
// Password change & reset
// -----------------------------------------------------------------------

#[tokio::test]
async fn change_password_requires_current_password() {
    let (svc, user_repo, _, _) = setup();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    let err = svc
        .change_password(
            user_id,
            ChangePasswordInput {
                current_password: "wrong".into(),
                new_password: "new-secret".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn change_password_rotates_hash_and_revokes_sessions() {
    let (svc, user_repo, _, _) = setup();
    let pair = signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    svc.change_password(
        user_id,
        ChangePasswordInput {
            current_password: "abc123".into(),
            new_password: "new-secret".into(),
        },
    )
    .await
    .unwrap();

    // Every prior session is forced to re-login.
    let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));

    // Old password is gone, new one works.
    let err = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(
        svc.login(LoginInput {
            email: "a@x.com".into(),
            password: "new-secret".into(),
        })
        .await
        .is_ok()
    );
}

#[tokio::test]
async fn forget_password_issues_temp_password_and_revokes_sessions() {
    let (svc, user_repo, token_repo, mailer) = setup();
    let pair = signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    svc.forget_password("a@x.com").await.unwrap();

    let temp_password = mailer
        .last_temp_password
        .lock()
        .unwrap()
        .clone()
        .expect("reset mail was sent");

    assert_eq!(token_repo.count_for_user(user_id).await, 0);
    let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::RefreshDenied));

    let err = svc
        .login(LoginInput {
            email: "a@x.com".into(),
            password: "abc123".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(
        svc.login(LoginInput {
            email: "a@x.com".into(),
            password: temp_password,
        })
        .await
        .is_ok()
    );
}

#[tokio::test]
async fn forget_password_unknown_email_fails() {
    let (svc, _, _, _) = setup();
    let err = svc.forget_password("missing@x.com").await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

// -----------------------------------------------------------------------
// Email verification
// -----------------------------------------------------------------------

fn token_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap().to_owned()
}

#[tokio::test]
async fn verify_email_marks_user_verified_and_is_idempotent() {
    let (svc, user_repo, _, mailer) = setup();
    signup_alice(&svc).await;

    let url = mailer.verification_urls.lock().unwrap()[0].clone();
    let verification_token = token_from_url(&url);

    svc.verify_email(&verification_token).await.unwrap();
    let user = user_repo.get_by_email("a@x.com").await.unwrap();
    assert!(user.verified);

    // Redeeming again is a no-op success.
    svc.verify_email(&verification_token).await.unwrap();
}

#[tokio::test]
async fn verify_email_rejects_wrong_purpose_token() {
    let (svc, user_repo, _, _) = setup();
    let config = test_config();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    // Signed with the access secret, not the verification secret.
    let wrong_purpose = token::issue_access_token(user_id, "a@x.com", &config).unwrap();
    let err = svc.verify_email(&wrong_purpose).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn verify_email_rejects_expired_token() {
    let (svc, user_repo, _, _) = setup();
    let config = test_config();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    let expired = token::issue_purpose_token(
        user_id,
        "a@x.com",
        -3600,
        &config.verification_token_secret,
    )
    .unwrap();
    let err = svc.verify_email(&expired).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));
}

#[tokio::test]
async fn verify_email_with_deleted_subject_is_invalid() {
    let (svc, user_repo, _, mailer) = setup();
    signup_alice(&svc).await;
    let user_id = alice_id(&user_repo).await;

    let url = mailer.verification_urls.lock().unwrap()[0].clone();
    let verification_token = token_from_url(&url);

    svc.delete_account(user_id).await.unwrap();

    let err = svc.verify_email(&verification_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn resend_verification_unknown_email_fails() {
    let (svc, _, _, mailer) = setup();
    signup_alice(&svc).await;

    let err = svc
        .resend_verification("missing@x.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));

    svc.resend_verification("a@x.com").await.unwrap();
    assert_eq!(mailer.verification_urls.lock().unwrap().len(), 2);
}

// -----------------------------------------------------------------------
// Guard chain
// -----------------------------------------------------------------------

#[tokio::test]
async fn authenticate_returns_stripped_user() {
    let (svc, _, _, _) = setup();
    let pair = signup_alice(&svc).await;

    let user = svc.authenticate(&pair.access_token).await.unwrap();
    assert_eq!(user.email, "a@x.com");
    assert_eq!(user.full_name, "Alice Example");
    assert!(!user.verified);

    let tampered = format!("{}x", pair.access_token);
    let err = svc.authenticate(&tampered).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn guard_chain_enforces_verification() {
    let (svc, user_repo, _, mailer) = setup();
    let config = test_config();
    let pair = signup_alice(&svc).await;

    let err = guard::authorize_verified(&user_repo, &config, &pair.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    let url = mailer.verification_urls.lock().unwrap()[0].clone();
    svc.verify_email(&token_from_url(&url)).await.unwrap();

    let user = guard::authorize_verified(&user_repo, &config, &pair.access_token)
        .await
        .unwrap();
    assert!(user.verified);
}

#[tokio::test]
async fn guard_rejects_refresh_token_as_access_token() {
    let (svc, _, _, _) = setup();
    let pair = signup_alice(&svc).await;

    let err = svc.authenticate(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

// -----------------------------------------------------------------------
// Expiry sweep
// -----------------------------------------------------------------------

#[tokio::test]
async fn sweeper_removes_expired_rows_in_background() {
    let config = test_config();
    let token_repo = MemoryRefreshTokenRepository::new();
    let ledger = RefreshTokenLedger::new(token_repo.clone(), config);
    let user_id = Uuid::new_v4();

    token_repo
        .create(CreateRefreshToken {
            user_id,
            token: "stale".into(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();
    token_repo
        .create(CreateRefreshToken {
            user_id,
            token: "live".into(),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let handle = start_expiry_sweeper(ledger, std::time::Duration::from_millis(10));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    handle.abort();

    assert_eq!(token_repo.count_for_user(user_id).await, 1);
    assert!(token_repo.consume(user_id, "live").await.is_ok());
}
