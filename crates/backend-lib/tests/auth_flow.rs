// crates/backend-lib/tests/auth_flow.rs
//
// Service-level tests for the credential lifecycle: registration
// uniqueness, login indistinguishability, the reset-token protocol,
// and credential rotation.

use async_trait::async_trait;
use backend_lib::auth::{AuthContext, AuthService, PasswordAuth, ResetFlow, SessionManager};
use backend_lib::error::AppError;
use backend_lib::notify::Notifier;
use backend_lib::store::{AccountStore, FlatFileAccountStore};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Captures every notification so tests can assert on delivery.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// A notifier whose transport is down. Delivery failure must never
/// fail the credential operation itself.
struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), AppError> {
        Err(AppError::Delivery("relay unreachable".to_string()))
    }
}

struct Stack {
    store: Arc<FlatFileAccountStore>,
    auth: Arc<PasswordAuth>,
    reset: ResetFlow,
    sessions: SessionManager,
    notifier: Arc<RecordingNotifier>,
    _dir: tempfile::TempDir,
}

const SESSION_TTL: Duration = Duration::from_secs(3600);
const TOKEN_TTL: Duration = Duration::from_secs(3600);
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

fn stack() -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlatFileAccountStore::new(dir.path()).unwrap());
    let store_dyn: Arc<dyn AccountStore> = store.clone();
    let sessions = SessionManager::new(SESSION_TTL);
    let notifier = Arc::new(RecordingNotifier::default());
    let auth = Arc::new(PasswordAuth::new(store_dyn.clone(), sessions.clone()));
    let reset = ResetFlow::new(
        store_dyn,
        sessions.clone(),
        notifier.clone(),
        TOKEN_TTL,
        NOTIFY_TIMEOUT,
    );

    Stack {
        store,
        auth,
        reset,
        sessions,
        notifier,
        _dir: dir,
    }
}

/// Read the pending reset token straight out of the store.
async fn pending_token(store: &FlatFileAccountStore, email: &str) -> String {
    store
        .find_by_email(email)
        .await
        .unwrap()
        .expect("account exists")
        .reset_token
        .expect("reset pending")
}

#[tokio::test]
async fn register_enforces_uniqueness() {
    let s = stack();

    let (account, _) = s.auth.register("bob@example.com", "first-password").await.unwrap();

    let err = s
        .auth
        .register("bob@example.com", "other-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateAccount));

    // email matching is case-insensitive, so this is the same account
    let err = s
        .auth
        .register("BOB@EXAMPLE.COM", "other-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateAccount));

    // the failed attempts created nothing and changed nothing
    let stored = s.store.find_by_email("bob@example.com").await.unwrap().unwrap();
    assert_eq!(stored.id, account.id);
}

#[tokio::test]
async fn concurrent_registration_has_one_winner() {
    let s = stack();

    let mut handles = Vec::new();
    for n in 0..6 {
        let auth = s.auth.clone();
        handles.push(tokio::spawn(async move {
            auth.register("race@example.com", &format!("password-{n}")).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, AppError::DuplicateAccount)),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let s = stack();
    s.auth.register("carol@example.com", "correct-horse").await.unwrap();

    let unknown = s
        .auth
        .login("nobody@example.com", "anything-at-all")
        .await
        .unwrap_err();
    let wrong_pass = s
        .auth
        .login("carol@example.com", "battery-staple")
        .await
        .unwrap_err();

    assert!(matches!(unknown, AppError::InvalidCredentials));
    assert!(matches!(wrong_pass, AppError::InvalidCredentials));
    assert_eq!(unknown.error_code(), wrong_pass.error_code());
    assert_eq!(unknown.sanitized_message(), wrong_pass.sanitized_message());
}

#[tokio::test]
async fn register_logout_login_round_trip() {
    let s = stack();

    let (account, token) = s.auth.register("dave@example.com", "round-trip-pw").await.unwrap();
    assert_eq!(s.sessions.current_account_id(&token).await, Some(account.id));

    let ctx = AuthContext::resolve(&s.sessions, Some(token.clone())).await;
    s.auth.logout(&ctx).await;
    assert_eq!(s.sessions.current_account_id(&token).await, None);

    // logout is idempotent: an already-anonymous context is a no-op
    let stale = AuthContext::resolve(&s.sessions, Some(token)).await;
    s.auth.logout(&stale).await;

    let (again, new_token) = s.auth.login("dave@example.com", "round-trip-pw").await.unwrap();
    assert_eq!(again.id, account.id);
    assert_eq!(s.sessions.current_account_id(&new_token).await, Some(account.id));
}

#[tokio::test]
async fn reset_token_is_single_use() {
    let s = stack();
    s.auth.register("erin@example.com", "original-pw").await.unwrap();

    s.reset.request_reset("erin@example.com").await.unwrap();
    let token = pending_token(&s.store, "erin@example.com").await;

    s.reset.redeem_reset(&token, "first-new-pw").await.unwrap();

    // the winning redemption cleared the token; replay must fail
    let err = s.reset.redeem_reset(&token, "second-new-pw").await.unwrap_err();
    assert!(matches!(err, AppError::TokenInvalidOrExpired));

    // and the password from the replay attempt never took effect
    assert!(s.auth.login("erin@example.com", "second-new-pw").await.is_err());
    assert!(s.auth.login("erin@example.com", "first-new-pw").await.is_ok());
}

#[tokio::test]
async fn expired_token_is_inert() {
    let s = stack();
    s.auth.register("frank@example.com", "original-pw").await.unwrap();

    s.reset.request_reset("frank@example.com").await.unwrap();
    let token = pending_token(&s.store, "frank@example.com").await;

    // age the token past its expiry
    let mut account = s.store.find_by_email("frank@example.com").await.unwrap().unwrap();
    account.set_reset_token(token.clone(), SystemTime::now() - Duration::from_secs(1));
    s.store.save(&account).await.unwrap();

    let err = s.reset.redeem_reset(&token, "new-password").await.unwrap_err();
    assert!(matches!(err, AppError::TokenInvalidOrExpired));
    assert!(s.auth.login("frank@example.com", "original-pw").await.is_ok());

    // a fresh, unexpired token still works
    s.reset.request_reset("frank@example.com").await.unwrap();
    let fresh = pending_token(&s.store, "frank@example.com").await;
    assert!(s.reset.redeem_reset(&fresh, "new-password").await.is_ok());
}

#[tokio::test]
async fn new_request_supersedes_prior_token() {
    let s = stack();
    s.auth.register("grace@example.com", "original-pw").await.unwrap();

    s.reset.request_reset("grace@example.com").await.unwrap();
    let first = pending_token(&s.store, "grace@example.com").await;

    s.reset.request_reset("grace@example.com").await.unwrap();
    let second = pending_token(&s.store, "grace@example.com").await;
    assert_ne!(first, second);

    let err = s.reset.redeem_reset(&first, "new-password").await.unwrap_err();
    assert!(matches!(err, AppError::TokenInvalidOrExpired));

    assert!(s.reset.redeem_reset(&second, "new-password").await.is_ok());
}

#[tokio::test]
async fn unknown_email_fails_reset_request() {
    let s = stack();
    let err = s.reset.request_reset("ghost@example.com").await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound));
    assert!(s.notifier.messages().is_empty());
}

#[tokio::test]
async fn delivery_failure_does_not_void_the_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlatFileAccountStore::new(dir.path()).unwrap());
    let store_dyn: Arc<dyn AccountStore> = store.clone();
    let sessions = SessionManager::new(SESSION_TTL);
    let auth = PasswordAuth::new(store_dyn.clone(), sessions.clone());
    let reset = ResetFlow::new(
        store_dyn,
        sessions,
        Arc::new(FailingNotifier),
        TOKEN_TTL,
        NOTIFY_TIMEOUT,
    );

    auth.register("henry@example.com", "original-pw").await.unwrap();

    // the relay is down, but the request still succeeds and the token
    // remains redeemable
    reset.request_reset("henry@example.com").await.unwrap();
    let token = pending_token(&store, "henry@example.com").await;
    assert!(reset.redeem_reset(&token, "new-password").await.is_ok());
}

#[tokio::test]
async fn change_password_rotates_and_clears_pending_reset() {
    let s = stack();
    let (_, token) = s.auth.register("ivy@example.com", "original-pw").await.unwrap();

    // a reset is pending when the user changes the password directly
    s.reset.request_reset("ivy@example.com").await.unwrap();
    let reset_token = pending_token(&s.store, "ivy@example.com").await;

    let ctx = AuthContext::resolve(&s.sessions, Some(token)).await;
    s.auth.change_password(&ctx, "changed-pw").await.unwrap();

    assert!(s.auth.login("ivy@example.com", "original-pw").await.is_err());
    assert!(s.auth.login("ivy@example.com", "changed-pw").await.is_ok());

    // the unrelated save dropped the pending token
    let err = s.reset.redeem_reset(&reset_token, "sneaky-pw").await.unwrap_err();
    assert!(matches!(err, AppError::TokenInvalidOrExpired));
}

#[tokio::test]
async fn guarded_operations_reject_anonymous_contexts() {
    let s = stack();
    let ctx = AuthContext::anonymous();
    assert!(!ctx.is_authenticated());

    let err = s.auth.change_password(&ctx, "whatever-pw").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let err = s.auth.delete_account(&ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn delete_account_removes_record_and_session() {
    let s = stack();
    let (account, token) = s.auth.register("judy@example.com", "original-pw").await.unwrap();

    let ctx = AuthContext::resolve(&s.sessions, Some(token.clone())).await;
    s.auth.delete_account(&ctx).await.unwrap();

    assert!(s.store.find_by_id(account.id).await.unwrap().is_none());
    assert_eq!(s.sessions.current_account_id(&token).await, None);
    assert!(s.auth.login("judy@example.com", "original-pw").await.is_err());
}

#[tokio::test]
async fn end_to_end_reset_scenario() {
    let s = stack();

    // register alice and hold a session
    let (account, session) = s.auth.register("alice@example.com", "hunter22").await.unwrap();
    assert_eq!(s.sessions.current_account_id(&session).await, Some(account.id));

    // request a reset; the notifier saw exactly one message, carrying
    // the issued token
    s.reset.request_reset("alice@example.com").await.unwrap();
    let token = pending_token(&s.store, "alice@example.com").await;

    let messages = s.notifier.messages();
    assert_eq!(messages.len(), 1);
    let (to, subject, body) = &messages[0];
    assert_eq!(to, "alice@example.com");
    assert!(subject.contains("Reset"));
    assert!(body.contains(&token));

    // redeem: new session, rotated credential, confirmation mail
    let (redeemed, new_session) = s.reset.redeem_reset(&token, "newpass1").await.unwrap();
    assert_eq!(redeemed.id, account.id);
    assert_eq!(s.sessions.current_account_id(&new_session).await, Some(account.id));
    assert_eq!(s.notifier.messages().len(), 2);

    let ok = s.auth.login("alice@example.com", "newpass1").await.unwrap();
    assert_eq!(ok.0.id, account.id);
    let err = s.auth.login("alice@example.com", "hunter22").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}
