use super::session::AuthContext;
use crate::error::AppError;
use crate::store::Account;
use async_trait::async_trait;

/// The credential-lifecycle engine.
///
/// One implementing variant exists today (email + password); token- or
/// key-based variants would implement the same capability set.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and establish a session for it.
    /// Fails with `DuplicateAccount` when the email is taken; no record
    /// is created in that case.
    async fn register(&self, email: &str, password: &str) -> Result<(Account, String), AppError>;

    /// Verify credentials and establish a session. Unknown email and
    /// wrong password fail identically with `InvalidCredentials`.
    async fn login(&self, email: &str, password: &str) -> Result<(Account, String), AppError>;

    /// Tear down the context's session. Idempotent on anonymous contexts.
    async fn logout(&self, ctx: &AuthContext);

    /// Rotate the credential for an already-authenticated caller,
    /// bypassing the reset-token flow.
    async fn change_password(&self, ctx: &AuthContext, new_password: &str)
        -> Result<(), AppError>;

    /// Remove the caller's account and destroy their session.
    async fn delete_account(&self, ctx: &AuthContext) -> Result<(), AppError>;
}
