// ============================
// crates/backend-lib/src/auth/reset.rs
// ============================
//! Password-reset flow: issue token -> notify -> redeem -> rotate.
use crate::auth::password::hash_password;
use crate::auth::session::SessionManager;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::store::{Account, AccountStore};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio::time::timeout;
use tracing::{info, warn};

use super::token_generator::generate_token;

/// Default reset-token lifetime
pub const RESET_TOKEN_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Orchestrates the multi-step reset protocol against the account
/// store, the session manager, and the notifier.
pub struct ResetFlow {
    store: Arc<dyn AccountStore>,
    sessions: SessionManager,
    notifier: Arc<dyn Notifier>,
    token_ttl: Duration,
    notify_timeout: Duration,
}

impl ResetFlow {
    pub fn new(
        store: Arc<dyn AccountStore>,
        sessions: SessionManager,
        notifier: Arc<dyn Notifier>,
        token_ttl: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            notifier,
            token_ttl,
            notify_timeout,
        }
    }

    /// Issue a reset token for the account registered under `email` and
    /// hand it to the notifier.
    ///
    /// Re-requesting replaces any prior unredeemed token, so only the
    /// newest token for an account is ever redeemable. The token is
    /// committed before the notifier runs and stays valid even if
    /// delivery fails; delivery problems are logged, never propagated.
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        let mut account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        let token = generate_token();
        let expires_at = SystemTime::now() + self.token_ttl;
        account.set_reset_token(token.clone(), expires_at);
        self.store.save(&account).await?;

        info!(account_id = %account.id, "reset token issued");

        let minutes = self.token_ttl.as_secs() / 60;
        let body = format!(
            "A password reset was requested for your account.\n\n\
             Reset token: {token}\n\n\
             Submit it to POST /reset together with your new password. \
             The token is valid for {minutes} minutes and can be used once.\n\n\
             If you did not request this, you can ignore this message; \
             your password is unchanged."
        );
        self.notify(&account.email, "Reset your password", &body).await;

        Ok(())
    }

    /// Redeem a reset token: rotate the credential, clear the token,
    /// and establish a session for the account.
    ///
    /// A wrong token and an expired token fail identically; the caller
    /// learns only `TokenInvalidOrExpired`.
    pub async fn redeem_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(Account, String), AppError> {
        // Cheap pre-check before paying for a hash. The store re-checks
        // token and expiry inside its critical section, so this read
        // can go stale without two redemptions both winning.
        let now = SystemTime::now();
        let candidate = self
            .store
            .find_by_reset_token(token)
            .await?
            .ok_or(AppError::TokenInvalidOrExpired)?;
        if !candidate.reset_token_valid_at(now) {
            return Err(AppError::TokenInvalidOrExpired);
        }

        let plain = new_password.to_string();
        let new_hash = task::spawn_blocking(move || hash_password(&plain))
            .await?
            .map_err(|err| AppError::Internal(err.to_string()))?;

        // Token clearing and credential rotation are one atomic store
        // operation: no window where the old token is still redeemable
        // after the password already changed.
        let account = self
            .store
            .redeem_reset(token, &new_hash, SystemTime::now())
            .await?;

        let session_token = self.sessions.create(account.id).await;
        info!(account_id = %account.id, "password reset redeemed");

        let body = format!(
            "This confirms that the password for {} has just been changed.",
            account.email
        );
        self.notify(&account.email, "Your password has been changed", &body)
            .await;

        Ok((account, session_token))
    }

    /// Fire the notifier under a bounded timeout. The credential
    /// operation is already committed by the time this runs, so a slow
    /// or failing transport only produces a warning.
    async fn notify(&self, to: &str, subject: &str, body: &str) {
        match timeout(self.notify_timeout, self.notifier.send(to, subject, body)).await {
            Ok(Ok(())) => {},
            Ok(Err(err)) => {
                warn!(to, subject, error = %err, "notification delivery failed");
            },
            Err(_) => {
                warn!(to, subject, "notification timed out");
            },
        }
    }
}
