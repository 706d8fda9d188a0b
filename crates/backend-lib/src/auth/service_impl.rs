use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{AuthContext, SessionManager};
use crate::auth::AuthService;
use crate::error::AppError;
use crate::store::{Account, AccountStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::info;

/// Email + password variant of the `AuthService` capability set.
pub struct PasswordAuth {
    store: Arc<dyn AccountStore>,
    sessions: SessionManager,
}

impl PasswordAuth {
    pub fn new(store: Arc<dyn AccountStore>, sessions: SessionManager) -> Self {
        Self { store, sessions }
    }

    /// Hash on the blocking pool; scrypt is CPU-bound and must not
    /// stall unrelated requests on the reactor.
    async fn hash_offloaded(plain: &str) -> Result<String, AppError> {
        let plain = plain.to_string();
        task::spawn_blocking(move || hash_password(&plain))
            .await?
            .map_err(|err| AppError::Internal(err.to_string()))
    }

    async fn verify_offloaded(hash: String, plain: &str) -> Result<bool, AppError> {
        let plain = plain.to_string();
        Ok(task::spawn_blocking(move || verify_password(&hash, &plain)).await?)
    }
}

#[async_trait]
impl AuthService for PasswordAuth {
    async fn register(&self, email: &str, password: &str) -> Result<(Account, String), AppError> {
        let credential_hash = Self::hash_offloaded(password).await?;

        // Uniqueness is enforced inside the store's insert, not by a
        // separate existence check, so concurrent registrations of the
        // same address cannot race past each other.
        let account = self.store.insert(Account::new(email, credential_hash)).await?;

        let token = self.sessions.create(account.id).await;
        info!(account_id = %account.id, "account registered");
        Ok((account, token))
    }

    async fn login(&self, email: &str, password: &str) -> Result<(Account, String), AppError> {
        // Unknown address and wrong password must be indistinguishable
        // to the caller; both collapse to InvalidCredentials below.
        let account = self.store.find_by_email(email).await?;

        let account = match account {
            Some(account) => account,
            None => return Err(AppError::InvalidCredentials),
        };

        if !Self::verify_offloaded(account.credential_hash.clone(), password).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.sessions.create(account.id).await;
        Ok((account, token))
    }

    async fn logout(&self, ctx: &AuthContext) {
        if let Some(token) = ctx.token() {
            self.sessions.destroy(token).await;
        }
    }

    async fn change_password(
        &self,
        ctx: &AuthContext,
        new_password: &str,
    ) -> Result<(), AppError> {
        let account_id = ctx.account_id().ok_or(AppError::Unauthorized)?;
        let mut account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        account.credential_hash = Self::hash_offloaded(new_password).await?;
        // An account save unrelated to redemption drops any pending
        // reset token; the old token must not survive a rotation.
        account.clear_reset_token();
        self.store.save(&account).await?;

        info!(account_id = %account_id, "password changed");
        Ok(())
    }

    async fn delete_account(&self, ctx: &AuthContext) -> Result<(), AppError> {
        let account_id = ctx.account_id().ok_or(AppError::Unauthorized)?;
        self.store.delete(account_id).await?;

        if let Some(token) = ctx.token() {
            self.sessions.destroy(token).await;
        }

        info!(account_id = %account_id, "account deleted");
        Ok(())
    }
}
