// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Account store abstraction with flat-file implementation.
//!
//! The store is the single writer for account records. Both operations
//! with an atomicity requirement live here, behind one write lock:
//! `insert` enforces email uniqueness, and `redeem_reset` performs the
//! compare-and-clear on the reset token together with the credential
//! rotation, so two concurrent redemptions can never both succeed.
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::{fs as tokio_fs, sync::RwLock};
use uuid::Uuid;

/// A persisted identity: email plus credential hash, with optional
/// pending reset state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Opaque unique id, assigned at creation, immutable
    pub id: Uuid,
    /// Normalized (lowercased) address; unique across all accounts
    pub email: String,
    /// Output of the password hasher; never plaintext
    pub credential_hash: String,
    /// Pending reset token, present only while a reset is outstanding
    pub reset_token: Option<String>,
    /// Expiry for `reset_token`; present iff the token is present
    pub reset_token_expires_at: Option<SystemTime>,
}

impl Account {
    /// Create a fresh account with no pending reset state.
    pub fn new(email: &str, credential_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            credential_hash,
            reset_token: None,
            reset_token_expires_at: None,
        }
    }

    /// Set a pending reset token, replacing any prior one.
    pub fn set_reset_token(&mut self, token: String, expires_at: SystemTime) {
        self.reset_token = Some(token);
        self.reset_token_expires_at = Some(expires_at);
    }

    /// Drop any pending reset state. Both fields go together.
    pub fn clear_reset_token(&mut self) {
        self.reset_token = None;
        self.reset_token_expires_at = None;
    }

    /// Whether a reset token is present and unexpired at `now`.
    /// An expired token is treated as absent (lazy invalidation).
    pub fn reset_token_valid_at(&self, now: SystemTime) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }
}

/// Canonical form an address is stored and looked up under.
/// Case-insensitive policy: lowercase once at the store boundary.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Trait for account store backends
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by email (normalized before the lookup)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// Look up an account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Look up an account by its pending reset token.
    /// Returns the raw match; expiry checking is the caller's job.
    async fn find_by_reset_token(&self, token: &str) -> Result<Option<Account>, AppError>;

    /// Insert a new account, enforcing email uniqueness atomically.
    /// A taken address fails with `DuplicateAccount` and creates nothing.
    async fn insert(&self, account: Account) -> Result<Account, AppError>;

    /// Persist mutations to an existing account
    async fn save(&self, account: &Account) -> Result<(), AppError>;

    /// Remove an account record
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Atomically redeem a reset token: verify the token matches and is
    /// unexpired at `now`, rotate the credential hash, and clear the
    /// token, all in one critical section. Any mismatch or expiry fails
    /// with `TokenInvalidOrExpired` and mutates nothing.
    async fn redeem_reset(
        &self,
        token: &str,
        new_hash: &str,
        now: SystemTime,
    ) -> Result<Account, AppError>;
}

/// Indexes guarded together so uniqueness checks and writes are one
/// critical section.
#[derive(Default)]
struct Tables {
    by_id: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
}

/// Flat-file implementation of the `AccountStore` trait.
///
/// Accounts live in memory behind an `RwLock` and every mutation is
/// flushed to `accounts.json` under the data dir before the lock is
/// released, so a restart sees the last committed write. A failed
/// flush rolls the in-memory change back before the error propagates,
/// so readers never observe state disk does not hold.
pub struct FlatFileAccountStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl FlatFileAccountStore {
    /// Open (or create) a store rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let path = root.join("accounts.json");

        let mut tables = Tables::default();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let accounts: Vec<Account> = serde_json::from_str(&content)?;
            for account in accounts {
                tables.by_email.insert(account.email.clone(), account.id);
                tables.by_id.insert(account.id, account);
            }
        }

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    /// Flush the current table to disk. Called with the write lock held
    /// so persisted state always matches a consistent in-memory state.
    async fn persist(&self, tables: &Tables) -> Result<(), AppError> {
        let accounts: Vec<&Account> = tables.by_id.values().collect();
        let json = serde_json::to_string_pretty(&accounts)?;
        tokio_fs::write(&self.path, json)
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for FlatFileAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let key = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .by_email
            .get(&key)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.by_id.get(&id).cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<Account>, AppError> {
        // Linear scan; pending resets are rare enough that an index
        // would not pay for itself.
        let tables = self.tables.read().await;
        Ok(tables
            .by_id
            .values()
            .find(|account| account.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, mut account: Account) -> Result<Account, AppError> {
        account.email = normalize_email(&account.email);

        let mut tables = self.tables.write().await;
        if tables.by_email.contains_key(&account.email) {
            return Err(AppError::DuplicateAccount);
        }
        tables.by_email.insert(account.email.clone(), account.id);
        tables.by_id.insert(account.id, account.clone());

        if let Err(err) = self.persist(&tables).await {
            tables.by_email.remove(&account.email);
            tables.by_id.remove(&account.id);
            return Err(err);
        }
        Ok(account)
    }

    async fn save(&self, account: &Account) -> Result<(), AppError> {
        let mut updated = account.clone();
        updated.email = normalize_email(&updated.email);

        let mut tables = self.tables.write().await;
        let previous = tables
            .by_id
            .get(&updated.id)
            .cloned()
            .ok_or(AppError::AccountNotFound)?;

        // Re-index on email change, still under the uniqueness guard.
        if previous.email != updated.email {
            if let Some(holder) = tables.by_email.get(&updated.email) {
                if *holder != updated.id {
                    return Err(AppError::DuplicateAccount);
                }
            }
            tables.by_email.remove(&previous.email);
            tables.by_email.insert(updated.email.clone(), updated.id);
        }

        let new_email = updated.email.clone();
        tables.by_id.insert(updated.id, updated);

        if let Err(err) = self.persist(&tables).await {
            if previous.email != new_email {
                tables.by_email.remove(&new_email);
                tables.by_email.insert(previous.email.clone(), previous.id);
            }
            tables.by_id.insert(previous.id, previous);
            return Err(err);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let account = tables.by_id.remove(&id).ok_or(AppError::AccountNotFound)?;
        tables.by_email.remove(&account.email);

        if let Err(err) = self.persist(&tables).await {
            tables.by_email.insert(account.email.clone(), account.id);
            tables.by_id.insert(id, account);
            return Err(err);
        }
        Ok(())
    }

    async fn redeem_reset(
        &self,
        token: &str,
        new_hash: &str,
        now: SystemTime,
    ) -> Result<Account, AppError> {
        let mut tables = self.tables.write().await;

        let id = tables
            .by_id
            .values()
            .find(|account| account.reset_token.as_deref() == Some(token))
            .filter(|account| account.reset_token_valid_at(now))
            .map(|account| account.id)
            .ok_or(AppError::TokenInvalidOrExpired)?;

        let account = tables
            .by_id
            .get_mut(&id)
            .ok_or(AppError::TokenInvalidOrExpired)?;
        let previous = account.clone();
        account.credential_hash = new_hash.to_string();
        account.clear_reset_token();
        let updated = account.clone();

        if let Err(err) = self.persist(&tables).await {
            tables.by_id.insert(id, previous);
            return Err(err);
        }
        Ok(updated)
    }
}
