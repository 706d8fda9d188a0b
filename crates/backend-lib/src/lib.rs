// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the accounts service.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod router;
pub mod store;
pub mod validation;

use crate::auth::{AuthService, PasswordAuth, ResetFlow, SessionManager};
use crate::config::Settings;
use crate::notify::Notifier;
use crate::store::AccountStore;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Reset flow controller
    pub reset: Arc<ResetFlow>,
    /// Session manager
    pub sessions: SessionManager,
    /// Account store backend
    pub store: Arc<dyn AccountStore>,
}

impl AppState {
    /// Create a new application state. Must be called inside a tokio
    /// runtime (the session manager spawns its cleanup task).
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        let sessions = SessionManager::new(Duration::from_secs(settings.session_ttl_secs));
        let auth = Arc::new(PasswordAuth::new(store.clone(), sessions.clone()));
        let reset = Arc::new(ResetFlow::new(
            store.clone(),
            sessions.clone(),
            notifier,
            Duration::from_secs(settings.reset_token_ttl_secs),
            Duration::from_secs(settings.notify_timeout_secs),
        ));

        Self {
            auth,
            reset,
            sessions,
            store,
        }
    }
}
