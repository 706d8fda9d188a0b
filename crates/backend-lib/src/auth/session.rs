// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and the request-time session gate.
use crate::auth::token_generator::generate_token;
use metrics::{counter, gauge};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

/// A server-side record binding a bearer token to an account id
#[derive(Clone, Debug)]
pub struct Session {
    pub account_id: Uuid,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager with the given TTL and spawn the
    /// periodic cleanup task. Must be called inside a tokio runtime.
    pub fn new(ttl: Duration) -> Self {
        let manager = SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        };

        let manager_clone = manager.clone();
        tokio::spawn(async move {
            manager_clone.cleanup_task().await;
        });

        manager
    }

    /// Establish a new session for an account, returning the bearer token.
    pub async fn create(&self, account_id: Uuid) -> String {
        let token = generate_token();
        let now = SystemTime::now();
        let session = Session {
            account_id,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        counter!("session_created").increment(1);
        gauge!("sessions_active").set(sessions.len() as f64);

        token
    }

    /// Get a live session by token. Expired entries read as absent
    /// (lazy invalidation; the sweep task removes them later).
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|session| SystemTime::now() < session.expires_at)
            .cloned()
    }

    /// Resolve a token to the account id it authenticates, if any.
    pub async fn current_account_id(&self, token: &str) -> Option<Uuid> {
        self.get(token).await.map(|session| session.account_id)
    }

    /// Destroy a session. Idempotent: unknown tokens are a no-op.
    pub async fn destroy(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(token).is_some() {
            counter!("session_destroyed").increment(1);
            gauge!("sessions_active").set(sessions.len() as f64);
        }
    }

    /// Cleanup task that runs periodically to remove expired sessions
    async fn cleanup_task(&self) {
        let cleanup_interval = Duration::from_secs(60 * 60); // 1 hour

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let mut sessions = self.sessions.write().await;
            let now = SystemTime::now();
            let before_count = sessions.len();

            sessions.retain(|_, session| now < session.expires_at);

            let removed = before_count - sessions.len();
            if removed > 0 {
                counter!("session_expired").increment(removed as u64);
                gauge!("sessions_active").set(sessions.len() as f64);
            }
        }
    }
}

/// Explicit per-request authentication context.
///
/// Resolved once at the edge from the bearer token and passed to the
/// operations that need it, instead of reading ambient session state.
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    token: Option<String>,
    account_id: Option<Uuid>,
}

impl AuthContext {
    /// Context for a request carrying no credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolve a bearer token against the session manager. A missing,
    /// unknown, or expired token yields an anonymous context.
    pub async fn resolve(sessions: &SessionManager, token: Option<String>) -> Self {
        match token {
            Some(token) => match sessions.current_account_id(&token).await {
                Some(account_id) => Self {
                    token: Some(token),
                    account_id: Some(account_id),
                },
                None => Self::anonymous(),
            },
            None => Self::anonymous(),
        }
    }

    /// The session-gate predicate: does this context carry an
    /// authenticated account? No state transitions happen here; callers
    /// surface a failed check as `Unauthorized`.
    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// The authenticated account id, if any.
    pub fn account_id(&self) -> Option<Uuid> {
        self.account_id
    }

    /// The raw bearer token this context was resolved from, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_destroy() {
        let sessions = SessionManager::new(SESSION_TTL);
        let account_id = Uuid::new_v4();

        let token = sessions.create(account_id).await;
        assert_eq!(sessions.current_account_id(&token).await, Some(account_id));

        sessions.destroy(&token).await;
        assert!(sessions.get(&token).await.is_none());

        // destroying again is a no-op, not an error
        sessions.destroy(&token).await;
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let sessions = SessionManager::new(Duration::ZERO);
        let token = sessions.create(Uuid::new_v4()).await;
        assert!(sessions.get(&token).await.is_none());
        assert_eq!(sessions.current_account_id(&token).await, None);
    }

    #[tokio::test]
    async fn context_resolution_gates_access() {
        let sessions = SessionManager::new(SESSION_TTL);
        let account_id = Uuid::new_v4();
        let token = sessions.create(account_id).await;

        let ctx = AuthContext::resolve(&sessions, Some(token.clone())).await;
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.account_id(), Some(account_id));
        assert_eq!(ctx.token(), Some(token.as_str()));

        let ctx = AuthContext::resolve(&sessions, Some("bogus".to_string())).await;
        assert!(!ctx.is_authenticated());

        let ctx = AuthContext::resolve(&sessions, None).await;
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.account_id(), None);
    }
}
