// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication: password hashing, tokens, sessions, and the
//! credential-lifecycle services built on them.

pub mod password;
pub mod reset;
pub mod service;
pub mod service_impl;
pub mod session;
pub mod token_generator;

pub use password::{hash_password, hash_password_secure, verify_password};
pub use reset::{ResetFlow, RESET_TOKEN_TTL};
pub use service::AuthService;
pub use service_impl::PasswordAuth;
pub use session::{AuthContext, Session, SessionManager, SESSION_TTL};
pub use token_generator::generate_token;
