// ================
// crates/common/src/lib.rs
// ================
//! Wire types shared between the accounts service and its clients.
//! This module defines the request and response bodies for every
//! account endpoint, plus the error body shape the server emits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body for `POST /signup`
/// # Fields
/// * `email` - Address the account is registered under (unique)
/// * `password` - Plaintext password; hashed server-side, never stored
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /forgot`
/// # Fields
/// * `email` - Address to issue a reset token for
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body for `POST /reset`
/// # Fields
/// * `token` - The opaque reset token delivered out-of-band
/// * `password` - Replacement plaintext password
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Body for `POST /account/password` (authenticated)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangePasswordRequest {
    pub password: String,
}

/// Returned whenever an operation establishes a session
/// (signup, login, reset redemption).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionResponse {
    /// Bearer token binding subsequent requests to the account
    pub session_token: String,
    /// Id of the authenticated account
    pub account_id: Uuid,
    /// Normalized address the account is stored under
    pub email: String,
}

/// Error body emitted by the server for every failed request.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Machine-readable error code plus a safe, human-readable message.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
