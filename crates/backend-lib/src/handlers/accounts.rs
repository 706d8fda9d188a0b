// ============================
// crates/backend-lib/src/handlers/accounts.rs
// ============================
//! Account endpoint handlers.
//!
//! Each handler resolves an explicit `AuthContext` from the request
//! headers, enforces the input-format preconditions, and delegates to
//! the auth service or the reset flow. Authorization failures surface
//! here, not inside the engine.
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::store::Account;
use crate::validation::{validate_email, validate_password};
use crate::AppState;
use accounts_common::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    SessionResponse, SignupRequest,
};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics::counter;
use std::sync::Arc;

/// Pull a bearer token out of the Authorization header, if present.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the request's authentication context once, at the edge.
async fn request_context(state: &AppState, headers: &HeaderMap) -> AuthContext {
    AuthContext::resolve(&state.sessions, extract_bearer_token(headers)).await
}

fn session_body(account: &Account, session_token: String) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_token,
        account_id: account.id,
        email: account.email.clone(),
    })
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `POST /signup` - create an account and establish a session.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let (account, token) = state.auth.register(&req.email, &req.password).await?;

    counter!("account_registered").increment(1);
    Ok((StatusCode::CREATED, session_body(&account, token)))
}

/// `POST /login` - verify credentials and establish a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (account, token) = state.auth.login(&req.email, &req.password).await?;

    counter!("account_login").increment(1);
    Ok((StatusCode::OK, session_body(&account, token)))
}

/// `POST /logout` - tear down the caller's session.
/// Always succeeds; logging out an anonymous context is a no-op.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let ctx = request_context(&state, &headers).await;
    state.auth.logout(&ctx).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /forgot` - issue a reset token and notify the account holder.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_email(&req.email)?;

    state.reset.request_reset(&req.email).await?;

    counter!("reset_requested").increment(1);
    Ok(StatusCode::ACCEPTED)
}

/// `POST /reset` - redeem a reset token, rotating the credential and
/// establishing a session. The token itself is the credential here.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_password(&req.password)?;

    let (account, token) = state.reset.redeem_reset(&req.token, &req.password).await?;

    counter!("reset_redeemed").increment(1);
    Ok((StatusCode::OK, session_body(&account, token)))
}

/// `POST /account/password` - direct rotation for an authenticated
/// caller, bypassing the token flow.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = request_context(&state, &headers).await;
    if !ctx.is_authenticated() {
        return Err(AppError::Unauthorized);
    }
    validate_password(&req.password)?;

    state.auth.change_password(&ctx, &req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /account` - remove the caller's account and session.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let ctx = request_context(&state, &headers).await;
    if !ctx.is_authenticated() {
        return Err(AppError::Unauthorized);
    }

    state.auth.delete_account(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
