// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router wiring.
use crate::handlers::{
    change_password, delete_account, forgot_password, health, login, logout, reset_password,
    signup,
};
use crate::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the account-service router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot", post(forgot_password))
        .route("/reset", post(reset_password))
        .route("/account/password", post(change_password))
        .route("/account", delete(delete_account))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
