// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers for the account endpoints.

pub mod accounts;

pub use accounts::{
    change_password, delete_account, forgot_password, health, login, logout, reset_password,
    signup,
};
