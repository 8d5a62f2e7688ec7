use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh-token", post(handlers::refresh))
        .route("/verify-token", post(handlers::request_verification))
        .route("/verify-account", put(handlers::confirm_verification))
        .route("/forget-password", post(handlers::forget_password))
        .route("/reset-password", put(handlers::reset_password))
        .route("/me", get(handlers::me))
        .route("/password/:id", put(handlers::update_password))
        .route("/block/:id", put(handlers::block_user))
        .route("/unblock/:id", put(handlers::unblock_user))
        .route("/:id", put(handlers::update_profile))
}
