use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod cookie;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/verify", post(handlers::verify))
        .route("/auth/forgot-password", post(handlers::forgot_password))
        .route("/auth/reset-password/:token", post(handlers::reset_password))
        .route("/auth/check-auth", get(handlers::check_auth))
}
