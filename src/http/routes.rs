use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn ajax() -> Router<AppState> {
    Router::new()
        .route(handlers::AJAX_PATH, post(handlers::ajax))
        .route("/ajax/nonce", get(handlers::issue_nonce))
}

pub fn admin() -> Router<AppState> {
    Router::new().route("/admin/notifications", post(handlers::create_notification))
}
