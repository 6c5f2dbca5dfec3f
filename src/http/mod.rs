use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser, Caller};
pub use error::{AppError, Envelope, EnvelopeData};
pub use handlers::{ACTION_GET_NOTIFICATIONS, ACTION_MARK_AS_READ, AJAX_PATH};

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::ajax())
        .merge(routes::admin())
        .with_state(state)
}
