//! Route definitions for the per-user notification resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /{id}/notification-preferences  -> get_preferences
/// PUT    /{id}/notification-preferences  -> update_preferences
/// POST   /{id}/readings                  -> submit_reading
/// POST   /{id}/lifecycle-messages        -> send_lifecycle_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/notification-preferences",
            get(notification::get_preferences).put(notification::update_preferences),
        )
        .route("/{id}/readings", post(notification::submit_reading))
        .route(
            "/{id}/lifecycle-messages",
            post(notification::send_lifecycle_message),
        )
}
