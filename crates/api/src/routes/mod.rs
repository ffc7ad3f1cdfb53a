pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /users/{id}/notification-preferences   get, update
/// /users/{id}/readings                   submit an AQI reading (POST)
/// /users/{id}/lifecycle-messages         send a lifecycle email (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/users", users::router())
}
