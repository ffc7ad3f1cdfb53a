use std::sync::Arc;

use airwatch_events::Notifier;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Alert policy, delivery queue and user directory behind one front door.
    pub notifier: Arc<Notifier>,
    /// PostgreSQL pool when the directory is database-backed; `None` when
    /// running on the in-memory directory.
    pub pool: Option<airwatch_db::DbPool>,
    /// Server configuration (delivery wait budget).
    pub config: Arc<ServerConfig>,
}
