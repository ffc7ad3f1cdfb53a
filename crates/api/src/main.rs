use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use airwatch_core::directory::{InMemoryUserDirectory, UserDirectory};
use airwatch_events::{
    DeliveryQueue, EmailConfig, LogTransport, Notifier, QueueConfig, SmtpTransport, Transport,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airwatch_api::config::ServerConfig;
use airwatch_api::router::build_app_router;
use airwatch_api::seed::load_seed_users;
use airwatch_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "airwatch_api=debug,airwatch_events=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- User directory ---
    let (directory, pool) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = airwatch_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            airwatch_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            airwatch_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let directory: Arc<dyn UserDirectory> =
                Arc::new(airwatch_db::PgUserDirectory::new(pool.clone()));
            (directory, Some(pool))
        }
        Err(_) => {
            let seed_path = std::env::var("SEED_USERS_FILE")
                .expect("Set DATABASE_URL, or SEED_USERS_FILE to run on an in-memory directory");
            let users = load_seed_users(&seed_path).expect("Failed to load seed users");
            tracing::warn!(
                path = %seed_path,
                users = users.len(),
                "DATABASE_URL not set, using an in-memory user directory; changes are not persisted"
            );
            let directory: Arc<dyn UserDirectory> =
                Arc::new(InMemoryUserDirectory::with_users(users));
            (directory, None)
        }
    };

    // --- Delivery ---
    let transport: Arc<dyn Transport> = match EmailConfig::from_env() {
        Some(email) => {
            let smtp = SmtpTransport::new(&email).expect("Invalid SMTP configuration");
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "SMTP transport configured");
            Arc::new(smtp)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outbound messages will only be logged");
            Arc::new(LogTransport)
        }
    };

    let queue_config = QueueConfig::from_env();
    tracing::info!(
        pacing_ms = queue_config.pacing_interval.as_millis() as u64,
        capacity = queue_config.capacity,
        "Delivery queue configured"
    );
    let queue = DeliveryQueue::new(transport, queue_config);

    // --- App state ---
    let state = AppState {
        notifier: Arc::new(Notifier::new(directory, queue.clone())),
        pool,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining delivery queue");

    queue.close();
    let pending = queue.len();
    let budget = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(budget, queue.drained()).await.is_err() {
        tracing::warn!(
            pending = queue.len(),
            "Delivery queue did not drain in time, remaining messages are dropped"
        );
    } else {
        tracing::info!(pending, "Delivery queue drained");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
