use airwatch_core::directory::DirectoryError;
use airwatch_core::error::CoreError;
use airwatch_events::{DeliveryError, NotifyError, QueueError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and delivery errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `airwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The user directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The delivery queue refused the message.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The message was accepted but could not be delivered.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::UserNotFound(id) => {
                AppError::Core(CoreError::NotFound { entity: "User", id })
            }
            NotifyError::NotLifecycle(kind) => {
                AppError::BadRequest(format!("{kind} is not a lifecycle message"))
            }
            NotifyError::Invalid(core) => AppError::Core(core),
            NotifyError::Directory(dir) => AppError::Directory(dir),
            NotifyError::Queue(queue) => AppError::Queue(queue),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Directory errors ---
            AppError::Directory(DirectoryError::NotFound { id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("User with id {id} not found"),
            ),
            AppError::Directory(err) => {
                tracing::error!(error = %err, "User directory error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            // --- Delivery errors ---
            AppError::Queue(err) => {
                tracing::warn!(error = %err, "Delivery queue refused message");
                let code = match err {
                    QueueError::Full { .. } => "QUEUE_FULL",
                    QueueError::Closed => "QUEUE_CLOSED",
                };
                (StatusCode::SERVICE_UNAVAILABLE, code, err.to_string())
            }
            AppError::Delivery(err) => {
                tracing::warn!(error = %err, "Message delivery failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "DELIVERY_FAILED",
                    "The message could not be delivered".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
