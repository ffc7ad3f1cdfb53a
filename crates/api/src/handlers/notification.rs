//! Handlers for per-user notification preferences, AQI readings and
//! lifecycle messages.
//!
//! Reading and lifecycle endpoints wait for the delivery outcome for at most
//! [`ServerConfig::delivery_wait`](crate::config::ServerConfig::delivery_wait).
//! When the queue is too deep to answer in time they respond `202 queued`;
//! the message is still sent.

use airwatch_core::message::MessageKind;
use airwatch_core::policy::SuppressReason;
use airwatch_core::preferences::{NotificationPreferences, UpdateNotificationPreferences};
use airwatch_core::types::DbId;
use std::time::Duration;

use airwatch_events::{AlertDispatch, DeliveryHandle};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /users/{id}/readings`.
#[derive(Debug, Deserialize)]
pub struct ReadingInput {
    pub aqi: f64,
}

/// Body of `POST /users/{id}/lifecycle-messages`.
#[derive(Debug, Deserialize)]
pub struct LifecycleInput {
    pub kind: MessageKind,
}

/// What happened to a reading or lifecycle request.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The message was handed to the transport successfully.
    Sent { kind: MessageKind },
    /// The message is accepted and waiting in the delivery queue.
    Queued { kind: MessageKind },
    /// The policy decided not to send anything.
    Suppressed { reason: SuppressReason },
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/users/{id}/notification-preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let prefs = state.notifier.preferences(user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/users/{id}/notification-preferences
///
/// Partial update; omitted fields keep their value. `last_sent_at` cannot be
/// set through this endpoint.
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<UpdateNotificationPreferences>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let prefs = state.notifier.update_preferences(user_id, &input).await?;
    Ok(Json(DataResponse { data: prefs }))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

type DispatchResponse = (StatusCode, Json<DataResponse<DispatchStatus>>);

/// POST /api/v1/users/{id}/readings
///
/// Evaluates the reading against the user's preferences. When an alert
/// fires, responds once the transport has answered: 200 on success, 502 on
/// delivery failure, 202 if the answer does not arrive within the wait
/// budget. The cooldown is stamped in all three cases.
pub async fn submit_reading(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<ReadingInput>,
) -> AppResult<DispatchResponse> {
    if !input.aqi.is_finite() {
        return Err(AppError::BadRequest("aqi must be a finite number".into()));
    }

    let dispatch = state
        .notifier
        .process_reading(user_id, input.aqi, chrono::Utc::now())
        .await?;

    match dispatch {
        AlertDispatch::Suppressed(reason) => Ok((
            StatusCode::OK,
            Json(DataResponse {
                data: DispatchStatus::Suppressed { reason },
            }),
        )),
        AlertDispatch::Submitted { template, handle } => {
            await_delivery(handle, template.kind(), state.config.delivery_wait()).await
        }
    }
}

/// POST /api/v1/users/{id}/lifecycle-messages
///
/// Sends a welcome, login, logout or profile-updated email. Never gated by
/// preferences or the alert cooldown.
pub async fn send_lifecycle_message(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<LifecycleInput>,
) -> AppResult<DispatchResponse> {
    let handle = state.notifier.send_lifecycle(user_id, input.kind).await?;
    await_delivery(handle, input.kind, state.config.delivery_wait()).await
}

/// Wait up to `wait` for the outcome; past that, report the message as queued.
async fn await_delivery(
    handle: DeliveryHandle,
    kind: MessageKind,
    wait: Duration,
) -> AppResult<DispatchResponse> {
    match tokio::time::timeout(wait, handle.outcome()).await {
        Ok(outcome) => {
            outcome?;
            Ok((
                StatusCode::OK,
                Json(DataResponse {
                    data: DispatchStatus::Sent { kind },
                }),
            ))
        }
        Err(_) => {
            tracing::debug!(kind = %kind, ?wait, "Delivery still pending, answering queued");
            Ok((
                StatusCode::ACCEPTED,
                Json(DataResponse {
                    data: DispatchStatus::Queued { kind },
                }),
            ))
        }
    }
}
