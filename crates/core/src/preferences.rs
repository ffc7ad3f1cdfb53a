//! Per-user notification preferences.
//!
//! [`NotificationPreferences`] is embedded in every [`User`](crate::user::User)
//! record. It carries the alert switches, the two AQI thresholds and the
//! cooldown bookkeeping (`last_sent_at` + `cooldown_ms`) consulted by
//! [`policy::evaluate`](crate::policy::evaluate).
//!
//! The two thresholds are independent: nothing enforces
//! `good_threshold < bad_threshold`. A misconfigured pair can make a single
//! reading satisfy both conditions, in which case the policy picks "good".

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default AQI at or below which a "good air" alert fires.
pub const DEFAULT_GOOD_THRESHOLD: f64 = 50.0;

/// Default AQI at or above which a "bad air" alert fires.
pub const DEFAULT_BAD_THRESHOLD: f64 = 100.0;

/// Default minimum gap between two alerts to the same user (1 hour).
pub const DEFAULT_COOLDOWN_MS: i64 = 3_600_000;

/// Notification settings owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Master switch for threshold alerts.
    pub email_enabled: bool,
    /// Whether a reading at or below `good_threshold` produces an alert.
    pub good_alert_enabled: bool,
    /// Whether a reading at or above `bad_threshold` produces an alert.
    pub bad_alert_enabled: bool,
    pub good_threshold: f64,
    pub bad_threshold: f64,
    /// When the last alert was accepted by the delivery queue.
    pub last_sent_at: Option<Timestamp>,
    /// Minimum milliseconds between two alerts. Never negative.
    pub cooldown_ms: i64,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_enabled: true,
            good_alert_enabled: true,
            bad_alert_enabled: true,
            good_threshold: DEFAULT_GOOD_THRESHOLD,
            bad_threshold: DEFAULT_BAD_THRESHOLD,
            last_sent_at: None,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl NotificationPreferences {
    /// Record that an alert was accepted for delivery at `at`.
    pub fn mark_sent(&mut self, at: Timestamp) {
        self.last_sent_at = Some(at);
    }
}

/// DTO for a partial preference update. `None` fields are left unchanged.
///
/// `last_sent_at` is deliberately absent: only the alert path moves it.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UpdateNotificationPreferences {
    pub email_enabled: Option<bool>,
    pub good_alert_enabled: Option<bool>,
    pub bad_alert_enabled: Option<bool>,
    #[validate(custom(function = "validate_finite"))]
    pub good_threshold: Option<f64>,
    #[validate(custom(function = "validate_finite"))]
    pub bad_threshold: Option<f64>,
    #[validate(range(min = 0))]
    pub cooldown_ms: Option<i64>,
}

impl UpdateNotificationPreferences {
    /// Validate the update and merge it onto `prefs`.
    ///
    /// On validation failure `prefs` is left untouched.
    pub fn apply_to(&self, prefs: &mut NotificationPreferences) -> Result<(), CoreError> {
        self.validate()?;

        if let Some(v) = self.email_enabled {
            prefs.email_enabled = v;
        }
        if let Some(v) = self.good_alert_enabled {
            prefs.good_alert_enabled = v;
        }
        if let Some(v) = self.bad_alert_enabled {
            prefs.bad_alert_enabled = v;
        }
        if let Some(v) = self.good_threshold {
            prefs.good_threshold = v;
        }
        if let Some(v) = self.bad_threshold {
            prefs.bad_threshold = v;
        }
        if let Some(v) = self.cooldown_ms {
            prefs.cooldown_ms = v;
        }
        Ok(())
    }
}

fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("not_finite"))
    }
}
