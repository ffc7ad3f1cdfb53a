//! Air-quality alert policy.
//!
//! [`evaluate`] decides, from a user's [`NotificationPreferences`] and a
//! single AQI reading, whether an alert fires and which template applies.
//! It is a pure function: the evaluation time is injected and nothing is
//! mutated. On [`Decision::Fire`] the caller submits the message and only
//! then stamps `last_sent_at` (submission, not delivery, starts the
//! cooldown).

use std::fmt;

use serde::Serialize;

use crate::message::{MessageKind, MessageRequest};
use crate::preferences::NotificationPreferences;
use crate::types::Timestamp;

/// Which alert template a firing decision selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTemplate {
    Good,
    Bad,
}

impl AlertTemplate {
    pub fn kind(self) -> MessageKind {
        match self {
            AlertTemplate::Good => MessageKind::GoodAirAlert,
            AlertTemplate::Bad => MessageKind::BadAirAlert,
        }
    }
}

/// Why an alert was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    EmailDisabled,
    CooldownActive,
    NoThresholdCrossed,
    InvalidReading,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SuppressReason::EmailDisabled => "email disabled",
            SuppressReason::CooldownActive => "cooldown active",
            SuppressReason::NoThresholdCrossed => "no threshold crossed",
            SuppressReason::InvalidReading => "invalid reading",
        })
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Fire { template: AlertTemplate, reading: f64 },
    Suppressed { reason: SuppressReason },
}

impl Decision {
    fn suppressed(reason: SuppressReason) -> Self {
        Decision::Suppressed { reason }
    }

    pub fn is_fire(&self) -> bool {
        matches!(self, Decision::Fire { .. })
    }

    /// Render the alert for `recipient` if this decision fires, otherwise
    /// return why it did not.
    pub fn render(
        &self,
        recipient: &str,
        username: &str,
    ) -> Result<(AlertTemplate, MessageRequest), SuppressReason> {
        match *self {
            Decision::Fire { template, reading } => Ok((
                template,
                MessageRequest::render(template.kind(), recipient, username, reading),
            )),
            Decision::Suppressed { reason } => Err(reason),
        }
    }
}

/// Decide whether `reading` should produce an alert at time `now`.
///
/// Checks run in a fixed order: email switch, cooldown, good threshold
/// (`<=`), bad threshold (`>=`). When both thresholds match, "good" wins.
pub fn evaluate(prefs: &NotificationPreferences, reading: f64, now: Timestamp) -> Decision {
    if !prefs.email_enabled {
        return Decision::suppressed(SuppressReason::EmailDisabled);
    }

    if cooldown_active(prefs, now) {
        return Decision::suppressed(SuppressReason::CooldownActive);
    }

    if !reading.is_finite() {
        return Decision::suppressed(SuppressReason::InvalidReading);
    }

    if prefs.good_alert_enabled && reading <= prefs.good_threshold {
        return Decision::Fire {
            template: AlertTemplate::Good,
            reading,
        };
    }

    if prefs.bad_alert_enabled && reading >= prefs.bad_threshold {
        return Decision::Fire {
            template: AlertTemplate::Bad,
            reading,
        };
    }

    Decision::suppressed(SuppressReason::NoThresholdCrossed)
}

/// `true` while fewer than `cooldown_ms` milliseconds separate `now` from
/// the last accepted alert. A `last_sent_at` in the future also counts.
pub fn cooldown_active(prefs: &NotificationPreferences, now: Timestamp) -> bool {
    match prefs.last_sent_at {
        Some(last) => (now - last).num_milliseconds() < prefs.cooldown_ms,
        None => false,
    }
}
