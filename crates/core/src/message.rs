//! Outbound message catalogue.
//!
//! Every email the service can send is one of the [`MessageKind`]s below.
//! Bodies are fixed strings with simple substitution (username and, for
//! alerts, the rounded AQI); there is no template engine.

use serde::{Deserialize, Serialize};

/// The kind of message being sent.
///
/// Lifecycle kinds are sent unconditionally; alert kinds only ever come out
/// of [`policy::evaluate`](crate::policy::evaluate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Welcome,
    Login,
    Logout,
    ProfileUpdated,
    GoodAirAlert,
    BadAirAlert,
}

impl MessageKind {
    /// Whether this kind is an account lifecycle message (never gated).
    pub fn is_lifecycle(self) -> bool {
        !matches!(self, MessageKind::GoodAirAlert | MessageKind::BadAirAlert)
    }

    pub fn subject(self) -> &'static str {
        match self {
            MessageKind::Welcome => "Welcome to Airwatch",
            MessageKind::Login => "New sign-in to your Airwatch account",
            MessageKind::Logout => "You have signed out of Airwatch",
            MessageKind::ProfileUpdated => "Your Airwatch profile was updated",
            MessageKind::GoodAirAlert => "Good air quality alert",
            MessageKind::BadAirAlert => "Poor air quality alert",
        }
    }

    /// Render the body for `username`. `aqi` is only used by alert kinds.
    fn body(self, username: &str, aqi: i64) -> String {
        match self {
            MessageKind::Welcome => format!(
                "Hi {username},\n\nThanks for signing up. You will receive an email \
                 whenever the air quality crosses one of your alert thresholds."
            ),
            MessageKind::Login => format!(
                "Hi {username},\n\nWe noticed a new sign-in to your account. \
                 If this was not you, please reset your password."
            ),
            MessageKind::Logout => {
                format!("Hi {username},\n\nYou have been signed out of your account.")
            }
            MessageKind::ProfileUpdated => format!(
                "Hi {username},\n\nYour profile details were changed. \
                 If you did not make this change, please contact support."
            ),
            MessageKind::GoodAirAlert => format!(
                "Hi {username},\n\nGood news: the air quality index is now {aqi}, \
                 at or below your good-air threshold."
            ),
            MessageKind::BadAirAlert => format!(
                "Hi {username},\n\nHeads up: the air quality index is now {aqi}, \
                 at or above your poor-air threshold. Consider limiting time outdoors."
            ),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Welcome => "welcome",
            MessageKind::Login => "login",
            MessageKind::Logout => "logout",
            MessageKind::ProfileUpdated => "profile_updated",
            MessageKind::GoodAirAlert => "good_air_alert",
            MessageKind::BadAirAlert => "bad_air_alert",
        };
        f.write_str(name)
    }
}

/// A single message to hand to the transport.
///
/// Has no identity beyond its position in the delivery queue: two equal
/// requests are two independent sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRequest {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl MessageRequest {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Render a lifecycle or alert message for one recipient.
    ///
    /// `reading` is rounded half away from zero before interpolation and is
    /// ignored by lifecycle kinds.
    pub fn render(kind: MessageKind, recipient: &str, username: &str, reading: f64) -> Self {
        Self::new(recipient, kind.subject(), kind.body(username, round_aqi(reading)))
    }
}

/// Round an AQI reading half away from zero.
///
/// Non-finite values collapse to 0; the policy never fires on them anyway.
pub fn round_aqi(reading: f64) -> i64 {
    if reading.is_finite() {
        reading.round() as i64
    } else {
        0
    }
}
