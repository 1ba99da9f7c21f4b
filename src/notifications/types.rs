use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    /// Opaque id, unique for the lifetime of the process.
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the expiry timer removes the message, unless dismissed first.
    pub expires_at: DateTime<Utc>,
}
