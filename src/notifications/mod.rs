//! Transient user-facing notifications with automatic expiry.

/// Queue of expiring messages and their timers
pub mod queue;
/// Message and severity types
pub mod types;

pub use queue::{NotificationQueue, generate_notification_id};
pub use types::*;
