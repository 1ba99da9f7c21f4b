//! Wire types for the workout sync HTTP API

use crate::sync::{FailedWorkout, SyncedWorkout};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/sync-workouts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncWorkoutsRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Optional guidance for the server-side plan generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Response of `POST /api/sync-workouts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncWorkoutsResponse {
    /// Number of workouts pushed to the external system.
    pub success: usize,
    /// Number of workouts the external system rejected.
    pub failed: usize,
    pub synced_workouts: Vec<SyncedWorkout>,
    pub failed_workouts: Vec<FailedWorkout>,
}

/// Response of `POST /api/resync-failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResyncResponse {
    pub newly_synced: Vec<SyncedWorkout>,
    pub still_failed: Vec<FailedWorkout>,
}

/// State of a previously synced workout as seen by the external system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    /// Workout still exists remotely
    Synced,
    /// Lookup failed or the workout is gone
    Error,
}

/// Response of `GET /api/sync-status/{intervals_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStatusReport {
    pub intervals_id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_check: Option<NaiveDateTime>,
}

/// Errors raised by a sync gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}
