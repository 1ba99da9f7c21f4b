use crate::gateway::GatewayError;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a workout inside a batch. Assumed unique per batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkoutKey {
	pub date: NaiveDate,
	pub name: String,
}

impl WorkoutKey {
	pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
		Self {
			date,
			name: name.into(),
		}
	}
}

impl fmt::Display for WorkoutKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} - {}", self.date, self.name)
	}
}

/// Sync state of a single workout identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutStatus {
	Pending,
	Synced,
	Failed,
}

/// Per-workout view of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutSyncRecord {
	pub date: NaiveDate,
	pub name: String,
	pub external_id: Option<String>,
	pub status: WorkoutStatus,
	pub error_message: Option<String>,
}

/// A workout accepted by the external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedWorkout {
	#[serde(with = "workout_date")]
	pub date: NaiveDate,
	pub name: String,
	#[serde(rename = "intervals_id")]
	pub external_id: String,
}

impl SyncedWorkout {
	pub fn key(&self) -> WorkoutKey {
		WorkoutKey::new(self.date, self.name.clone())
	}
}

/// A workout the external system rejected, with the reason it gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWorkout {
	#[serde(with = "workout_date")]
	pub date: NaiveDate,
	pub name: String,
	#[serde(rename = "error")]
	pub error_message: String,
}

impl FailedWorkout {
	pub fn key(&self) -> WorkoutKey {
		WorkoutKey::new(self.date, self.name.clone())
	}
}

/// Outcome of the most recent batch.
///
/// Counts are always derived from the sequences they describe, so
/// `success_count == synced_workouts.len()` and `failed_count == failed_workouts.len()`
/// hold for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SyncBatchResult {
	success_count: usize,
	failed_count: usize,
	synced_workouts: Vec<SyncedWorkout>,
	failed_workouts: Vec<FailedWorkout>,
}

impl SyncBatchResult {
	pub fn new(synced_workouts: Vec<SyncedWorkout>, failed_workouts: Vec<FailedWorkout>) -> Self {
		Self {
			success_count: synced_workouts.len(),
			failed_count: failed_workouts.len(),
			synced_workouts,
			failed_workouts,
		}
	}

	pub fn success_count(&self) -> usize {
		self.success_count
	}

	pub fn failed_count(&self) -> usize {
		self.failed_count
	}

	pub fn synced_workouts(&self) -> &[SyncedWorkout] {
		&self.synced_workouts
	}

	pub fn failed_workouts(&self) -> &[FailedWorkout] {
		&self.failed_workouts
	}

	/// Expand the batch into per-workout records, synced first.
	pub fn records(&self) -> Vec<WorkoutSyncRecord> {
		let synced = self.synced_workouts.iter().map(|w| WorkoutSyncRecord {
			date: w.date,
			name: w.name.clone(),
			external_id: Some(w.external_id.clone()),
			status: WorkoutStatus::Synced,
			error_message: None,
		});
		let failed = self.failed_workouts.iter().map(|w| WorkoutSyncRecord {
			date: w.date,
			name: w.name.clone(),
			external_id: None,
			status: WorkoutStatus::Failed,
			error_message: Some(w.error_message.clone()),
		});
		synced.chain(failed).collect()
	}

	/// Human-readable one-line summary
	pub fn summary(&self) -> String {
		format!(
			"{} synced, {} failed",
			self.success_count, self.failed_count
		)
	}
}

/// Result of retrying failed workouts. `still_failed` replaces the previous
/// failed set rather than adding to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResyncOutcome {
	pub newly_synced: Vec<SyncedWorkout>,
	pub still_failed: Vec<FailedWorkout>,
}

impl ResyncOutcome {
	pub fn is_empty(&self) -> bool {
		self.newly_synced.is_empty() && self.still_failed.is_empty()
	}
}

/// Date window for a bulk sync. Either bound may be missing until validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncRange {
	pub start: Option<DateTime<Utc>>,
	pub end: Option<DateTime<Utc>>,
	/// Free-text guidance forwarded to the plan generator on the server.
	pub prompt: Option<String>,
}

impl SyncRange {
	pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
		Self {
			start: Some(start),
			end: Some(end),
			prompt: None,
		}
	}

	pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
		self.prompt = Some(prompt.into());
		self
	}

	/// Returns the checked `(start, end)` pair.
	pub fn validate(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), SyncError> {
		match (self.start, self.end) {
			(Some(start), Some(end)) if start <= end => Ok((start, end)),
			(Some(start), Some(end)) => Err(SyncError::Validation(format!(
				"start date {} is after end date {}",
				start.to_rfc3339(),
				end.to_rfc3339()
			))),
			(None, _) => Err(SyncError::Validation("start date is required".to_string())),
			(_, None) => Err(SyncError::Validation("end date is required".to_string())),
		}
	}
}

/// Errors returned by reconciler operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Invalid sync request: {0}")]
	Validation(String),

	#[error("A sync operation is already in progress, try again")]
	Busy,

	#[error("Network error: {0}")]
	Network(String),

	#[error("Protocol error: {0}")]
	Protocol(String),
}

impl From<GatewayError> for SyncError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::Decode(_) => SyncError::Protocol(err.to_string()),
			GatewayError::Http(_) | GatewayError::Status { .. } | GatewayError::InvalidUrl(_) => {
				SyncError::Network(err.to_string())
			}
		}
	}
}

mod workout_date {
	use chrono::NaiveDate;
	use serde::{Deserialize, Deserializer, Serializer, de::Error};

	const FORMAT: &str = "%Y-%m-%d";

	pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(&date.format(FORMAT))
	}

	/// Accepts a bare date or a full ISO-8601 date-time; the time part is dropped.
	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
		let raw = String::deserialize(deserializer)?;
		let date_part = raw.get(..10).unwrap_or(&raw);
		NaiveDate::parse_from_str(date_part, FORMAT).map_err(D::Error::custom)
	}
}
