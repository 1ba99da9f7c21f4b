//! Workout sync reconciler.
//!
//! This module defines the `SyncReconciler`, which drives bulk synchronization of planned
//! workouts through a `SyncGateway`, keeps the `SyncResultStore` at the last known-good
//! batch, and lets a caller retry only the workouts that failed.
//!
//! The reconciler is responsible for:
//! - Validating the requested date range before any network call
//! - Serializing sync, resync and verification calls (a conflicting call fails with `Busy`)
//! - Structurally validating every gateway response before touching the store
//! - Merging retry outcomes into the previous batch without duplicating identities
//! - Publishing completion and failure events, which become notifications
//!
//! Nothing is retried automatically. A failed call leaves the store untouched and the
//! user decides whether to run it again.

use crate::gateway::{RemoteStatus, ResyncResponse, SyncGateway, SyncWorkoutsRequest, SyncWorkoutsResponse};
use crate::notifications::NotificationQueue;
use crate::sync::events::{EventDispatcher, NotificationEventHandler, SyncEvent, SyncEventHandler};
use crate::sync::store::SyncResultStore;
use crate::sync::types::{
	FailedWorkout, ResyncOutcome, SyncBatchResult, SyncError, SyncRange, SyncedWorkout, WorkoutKey,
};

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Remote state of one synced workout, as reported by `verify_synced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatusCheck {
	pub workout: SyncedWorkout,
	pub status: RemoteStatus,
	pub error: Option<String>,
	pub last_check: Option<NaiveDateTime>,
}

/// Coordinates sync and resync calls for one session.
pub struct SyncReconciler {
	gateway: Arc<dyn SyncGateway>,
	store: SyncResultStore,
	events: EventDispatcher,
	/// Held for the duration of any gateway-bound operation.
	in_flight: Mutex<()>,
}

impl SyncReconciler {
	/// Create a reconciler that reports outcomes into `notifications`.
	pub fn new(gateway: Arc<dyn SyncGateway>, notifications: NotificationQueue) -> Self {
		let mut events = EventDispatcher::new();
		events.register_handler(Box::new(NotificationEventHandler::new(notifications)));

		Self {
			gateway,
			store: SyncResultStore::new(),
			events,
			in_flight: Mutex::new(()),
		}
	}

	/// Register an additional event handler.
	pub fn with_handler(mut self, handler: Box<dyn SyncEventHandler>) -> Self {
		self.events.register_handler(handler);
		self
	}

	/// Read access to the batch store this reconciler writes.
	pub fn store(&self) -> &SyncResultStore {
		&self.store
	}

	/// The current batch, if a sync has succeeded in this session.
	pub fn current(&self) -> Option<Arc<SyncBatchResult>> {
		self.store.snapshot()
	}

	fn begin(&self, operation: &str) -> Result<MutexGuard<'_, ()>, SyncError> {
		self.in_flight.try_lock().map_err(|_| {
			debug!("Rejecting {}: another sync operation is in flight", operation);
			SyncError::Busy
		})
	}

	/// Sync every planned workout in `range` and replace the current batch.
	pub async fn trigger_sync(&self, range: &SyncRange) -> Result<Arc<SyncBatchResult>, SyncError> {
		let (start, end) = range.validate()?;
		let _guard = self.begin("sync")?;

		info!(
			"Starting workout sync from {} to {}",
			start.to_rfc3339(),
			end.to_rfc3339()
		);

		let request = SyncWorkoutsRequest {
			start_date: start,
			end_date: end,
			prompt: range.prompt.clone(),
		};

		let batch = match self.gateway.sync_workouts(&request).await {
			Ok(response) => batch_from_response(response),
			Err(e) => Err(SyncError::from(e)),
		};

		match batch {
			Ok(batch) => {
				let batch = self.store.replace(batch);
				info!("Workout sync completed: {}", batch.summary());
				self.events
					.dispatch(&SyncEvent::SyncCompleted {
						success_count: batch.success_count(),
						failed_count: batch.failed_count(),
					})
					.await;
				Ok(batch)
			}
			Err(e) => {
				log_failure("sync", &e);
				self.events
					.dispatch(&SyncEvent::SyncFailed {
						reason: e.to_string(),
					})
					.await;
				Err(e)
			}
		}
	}

	/// Retry the given failed workouts and merge the outcome into the current batch.
	///
	/// Workouts that are not currently failed are dropped with a warning. When nothing is
	/// left to retry this is a no-op: no gateway call, no notification, store untouched.
	pub async fn trigger_resync(
		&self,
		failed_workouts: &[FailedWorkout],
	) -> Result<ResyncOutcome, SyncError> {
		if failed_workouts.is_empty() {
			debug!("Resync requested with no workouts, nothing to do");
			return Ok(ResyncOutcome::default());
		}

		let _guard = self.begin("resync")?;

		let Some(previous) = self.store.snapshot() else {
			warn!(
				"Dropping {} resync items: no sync has completed in this session",
				failed_workouts.len()
			);
			return Ok(ResyncOutcome::default());
		};

		let targets = select_targets(&previous, failed_workouts);
		if targets.is_empty() {
			debug!("No currently failed workouts left to resync");
			return Ok(ResyncOutcome::default());
		}

		info!("Retrying {} failed workouts", targets.len());

		let result = match self.gateway.resync_failed(&targets).await {
			Ok(response) => outcome_from_response(&previous, &targets, response).and_then(|outcome| {
				let merged = merge(&previous, &outcome)?;
				Ok((outcome, merged))
			}),
			Err(e) => Err(SyncError::from(e)),
		};

		match result {
			Ok((outcome, merged)) => {
				let batch = self.store.replace(merged);
				info!("Workout resync completed: {}", batch.summary());
				self.events
					.dispatch(&SyncEvent::ResyncCompleted {
						newly_synced: outcome.newly_synced.len(),
						still_failed: outcome.still_failed.len(),
					})
					.await;
				Ok(outcome)
			}
			Err(e) => {
				log_failure("resync", &e);
				self.events
					.dispatch(&SyncEvent::ResyncFailed {
						reason: e.to_string(),
					})
					.await;
				Err(e)
			}
		}
	}

	/// Ask the external system about every synced workout of the current batch.
	///
	/// Read-only: synced workouts stay synced whatever the report says.
	pub async fn verify_synced(&self) -> Result<Vec<SyncStatusCheck>, SyncError> {
		let _guard = self.begin("verify")?;

		let Some(batch) = self.store.snapshot() else {
			return Ok(Vec::new());
		};

		let mut checks = Vec::with_capacity(batch.success_count());
		for workout in batch.synced_workouts() {
			let check = match self.gateway.sync_status(&workout.external_id).await {
				Ok(Some(report)) => SyncStatusCheck {
					workout: workout.clone(),
					status: report.status,
					error: report.error,
					last_check: report.last_check,
				},
				Ok(None) => SyncStatusCheck {
					workout: workout.clone(),
					status: RemoteStatus::Error,
					error: Some("not found".to_string()),
					last_check: None,
				},
				Err(e) => {
					warn!("Status check failed for {}: {}", workout.key(), e);
					SyncStatusCheck {
						workout: workout.clone(),
						status: RemoteStatus::Error,
						error: Some(e.to_string()),
						last_check: None,
					}
				}
			};
			checks.push(check);
		}

		Ok(checks)
	}
}

/// Fold a retry outcome into the previous batch.
///
/// Synced workouts are appended; the failed set is replaced by `still_failed`. The result
/// is rejected when an identity would end up both synced and failed, or synced twice.
pub fn merge(
	previous: &SyncBatchResult,
	outcome: &ResyncOutcome,
) -> Result<SyncBatchResult, SyncError> {
	let synced: Vec<SyncedWorkout> = previous
		.synced_workouts()
		.iter()
		.chain(&outcome.newly_synced)
		.cloned()
		.collect();

	let mut synced_keys = HashSet::with_capacity(synced.len());
	for workout in &synced {
		if !synced_keys.insert(workout.key()) {
			return Err(SyncError::Protocol(format!(
				"workout {} would be synced twice",
				workout.key()
			)));
		}
	}

	if let Some(overlap) = outcome
		.still_failed
		.iter()
		.find(|w| synced_keys.contains(&w.key()))
	{
		return Err(SyncError::Protocol(format!(
			"workout {} would be both synced and failed",
			overlap.key()
		)));
	}

	let merged = SyncBatchResult::new(synced, outcome.still_failed.clone());
	debug_assert_eq!(
		merged.success_count(),
		previous.success_count() + outcome.newly_synced.len()
	);
	Ok(merged)
}

fn batch_from_response(response: SyncWorkoutsResponse) -> Result<SyncBatchResult, SyncError> {
	if response.success != response.synced_workouts.len()
		|| response.failed != response.failed_workouts.len()
	{
		return Err(SyncError::Protocol(format!(
			"counts {}/{} do not match {} synced and {} failed entries",
			response.success,
			response.failed,
			response.synced_workouts.len(),
			response.failed_workouts.len()
		)));
	}

	let mut seen = HashSet::new();
	let keys = response
		.synced_workouts
		.iter()
		.map(SyncedWorkout::key)
		.chain(response.failed_workouts.iter().map(FailedWorkout::key));
	for key in keys {
		if !seen.insert(key.clone()) {
			return Err(SyncError::Protocol(format!(
				"workout {} appears more than once in the batch",
				key
			)));
		}
	}

	Ok(SyncBatchResult::new(
		response.synced_workouts,
		response.failed_workouts,
	))
}

/// Keep only the requested workouts that are currently failed, in request order, using the
/// stored failure record for each.
fn select_targets(previous: &SyncBatchResult, requested: &[FailedWorkout]) -> Vec<FailedWorkout> {
	let mut seen = HashSet::new();
	let mut targets = Vec::new();

	for item in requested {
		let key = item.key();
		let stored = previous.failed_workouts().iter().find(|w| w.key() == key);
		match stored {
			Some(stored) if seen.insert(key.clone()) => targets.push(stored.clone()),
			Some(_) => debug!("Ignoring duplicate resync request for {}", key),
			None => warn!("Dropping resync request for {}: not a failed workout", key),
		}
	}

	targets
}

/// Check a retry response against what was asked and build the outcome.
///
/// Failed workouts that were not part of this retry are carried into `still_failed` so
/// the wholesale replacement in `merge` does not lose them.
fn outcome_from_response(
	previous: &SyncBatchResult,
	targets: &[FailedWorkout],
	response: ResyncResponse,
) -> Result<ResyncOutcome, SyncError> {
	let targeted: HashSet<WorkoutKey> = targets.iter().map(FailedWorkout::key).collect();
	let mut answered = HashSet::with_capacity(targeted.len());

	let keys = response
		.newly_synced
		.iter()
		.map(SyncedWorkout::key)
		.chain(response.still_failed.iter().map(FailedWorkout::key));
	for key in keys {
		if !targeted.contains(&key) {
			return Err(SyncError::Protocol(format!(
				"resync returned {} which was not requested",
				key
			)));
		}
		if !answered.insert(key.clone()) {
			return Err(SyncError::Protocol(format!(
				"resync returned {} more than once",
				key
			)));
		}
	}

	if answered.len() != targeted.len() {
		return Err(SyncError::Protocol(format!(
			"resync answered {} of {} requested workouts",
			answered.len(),
			targeted.len()
		)));
	}

	let mut still_failed = response.still_failed;
	still_failed.extend(
		previous
			.failed_workouts()
			.iter()
			.filter(|w| !targeted.contains(&w.key()))
			.cloned(),
	);

	Ok(ResyncOutcome {
		newly_synced: response.newly_synced,
		still_failed,
	})
}

fn log_failure(operation: &str, err: &SyncError) {
	match err {
		SyncError::Protocol(_) => error!("Workout {} rejected: {}", operation, err),
		_ => warn!("Workout {} failed: {}", operation, err),
	}
}
