//! Authoritative in-memory view of the current batch.
//!
//! The store holds the latest `SyncBatchResult` behind an `Arc` and swaps it as a whole
//! value. Readers get a snapshot that can never be observed half-merged. The reconciler
//! is the only writer.

use crate::sync::types::{
    FailedWorkout, SyncBatchResult, WorkoutKey, WorkoutStatus, WorkoutSyncRecord,
};

use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct SyncResultStore {
    current: RwLock<Option<Arc<SyncBatchResult>>>,
}

impl SyncResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current batch, or `None` before the first successful sync.
    pub fn snapshot(&self) -> Option<Arc<SyncBatchResult>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new batch wholesale and return the stored value.
    pub(crate) fn replace(&self, batch: SyncBatchResult) -> Arc<SyncBatchResult> {
        let batch = Arc::new(batch);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(batch.clone());
        batch
    }

    /// Status of a workout in the current batch. Unknown workouts are `Pending`.
    pub fn status_of(&self, key: &WorkoutKey) -> WorkoutStatus {
        let Some(batch) = self.snapshot() else {
            return WorkoutStatus::Pending;
        };

        if batch.synced_workouts().iter().any(|w| w.key() == *key) {
            WorkoutStatus::Synced
        } else if batch.failed_workouts().iter().any(|w| w.key() == *key) {
            WorkoutStatus::Failed
        } else {
            WorkoutStatus::Pending
        }
    }

    /// The stored failure for `key`, if the workout is currently failed.
    pub fn find_failed(&self, key: &WorkoutKey) -> Option<FailedWorkout> {
        self.snapshot()?
            .failed_workouts()
            .iter()
            .find(|w| w.key() == *key)
            .cloned()
    }

    /// Per-workout records of the current batch
    pub fn records(&self) -> Vec<WorkoutSyncRecord> {
        self.snapshot()
            .map(|batch| batch.records())
            .unwrap_or_default()
    }
}
