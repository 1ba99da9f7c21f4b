//! Workout sync engine.
//!
//! Pushes planned workouts to an external training platform through a JSON API, keeps the
//! outcome of the latest batch, lets the user retry only the workouts that failed, and
//! reports every outcome as a short-lived notification.

pub mod config;
pub mod gateway;
pub mod notifications;
pub mod sync;
pub mod utils;

pub use config::{Config, ConfigError};
pub use gateway::{GatewayError, HttpSyncGateway, SyncGateway};
pub use notifications::{NotificationMessage, NotificationQueue, Severity};
pub use sync::{
	FailedWorkout, ResyncOutcome, SyncBatchResult, SyncError, SyncRange, SyncReconciler,
	SyncResultStore, SyncedWorkout, WorkoutKey, WorkoutStatus, WorkoutSyncRecord,
};
