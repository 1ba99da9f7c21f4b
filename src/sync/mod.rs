//! Workout Synchronization Module
//!
//! This module provides the core logic for synchronizing planned workouts with the external
//! training platform and retrying the ones that failed. It is composed of several submodules:
//!
//! - `reconciler`: The entry point. Runs sync, resync and status checks through a gateway and
//!   merges their outcomes.
//! - `store`: Holds the authoritative snapshot of the current batch.
//! - `events`: Event types and handlers used to report outcomes (notifications included).
//! - `types`: Workout records, batch results and the sync error taxonomy.
//!
//! The reconciler only replaces the stored batch after a gateway response has been
//! validated, so a failed or malformed call never corrupts the last known-good state.

/// Event system for reporting sync outcomes
pub mod events;
/// Sync, resync and merge coordination
pub mod reconciler;
/// Snapshot store for the current batch
pub mod store;
/// Domain types and errors
pub mod types;

pub use events::{EventDispatcher, NotificationEventHandler, SyncEvent, SyncEventHandler};
pub use reconciler::{SyncReconciler, SyncStatusCheck, merge};
pub use store::SyncResultStore;
pub use types::*;
