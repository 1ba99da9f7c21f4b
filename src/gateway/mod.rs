//! Gateway to the external workout sync API
//!
//! This module provides the `SyncGateway` trait the reconciler depends on, the
//! HTTP implementation of it, and the wire types exchanged with the server.

/// HTTP client for the sync endpoints
mod client;
/// Request/response types and gateway errors
mod types;

pub use client::{HttpSyncGateway, SyncGateway};
pub use types::*;
