//!
//! HTTP gateway to the workout sync API.
//!
//! This module defines the `SyncGateway` seam the reconciler talks through and the
//! reqwest-backed `HttpSyncGateway` that implements it. The gateway only moves JSON over
//! the wire and reports failures; it never interprets batch contents.

use super::types::*;
use crate::config::Config;
use crate::sync::FailedWorkout;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const SYNC_WORKOUTS_PATH: &str = "/api/sync-workouts";
const RESYNC_FAILED_PATH: &str = "/api/resync-failed";
const SYNC_STATUS_PATH: &str = "/api/sync-status";

/// Fallible async access to the external sync API.
///
/// The external system is assumed idempotent per workout identity, so callers may
/// re-submit the same workouts without creating duplicates.
#[async_trait::async_trait]
pub trait SyncGateway: Send + Sync {
	/// Push every planned workout in the request window.
	async fn sync_workouts(
		&self,
		request: &SyncWorkoutsRequest,
	) -> Result<SyncWorkoutsResponse, GatewayError>;

	/// Retry the given failed workouts.
	async fn resync_failed(
		&self,
		workouts: &[FailedWorkout],
	) -> Result<ResyncResponse, GatewayError>;

	/// Look up a previously synced workout by its external id.
	async fn sync_status(
		&self,
		intervals_id: &str,
	) -> Result<Option<SyncStatusReport>, GatewayError>;
}

/// JSON-over-HTTP gateway
#[derive(Clone)]
pub struct HttpSyncGateway {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the sync API, without a trailing slash.
	base_url: String,
	/// Bearer token attached to every request when present.
	api_token: Option<String>,
}

impl HttpSyncGateway {
	/// Create a new gateway.
	///
	/// # Arguments
	/// * `base_url` - Root of the sync API, e.g. `http://localhost:8000`.
	/// * `api_token` - Optional bearer token.
	/// * `timeout` - Per-request timeout.
	pub fn new(
		base_url: impl Into<String>,
		api_token: Option<String>,
		timeout: Duration,
	) -> Result<Self, GatewayError> {
		let http_client = Client::builder().timeout(timeout).build()?;
		let base_url = base_url.into().trim_end_matches('/').to_string();

		Ok(Self {
			http_client,
			base_url,
			api_token,
		})
	}

	pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
		Self::new(
			config.api_url.value.clone(),
			config.api_token.clone(),
			config.http_timeout.value,
		)
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Status endpoint for one workout, with the id percent-encoded as a single segment.
	fn status_url(&self, intervals_id: &str) -> Result<Url, GatewayError> {
		let mut url = Url::parse(&self.endpoint(SYNC_STATUS_PATH))
			.map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
		url.path_segments_mut()
			.map_err(|_| GatewayError::InvalidUrl(self.base_url.clone()))?
			.push(intervals_id);
		Ok(url)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.api_token {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}

	/// Turn a response into `T`, treating any non-2xx status as a failure.
	async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(GatewayError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let bytes = response.bytes().await?;
		Ok(serde_json::from_slice(&bytes)?)
	}
}

#[async_trait::async_trait]
impl SyncGateway for HttpSyncGateway {
	async fn sync_workouts(
		&self,
		request: &SyncWorkoutsRequest,
	) -> Result<SyncWorkoutsResponse, GatewayError> {
		let url = self.endpoint(SYNC_WORKOUTS_PATH);
		debug!(
			"POST {} ({} to {})",
			url,
			request.start_date.to_rfc3339(),
			request.end_date.to_rfc3339()
		);

		let response = self
			.authorize(self.http_client.post(&url))
			.json(request)
			.send()
			.await?;

		Self::read_json(response).await
	}

	async fn resync_failed(
		&self,
		workouts: &[FailedWorkout],
	) -> Result<ResyncResponse, GatewayError> {
		let url = self.endpoint(RESYNC_FAILED_PATH);
		debug!("POST {} ({} workouts)", url, workouts.len());

		let response = self
			.authorize(self.http_client.post(&url))
			.json(workouts)
			.send()
			.await?;

		Self::read_json(response).await
	}

	async fn sync_status(
		&self,
		intervals_id: &str,
	) -> Result<Option<SyncStatusReport>, GatewayError> {
		let url = self.status_url(intervals_id)?;
		debug!("GET {}", url);

		let response = self
			.authorize(self.http_client.get(url))
			.send()
			.await?;

		Self::read_json(response).await
	}
}
