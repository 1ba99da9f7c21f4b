use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use workout_sync::{
	Config, HttpSyncGateway, NotificationQueue, SyncRange, SyncReconciler,
	gateway::RemoteStatus,
};

/// Push planned workouts to the training platform and retry the ones that fail.
#[derive(Parser, Debug)]
#[command(name = "workout-sync", version)]
struct Args {
	/// First day of the sync window (YYYY-MM-DD)
	#[arg(long)]
	start: NaiveDate,

	/// Last day of the sync window (YYYY-MM-DD)
	#[arg(long)]
	end: NaiveDate,

	/// Extra guidance for the plan generator
	#[arg(long)]
	prompt: Option<String>,

	/// Retry every failed workout once after the sync
	#[arg(long)]
	retry_failed: bool,

	/// Check that synced workouts still exist remotely
	#[arg(long)]
	verify: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let args = Args::parse();

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return ExitCode::FAILURE;
		}
	};
	info!(
		"Using sync API at {} ({})",
		config.api_url.value, config.api_url.source
	);

	let gateway = match HttpSyncGateway::from_config(&config) {
		Ok(gateway) => Arc::new(gateway),
		Err(e) => {
			error!("Failed to create HTTP gateway: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let notifications = NotificationQueue::new(config.notification_ttl.value);
	let reconciler = SyncReconciler::new(gateway, notifications.clone());

	let mut range = SyncRange::new(
		args.start.and_time(NaiveTime::MIN).and_utc(),
		args.end.and_time(NaiveTime::MIN).and_utc(),
	);
	range.prompt = args.prompt;

	let exit = run(&reconciler, &range, args.retry_failed, args.verify).await;

	for message in notifications.messages() {
		match &message.body {
			Some(body) => info!("[{}] {}: {}", message.severity, message.title, body),
			None => info!("[{}] {}", message.severity, message.title),
		}
	}
	notifications.teardown();

	exit
}

async fn run(reconciler: &SyncReconciler, range: &SyncRange, retry_failed: bool, verify: bool) -> ExitCode {
	let batch = match reconciler.trigger_sync(range).await {
		Ok(batch) => batch,
		Err(e) => {
			error!("Sync failed: {}", e);
			return ExitCode::FAILURE;
		}
	};

	for workout in batch.failed_workouts() {
		warn!("Not synced: {} ({})", workout.key(), workout.error_message);
	}

	if retry_failed && batch.failed_count() > 0 {
		let failed = batch.failed_workouts().to_vec();
		match reconciler.trigger_resync(&failed).await {
			Ok(outcome) => {
				for workout in &outcome.newly_synced {
					info!("Synced on retry: {} -> {}", workout.key(), workout.external_id);
				}
			}
			Err(e) => {
				error!("Retry failed: {}", e);
				return ExitCode::FAILURE;
			}
		}
	}

	if verify {
		match reconciler.verify_synced().await {
			Ok(checks) => {
				for check in checks.iter().filter(|c| c.status == RemoteStatus::Error) {
					warn!(
						"{} is no longer confirmed remotely: {}",
						check.workout.key(),
						check.error.as_deref().unwrap_or("unknown error")
					);
				}
				info!("Verified {} synced workouts", checks.len());
			}
			Err(e) => warn!("Verification skipped: {}", e),
		}
	}

	if let Some(current) = reconciler.current() {
		info!("Final state: {}", current.summary());
	}
	ExitCode::SUCCESS
}
