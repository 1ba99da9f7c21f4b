//! Event system for workout synchronization.
//!
//! This module defines the events the reconciler publishes when a sync or resync finishes,
//! the handler trait that consumes them, and the dispatcher that fans each event out to
//! every registered handler. Notifications are produced by a handler rather than by the
//! reconciler itself, so other consumers (audit logs, UI bridges) can be plugged in the
//! same way.

use crate::notifications::{NotificationQueue, Severity};
use crate::sync::SyncError;
use crate::utils::pluralize;

/// Events that occur during workout synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A bulk sync returned a valid batch
    SyncCompleted {
        success_count: usize,
        failed_count: usize,
    },
    /// A bulk sync could not produce a batch
    SyncFailed { reason: String },
    /// A retry of failed workouts was merged
    ResyncCompleted {
        newly_synced: usize,
        still_failed: usize,
    },
    /// A retry of failed workouts could not be merged
    ResyncFailed { reason: String },
}

/// Trait for handling sync events.
///
/// Implementors receive every event dispatched by the reconciler.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
    /// Handle a sync event.
    async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// Handlers are called in registration order. A failing handler is logged and does not
/// prevent the others from running.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event handler.
    pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatch an event to all registered handlers.
    pub async fn dispatch(&self, event: &SyncEvent) {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }
}

/// Turns sync events into user-facing notifications.
pub struct NotificationEventHandler {
    queue: NotificationQueue,
}

impl NotificationEventHandler {
    pub fn new(queue: NotificationQueue) -> Self {
        Self { queue }
    }
}

/// Severity, title and body of the notification announcing `event`.
pub fn describe_event(event: &SyncEvent) -> (Severity, &'static str, Option<String>) {
    match event {
        SyncEvent::SyncCompleted {
            success_count,
            failed_count: 0,
        } => (
            Severity::Success,
            "Sync complete",
            Some(format!("{} synced", pluralize(*success_count, "workout"))),
        ),
        SyncEvent::SyncCompleted {
            success_count,
            failed_count,
        } => (
            Severity::Info,
            "Sync finished with failures",
            Some(format!(
                "{} synced, {} failed",
                pluralize(*success_count, "workout"),
                failed_count
            )),
        ),
        SyncEvent::SyncFailed { reason } => (Severity::Error, "Sync failed", Some(reason.clone())),
        SyncEvent::ResyncCompleted {
            newly_synced,
            still_failed: 0,
        } => (
            Severity::Success,
            "Retry complete",
            Some(format!("{} synced", pluralize(*newly_synced, "workout"))),
        ),
        SyncEvent::ResyncCompleted {
            newly_synced,
            still_failed,
        } => (
            Severity::Info,
            "Retry finished with failures",
            Some(format!(
                "{} synced, {} still failing",
                pluralize(*newly_synced, "workout"),
                still_failed
            )),
        ),
        SyncEvent::ResyncFailed { reason } => {
            (Severity::Error, "Retry failed", Some(reason.clone()))
        }
    }
}

#[async_trait::async_trait]
impl SyncEventHandler for NotificationEventHandler {
    async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
        let (severity, title, body) = describe_event(event);
        self.queue.enqueue(severity, title, body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationEventHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingHandler;

    #[async_trait::async_trait]
    impl SyncEventHandler for FailingHandler {
        async fn handle(&self, _event: &SyncEvent) -> Result<(), SyncError> {
            Err(SyncError::Protocol("handler broke".to_string()))
        }

        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<SyncEvent>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SyncEventHandler for std::sync::Arc<RecordingHandler> {
        async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "RecordingHandler"
        }
    }

    #[test]
    fn test_describe_event_severity() {
        let clean = SyncEvent::SyncCompleted {
            success_count: 4,
            failed_count: 0,
        };
        let (severity, _, body) = describe_event(&clean);
        assert_eq!(severity, Severity::Success);
        assert_eq!(body.as_deref(), Some("4 workouts synced"));

        let partial = SyncEvent::SyncCompleted {
            success_count: 1,
            failed_count: 2,
        };
        let (severity, _, body) = describe_event(&partial);
        assert_eq!(severity, Severity::Info);
        assert_eq!(body.as_deref(), Some("1 workout synced, 2 failed"));

        let failed = SyncEvent::ResyncFailed {
            reason: "HTTP 502".to_string(),
        };
        let (severity, title, body) = describe_event(&failed);
        assert_eq!(severity, Severity::Error);
        assert_eq!(title, "Retry failed");
        assert_eq!(body.as_deref(), Some("HTTP 502"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_handler_does_not_block_others() {
        let recorder = std::sync::Arc::new(RecordingHandler::default());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register_handler(Box::new(FailingHandler));
        dispatcher.register_handler(Box::new(recorder.clone()));

        let event = SyncEvent::SyncFailed {
            reason: "offline".to_string(),
        };
        dispatcher.dispatch(&event).await;

        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.seen.lock().unwrap()[0], event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_handler_enqueues_message() {
        let queue = NotificationQueue::new(Duration::from_secs(5));
        let handler = NotificationEventHandler::new(queue.clone());

        handler
            .handle(&SyncEvent::ResyncCompleted {
                newly_synced: 2,
                still_failed: 1,
            })
            .await
            .unwrap();

        let messages = queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Info);
        assert_eq!(
            messages[0].body.as_deref(),
            Some("2 workouts synced, 1 still failing")
        );
    }
}
