//! Ephemeral notification queue.
//!
//! This module provides the `NotificationQueue`, which holds short-lived user-facing
//! messages and removes each one automatically once its TTL elapses. Every message owns
//! an independently cancellable Tokio task acting as its expiry timer; `dismiss` and
//! `teardown` abort those tasks so no stale callback ever touches the queue again.
//!
//! Timer tasks only hold a weak reference to the queue state. Once the last
//! `NotificationQueue` handle is dropped the state is released, its remaining timers are
//! aborted, and any timer that still wakes up finds nothing to mutate.

use super::types::{NotificationMessage, Severity};
use crate::config::DEFAULT_NOTIFICATION_TTL;

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Process-wide counter feeding notification ids.
static NEXT_NOTIFICATION: AtomicU64 = AtomicU64::new(1);

/// Generate a notification id from a monotonic counter plus a random suffix.
///
/// The counter alone makes ids unique within the process; the random part keeps ids from
/// different processes or restarts from lining up.
pub fn generate_notification_id() -> String {
    let sequence = NEXT_NOTIFICATION.fetch_add(1, Ordering::Relaxed);
    let mut salt = [0u8; 4];
    rand::rng().fill(&mut salt);
    format!("ntf-{:06x}-{}", sequence, hex::encode(salt))
}

#[derive(Default)]
struct QueueState {
    /// Active messages in insertion order
    messages: Vec<NotificationMessage>,
    /// Pending expiry timers keyed by message id
    timers: HashMap<String, JoinHandle<()>>,
}

impl QueueState {
    fn remove(&mut self, id: &str) -> bool {
        if let Some(timer) = self.timers.remove(id) {
            timer.abort();
        }
        let before = self.messages.len();
        self.messages.retain(|message| message.id != id);
        self.messages.len() != before
    }

    fn cancel_timers(&mut self) -> usize {
        let count = self.timers.len();
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        count
    }
}

impl Drop for QueueState {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a queue of expiring notifications.
///
/// Cloning the handle shares the same queue. Must be used from within a Tokio runtime,
/// since each enqueued message spawns its expiry task.
#[derive(Clone)]
pub struct NotificationQueue {
    state: Arc<Mutex<QueueState>>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationQueue {
    /// Create an empty queue whose messages live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Add a message and schedule its removal. Returns the new message id.
    pub fn enqueue(
        &self,
        severity: Severity,
        title: impl Into<String>,
        body: Option<String>,
    ) -> String {
        let id = generate_notification_id();
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let message = NotificationMessage {
            id: id.clone(),
            severity,
            title: title.into(),
            body,
            created_at,
            expires_at,
        };

        // The timer is registered under the lock so an immediate expiry cannot run
        // before its handle is recorded.
        let mut state = lock(&self.state);
        state.messages.push(message);
        let timer = spawn_expiry(Arc::downgrade(&self.state), id.clone(), self.ttl);
        state.timers.insert(id.clone(), timer);

        debug!("Enqueued {} notification {}", severity, id);
        id
    }

    /// Remove a message and cancel its timer. Unknown or already removed ids are ignored.
    pub fn dismiss(&self, id: &str) {
        if lock(&self.state).remove(id) {
            debug!("Dismissed notification {}", id);
        }
    }

    /// Cancel every outstanding expiry timer.
    ///
    /// Messages still in the queue stay where they are but will no longer expire.
    pub fn teardown(&self) {
        let cancelled = lock(&self.state).cancel_timers();
        debug!("Notification queue torn down, {} timers cancelled", cancelled);
    }

    /// Snapshot of the active messages in insertion order.
    pub fn messages(&self) -> Vec<NotificationMessage> {
        lock(&self.state).messages.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of expiry timers still scheduled.
    pub fn active_timers(&self) -> usize {
        lock(&self.state).timers.len()
    }
}

fn spawn_expiry(state: Weak<Mutex<QueueState>>, id: String, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;

        let Some(state) = state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        // A missing handle means dismiss or teardown got here first.
        if state.timers.remove(&id).is_none() {
            return;
        }
        if state.remove(&id) {
            debug!("Notification {} expired", id);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TTL: Duration = Duration::from_secs(5);

    async fn sleep_past_ttl() {
        tokio::time::sleep(TTL + Duration::from_millis(10)).await;
    }

    #[test]
    fn test_ids_are_unique_under_rapid_generation() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_notification_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_preserves_insertion_order() {
        let queue = NotificationQueue::new(TTL);
        let first = queue.enqueue(Severity::Info, "first", None);
        let second = queue.enqueue(Severity::Success, "second", Some("body".to_string()));
        let third = queue.enqueue(Severity::Error, "third", None);

        let ids: Vec<String> = queue.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, second, third]);
        assert_eq!(queue.active_timers(), 3);

        let message = &queue.messages()[1];
        assert_eq!(message.body.as_deref(), Some("body"));
        assert_eq!(
            message.expires_at - message.created_at,
            chrono::Duration::seconds(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_expire_after_ttl() {
        let queue = NotificationQueue::new(TTL);
        queue.enqueue(Severity::Info, "hello", None);

        tokio::time::sleep(TTL - Duration::from_millis(10)).await;
        assert_eq!(queue.len(), 1);

        sleep_past_ttl().await;
        assert!(queue.is_empty());
        assert_eq!(queue.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_is_idempotent_and_cancels_timer() {
        let queue = NotificationQueue::new(TTL);
        let keep = queue.enqueue(Severity::Info, "keep", None);
        let drop_me = queue.enqueue(Severity::Info, "drop", None);

        queue.dismiss(&drop_me);
        let after_once = queue.messages();
        assert_eq!(queue.active_timers(), 1);

        queue.dismiss(&drop_me);
        queue.dismiss("ntf-unknown");
        assert_eq!(queue.messages(), after_once);
        assert_eq!(after_once.len(), 1);
        assert_eq!(after_once[0].id, keep);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_after_expiry_is_noop() {
        let queue = NotificationQueue::new(TTL);
        let id = queue.enqueue(Severity::Error, "gone", None);

        sleep_past_ttl().await;
        assert!(queue.is_empty());

        queue.dismiss(&id);
        assert!(queue.is_empty());
        assert_eq!(queue.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_all_timers() {
        let queue = NotificationQueue::new(TTL);
        queue.enqueue(Severity::Info, "a", None);
        queue.enqueue(Severity::Success, "b", None);
        queue.enqueue(Severity::Error, "c", None);

        queue.teardown();
        assert_eq!(queue.active_timers(), 0);
        let before = queue.messages();

        sleep_past_ttl().await;
        assert_eq!(queue.messages(), before);
        assert_eq!(before.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_teardown_wins_over_timer_waiting_on_lock() {
        let queue = NotificationQueue::new(Duration::from_millis(1));
        queue.enqueue(Severity::Info, "late", None);

        {
            let mut state = lock(&queue.state);
            // Let the timer wake up and block on the lock held here.
            std::thread::sleep(Duration::from_millis(50));
            state.cancel_timers();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_releases_state() {
        let queue = NotificationQueue::new(TTL);
        queue.enqueue(Severity::Info, "orphan", None);
        let weak = Arc::downgrade(&queue.state);

        drop(queue);
        assert!(weak.upgrade().is_none());

        // Nothing left for the aborted timer to touch.
        sleep_past_ttl().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_the_same_queue() {
        let queue = NotificationQueue::new(TTL);
        let other = queue.clone();
        let id = other.enqueue(Severity::Success, "shared", None);

        assert_eq!(queue.messages()[0].id, id);
        queue.dismiss(&id);
        assert!(other.is_empty());
    }
}
