//! Capped, persisted notification log with read/unread state.
//!
//! Newest events sit at the front. After every append the log is truncated
//! to its cap, dropping the oldest entries regardless of read status.
//! Observers are told after each successful mutation.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{NotificationEvent, NotificationKind};
use crate::store::{self, KvStore, NOTIFICATIONS_KEY};

/// Default number of events kept.
pub const DEFAULT_CAP: usize = 20;

/// Receives a signal whenever the log changes.
pub trait LogObserver: Send + Sync {
    /// Called after a mutation has been persisted. `has_unread` reflects the
    /// log's state after the change.
    fn on_log_changed(&self, has_unread: bool);
}

pub struct NotificationLog {
    store: Arc<dyn KvStore>,
    cap: usize,
    observers: Mutex<Vec<Arc<dyn LogObserver>>>,
    write_lock: Mutex<()>,
}

impl NotificationLog {
    pub fn new(store: Arc<dyn KvStore>, cap: usize) -> Self {
        Self {
            store,
            cap,
            observers: Mutex::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn LogObserver>) {
        self.observers.lock().unwrap().push(observer);
    }

    fn load(&self) -> Vec<NotificationEvent> {
        store::load_or_default(self.store.as_ref(), NOTIFICATIONS_KEY)
    }

    fn notify(&self, events: &[NotificationEvent]) {
        let has_unread = events.iter().any(|e| !e.read);
        let observers = self.observers.lock().unwrap().clone();
        for observer in observers {
            observer.on_log_changed(has_unread);
        }
    }

    /// Append an unread event at the front and enforce the cap.
    pub fn record(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Result<NotificationEvent, StoreError> {
        let event = NotificationEvent {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
        };

        let events = {
            let _guard = self.write_lock.lock().unwrap();
            let mut events = self.load();
            events.insert(0, event.clone());
            events.truncate(self.cap);
            store::save(self.store.as_ref(), NOTIFICATIONS_KEY, &events)?;
            events
        };

        tracing::debug!(kind = %event.kind, "notification recorded: {}", event.message);
        self.notify(&events);
        Ok(event)
    }

    /// The first `n` events, most recent first.
    pub fn list_recent(&self, n: usize) -> Vec<NotificationEvent> {
        let mut events = self.load();
        events.truncate(n);
        events
    }

    pub fn list_all(&self) -> Vec<NotificationEvent> {
        self.load()
    }

    pub fn mark_all_read(&self) -> Result<(), StoreError> {
        let events = {
            let _guard = self.write_lock.lock().unwrap();
            let mut events = self.load();
            for event in &mut events {
                event.read = true;
            }
            store::save(self.store.as_ref(), NOTIFICATIONS_KEY, &events)?;
            events
        };
        self.notify(&events);
        Ok(())
    }

    pub fn has_unread(&self) -> bool {
        self.load().iter().any(|e| !e.read)
    }

    pub fn unread_count(&self) -> usize {
        self.load().iter().filter(|e| !e.read).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn log(cap: usize) -> NotificationLog {
        NotificationLog::new(Arc::new(MemoryStore::new()), cap)
    }

    #[derive(Default)]
    struct CountingObserver {
        calls: AtomicU32,
        last_unread: AtomicBool,
    }

    impl LogObserver for CountingObserver {
        fn on_log_changed(&self, has_unread: bool) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.last_unread.store(has_unread, Ordering::Relaxed);
        }
    }

    #[test]
    fn record_prepends_unread() {
        let log = log(DEFAULT_CAP);
        log.record(NotificationKind::Info, "first").unwrap();
        log.record(NotificationKind::Success, "second").unwrap();
        let events = log.list_all();
        assert_eq!(events[0].message, "second");
        assert_eq!(events[1].message, "first");
        assert!(events.iter().all(|e| !e.read));
        assert!(log.has_unread());
    }

    #[test]
    fn cap_keeps_most_recent() {
        let log = log(5);
        for i in 0..12 {
            log.record(NotificationKind::Info, format!("event {i}"))
                .unwrap();
        }
        let messages: Vec<_> = log.list_all().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["event 11", "event 10", "event 9", "event 8", "event 7"]
        );
    }

    #[test]
    fn eviction_ignores_read_status() {
        let log = log(2);
        log.record(NotificationKind::Info, "old unread").unwrap();
        log.record(NotificationKind::Info, "middle").unwrap();
        log.mark_all_read().unwrap();
        log.record(NotificationKind::Info, "newest").unwrap();
        let messages: Vec<_> = log.list_all().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["newest", "middle"]);
    }

    #[test]
    fn list_recent_limits() {
        let log = log(DEFAULT_CAP);
        for i in 0..4 {
            log.record(NotificationKind::Info, format!("n{i}")).unwrap();
        }
        let recent = log.list_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "n3");
        assert_eq!(log.list_recent(10).len(), 4);
    }

    #[test]
    fn mark_all_read_clears_unread() {
        let log = log(DEFAULT_CAP);
        log.record(NotificationKind::Success, "done").unwrap();
        assert_eq!(log.unread_count(), 1);
        log.mark_all_read().unwrap();
        assert!(!log.has_unread());
        assert_eq!(log.list_all().len(), 1);
    }

    #[test]
    fn observers_see_every_mutation() {
        let log = log(DEFAULT_CAP);
        let observer = Arc::new(CountingObserver::default());
        log.subscribe(observer.clone());

        log.record(NotificationKind::Info, "hello").unwrap();
        assert_eq!(observer.calls.load(Ordering::Relaxed), 1);
        assert!(observer.last_unread.load(Ordering::Relaxed));

        log.mark_all_read().unwrap();
        assert_eq!(observer.calls.load(Ordering::Relaxed), 2);
        assert!(!observer.last_unread.load(Ordering::Relaxed));
    }

    #[test]
    fn empty_log_has_no_unread() {
        let log = log(DEFAULT_CAP);
        assert!(!log.has_unread());
        assert!(log.list_recent(5).is_empty());
    }
}
