//! In-memory widgets, one per page load.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::Widget;

/// Default idle time before a widget is dropped (30 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry {
    widget: Widget,
    last_activity: Instant,
}

/// Shared handle to one stored widget.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    id: String,
    entry: Arc<Mutex<Entry>>,
}

impl WidgetHandle {
    /// Widget identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `f` against the widget under its lock and mark it active.
    ///
    /// Keep `f` synchronous; never hold the lock across an await.
    pub fn with<R>(&self, f: impl FnOnce(&mut Widget) -> R) -> R {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry.last_activity = Instant::now();
        f(&mut entry.widget)
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(entry.last_activity)
    }
}

/// Thread-safe store for widgets.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    inner: Arc<WidgetStoreInner>,
}

#[derive(Debug)]
struct WidgetStoreInner {
    widgets: RwLock<HashMap<String, WidgetHandle>>,
    idle_timeout: Duration,
    auto_close: Duration,
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT, super::DEFAULT_AUTO_CLOSE)
    }
}

impl WidgetStore {
    /// Create a store. `auto_close` is applied to every new widget.
    #[must_use]
    pub fn new(idle_timeout: Duration, auto_close: Duration) -> Self {
        Self {
            inner: Arc::new(WidgetStoreInner {
                widgets: RwLock::new(HashMap::new()),
                idle_timeout,
                auto_close,
            }),
        }
    }

    /// Create a fresh widget, pruning idle ones first.
    #[must_use]
    pub fn create(&self) -> WidgetHandle {
        let pruned = self.prune_idle(Instant::now());
        if pruned > 0 {
            tracing::debug!(name: "widget.pruned", count = pruned, "Pruned idle widgets");
        }

        let handle = WidgetHandle {
            id: Uuid::new_v4().to_string(),
            entry: Arc::new(Mutex::new(Entry {
                widget: Widget::new().with_auto_close(self.inner.auto_close),
                last_activity: Instant::now(),
            })),
        };
        self.inner
            .widgets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id.clone(), handle.clone());

        tracing::debug!(name: "widget.created", widget_id = %handle.id, "Widget created");
        handle
    }

    /// Get a widget by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<WidgetHandle> {
        self.inner
            .widgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Remove a widget by ID.
    pub fn remove(&self, id: &str) -> Option<WidgetHandle> {
        self.inner
            .widgets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Number of live widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .widgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no widgets are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop widgets idle longer than the configured timeout as of `now`.
    ///
    /// Returns the number removed.
    pub fn prune_idle(&self, now: Instant) -> usize {
        let timeout = self.inner.idle_timeout;
        let mut guard = self
            .inner
            .widgets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, handle| handle.idle_for(now) < timeout);
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_store() {
        let store = WidgetStore::default();
        assert!(store.is_empty());

        let handle = store.create();
        assert_eq!(store.len(), 1);

        let retrieved = store.get(handle.id()).unwrap();
        retrieved.with(Widget::toggle);
        assert!(handle.with(|w| w.is_open()));

        store.remove(handle.id());
        assert!(store.is_empty());
        assert!(store.get(handle.id()).is_none());
    }

    #[test]
    fn test_prune_idle() {
        let store = WidgetStore::new(Duration::from_secs(60), Duration::from_secs(5));
        let handle = store.create();

        assert_eq!(store.prune_idle(Instant::now()), 0);
        assert_eq!(store.prune_idle(Instant::now() + Duration::from_secs(61)), 1);
        assert!(store.get(handle.id()).is_none());
    }

    #[test]
    fn test_new_widgets_use_store_auto_close() {
        let store = WidgetStore::new(DEFAULT_IDLE_TIMEOUT, Duration::from_secs(2));
        let handle = store.create();
        let now = Instant::now();
        handle.with(|w| {
            w.on_auth(&crate::widget::AuthEvent::SignedIn { email: None }, now);
            assert_eq!(w.auto_close_at(), Some(now + Duration::from_secs(2)));
        });
    }
}
