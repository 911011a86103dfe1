//! Event listener registry with scoped registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

/// A realtime event callback. Runs on the channel's background task.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Registry {
    table: RwLock<HashMap<String, Vec<(u64, Callback)>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, event: &str, id: u64) -> bool {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = table.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            table.remove(event);
        }
        removed
    }
}

/// Named-event listener table shared between a channel and its I/O task.
#[derive(Clone, Default)]
pub struct Listeners {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.registry.table.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<&str, usize> =
            table.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("Listeners").field("events", &counts).finish()
    }
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`. The listener lives as long as the
    /// returned guard.
    pub fn add(&self, event: &str, callback: Callback) -> ListenerGuard {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        ListenerGuard {
            registry: Arc::downgrade(&self.registry),
            event: event.to_string(),
            id,
        }
    }

    /// Remove every listener for `event`; returns how many were removed.
    pub fn remove_all(&self, event: &str) -> usize {
        self.registry
            .table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(event)
            .map_or(0, |entries| entries.len())
    }

    /// Invoke every listener for `event`; returns how many ran.
    ///
    /// Callbacks are collected before any runs, so a callback may register or
    /// drop listeners without deadlocking. A listener removed while a dispatch
    /// is in progress may still run once for that event.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let callbacks: Vec<Callback> = {
            let table = self.registry.table.read().unwrap_or_else(|e| e.into_inner());
            match table.get(event) {
                Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return 0,
            }
        };
        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    pub fn count(&self, event: &str) -> usize {
        self.registry
            .table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(event)
            .map_or(0, Vec::len)
    }
}

/// Keeps one listener registered. Dropping it (or calling
/// [`dispose`](Self::dispose)) removes the listener.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard {
    registry: Weak<Registry>,
    event: String,
    id: u64,
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

impl ListenerGuard {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the listener now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.event, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let cb: Callback = Arc::new(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, cb)
    }

    #[test]
    fn test_dispatch_reaches_listener() {
        let listeners = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _guard = listeners.add(
            "new_waiter_call",
            Arc::new(move |v| seen_clone.lock().unwrap().push(v.clone())),
        );

        assert_eq!(listeners.dispatch("new_waiter_call", &json!({"callId": "A"})), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!({"callId": "A"})]);
    }

    #[test]
    fn test_dropping_guard_removes_listener() {
        let listeners = Listeners::new();
        let (hits, cb) = counter();
        let guard = listeners.add("evt", cb);
        assert_eq!(listeners.count("evt"), 1);

        drop(guard);
        assert_eq!(listeners.count("evt"), 0);
        assert_eq!(listeners.dispatch("evt", &json!(null)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispose_only_removes_own_listener() {
        let listeners = Listeners::new();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();
        let first_guard = listeners.add("evt", first);
        let _second_guard = listeners.add("evt", second);

        first_guard.dispose();
        listeners.dispatch("evt", &json!(1));
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_all_then_guard_drop_is_noop() {
        let listeners = Listeners::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let guard_a = listeners.add("evt", a);
        let _guard_b = listeners.add("evt", b);

        assert_eq!(listeners.remove_all("evt"), 2);
        drop(guard_a);
        assert_eq!(listeners.count("evt"), 0);
        assert_eq!(listeners.remove_all("evt"), 0);
    }

    #[test]
    fn test_guard_outliving_registry() {
        let listeners = Listeners::new();
        let (_, cb) = counter();
        let guard = listeners.add("evt", cb);
        drop(listeners);
        drop(guard);
    }

    #[test]
    fn test_callback_may_drop_listeners() {
        let listeners = Listeners::new();
        let slot: Arc<Mutex<Option<ListenerGuard>>> = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let guard = listeners.add(
            "once",
            Arc::new(move |_| {
                slot_clone.lock().unwrap().take();
            }),
        );
        *slot.lock().unwrap() = Some(guard);

        assert_eq!(listeners.dispatch("once", &json!(null)), 1);
        assert_eq!(listeners.count("once"), 0);
    }
}
