// Callback interception seam
//
// A host framework routes every callback through a DispatchSlot. Adapters
// wrap the slot's current function with a tap and get back a RestoreHandle;
// teardown restores the exact previous function instead of re-deriving the
// patch. Restore is safe to call any number of times.

use std::sync::{Arc, Mutex, RwLock};

/// Framework-native callback as it crosses the dispatch slot
///
/// `kind` is the framework's own callback name (e.g. `on_chain_start`);
/// the adapter translates it into the canonical raw shape.
#[derive(Debug, Clone)]
pub struct HostCallback {
    pub kind: String,
    pub name: Option<String>,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl HostCallback {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// The callback dispatch function a host invokes
pub type DispatchFn = Arc<dyn Fn(&HostCallback) + Send + Sync>;

/// A host framework's callback dispatch point
///
/// The host invokes `dispatch` on its own threads for every callback.
/// Dispatch never blocks beyond two short lock acquisitions and never
/// panics into the host.
#[derive(Clone)]
pub struct DispatchSlot {
    current: Arc<RwLock<DispatchFn>>,
}

impl DispatchSlot {
    /// Create a slot around the host's own dispatch function
    pub fn new(dispatch: DispatchFn) -> Self {
        Self {
            current: Arc::new(RwLock::new(dispatch)),
        }
    }

    /// Create a slot with no host-side consumer
    pub fn noop() -> Self {
        Self::new(Arc::new(|_| {}))
    }

    /// Invoke the current dispatch function
    pub fn dispatch(&self, callback: &HostCallback) {
        let current = self
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        current(callback);
    }

    /// Wrap the current dispatch function with a tap
    ///
    /// The tap runs before the previous function and must be non-blocking.
    /// Returns a handle that restores the previous function exactly.
    pub fn wrap(&self, tap: impl Fn(&HostCallback) + Send + Sync + 'static) -> RestoreHandle {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = current.clone();
        let forward = previous.clone();
        *current = Arc::new(move |callback: &HostCallback| {
            tap(callback);
            forward(callback);
        });

        RestoreHandle {
            slot: self.current.clone(),
            previous: Mutex::new(Some(previous)),
        }
    }
}

/// Undo handle for one `wrap` call
///
/// `restore` reinstates the dispatch function that was current when the
/// wrap was installed. Calling it more than once is a no-op.
pub struct RestoreHandle {
    slot: Arc<RwLock<DispatchFn>>,
    previous: Mutex<Option<DispatchFn>>,
}

impl RestoreHandle {
    pub fn restore(&self) {
        let previous = self
            .previous
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(previous) = previous {
            *self.slot.write().unwrap_or_else(|e| e.into_inner()) = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_slot() -> (DispatchSlot, Arc<AtomicUsize>) {
        let host_calls = Arc::new(AtomicUsize::new(0));
        let counter = host_calls.clone();
        let slot = DispatchSlot::new(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (slot, host_calls)
    }

    #[test]
    fn test_wrap_taps_and_forwards() {
        let (slot, host_calls) = counting_slot();
        let tap_calls = Arc::new(AtomicUsize::new(0));
        let tap_counter = tap_calls.clone();

        let _handle = slot.wrap(move |_| {
            tap_counter.fetch_add(1, Ordering::SeqCst);
        });

        slot.dispatch(&HostCallback::new("on_chain_start"));
        assert_eq!(tap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(host_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restore_removes_tap() {
        let (slot, host_calls) = counting_slot();
        let tap_calls = Arc::new(AtomicUsize::new(0));
        let tap_counter = tap_calls.clone();

        let handle = slot.wrap(move |_| {
            tap_counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.restore();

        slot.dispatch(&HostCallback::new("on_chain_start"));
        assert_eq!(tap_calls.load(Ordering::SeqCst), 0);
        assert_eq!(host_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restore_twice_is_noop() {
        let (slot, host_calls) = counting_slot();
        let handle = slot.wrap(|_| {});

        handle.restore();
        handle.restore();

        slot.dispatch(&HostCallback::new("on_chain_start"));
        assert_eq!(host_calls.load(Ordering::SeqCst), 1);
    }
}
