//! Listener registry and synchronous dispatch.
//!
//! Decouples call-state mutations from observers. Listeners register under a
//! single [`EventKind`] and are invoked in registration order, synchronously,
//! on the dispatching thread. The registry lock is released before listeners
//! run, so a listener may re-enter the notifier (or the store that owns it);
//! registrations changed mid-dispatch take effect from the next dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::event::{CallEvent, EventKind};

/// A registered event callback.
pub type Listener<P, D, R> = Arc<dyn Fn(&CallEvent<P, D, R>) + Send + Sync>;

static LISTENER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one listener registration for later removal.
///
/// Closures have no stable identity, so removal is id-based. Each
/// registration gets a distinct id, which also means one callback can never
/// fire twice for a single dispatch: there is no way to register "the same"
/// listener twice under one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct ListenerEntry<P, D, R> {
    id: ListenerId,
    listener: Listener<P, D, R>,
}

/// Publish/subscribe registry keyed by [`EventKind`].
pub struct EventNotifier<P, D, R> {
    listeners: Mutex<HashMap<EventKind, Vec<ListenerEntry<P, D, R>>>>,
}

impl<P, D, R> EventNotifier<P, D, R> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Register `listener` for `kind`. Returns the id to remove it with.
    pub fn add_listener(
        &self,
        kind: EventKind,
        listener: impl Fn(&CallEvent<P, D, R>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.add_shared_listener(kind, Arc::new(listener))
    }

    /// Register an already-shared listener for `kind`.
    ///
    /// Lets one callback be registered under several kinds without
    /// duplicating it (the subscribe-to-everything pattern of reactive
    /// adapters).
    pub fn add_shared_listener(&self, kind: EventKind, listener: Listener<P, D, R>) -> ListenerId {
        let id = ListenerId::next();
        let mut map = self.listeners.lock().unwrap();
        map.entry(kind)
            .or_default()
            .push(ListenerEntry { id, listener });
        id
    }

    /// Remove the registration `id` made under `kind`. Unknown ids and kinds
    /// are silent no-ops.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) {
        let mut map = self.listeners.lock().unwrap();
        if let Some(entries) = map.get_mut(&kind) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                map.remove(&kind);
            }
        }
    }

    /// Remove every listener registered for `kind`.
    pub fn remove_listeners(&self, kind: EventKind) {
        let mut map = self.listeners.lock().unwrap();
        map.remove(&kind);
    }

    /// Clear every registration.
    pub fn remove_all(&self) {
        let mut map = self.listeners.lock().unwrap();
        map.clear();
    }

    /// Synchronously invoke, in registration order, every listener
    /// registered for the event's kind. No listeners is a no-op. Panics from
    /// listeners are not caught: a panicking listener aborts delivery to
    /// listeners registered after it.
    pub fn dispatch(&self, event: &CallEvent<P, D, R>) {
        let snapshot: Vec<Listener<P, D, R>> = {
            let map = self.listeners.lock().unwrap();
            match map.get(&event.kind) {
                Some(entries) => entries.iter().map(|e| e.listener.clone()).collect(),
                None => return,
            }
        };

        for listener in snapshot {
            listener(event);
        }
    }
}

impl<P, D, R> Default for EventNotifier<P, D, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{Call, CallHandle, CallPromise};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    type TestNotifier = EventNotifier<String, (), ()>;

    fn make_event(kind: EventKind) -> CallEvent<String, (), ()> {
        let (_tx, rx) = tokio::sync::oneshot::channel();
        let promise = CallPromise::new(CallHandle::new(1), rx);
        CallEvent {
            kind,
            call: Call {
                id: 1,
                payload: "payload".to_string(),
                promise,
                pending: true,
                unmounting_delay: Duration::ZERO,
            },
        }
    }

    fn counting_listener(
        notifier: &TestNotifier,
        kind: EventKind,
    ) -> (ListenerId, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_in = count.clone();
        let id = notifier.add_listener(kind, move |_| {
            count_in.fetch_add(1, Ordering::SeqCst);
        });
        (id, count)
    }

    #[test]
    fn test_dispatch_invokes_registered_listener() {
        let notifier = TestNotifier::new();
        let (_, count) = counting_listener(&notifier, EventKind::Add);

        notifier.dispatch(&make_event(EventKind::Add));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_only_matching_kind() {
        let notifier = TestNotifier::new();
        let (_, count) = counting_listener(&notifier, EventKind::Add);

        notifier.dispatch(&make_event(EventKind::Resolve));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_without_listeners_is_noop() {
        let notifier = TestNotifier::new();
        notifier.dispatch(&make_event(EventKind::Update));
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let notifier = TestNotifier::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            notifier.add_listener(EventKind::Add, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        notifier.dispatch(&make_event(EventKind::Add));

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_specific_listener() {
        let notifier = TestNotifier::new();
        let (id1, count1) = counting_listener(&notifier, EventKind::Add);
        let (_, count2) = counting_listener(&notifier, EventKind::Add);

        notifier.remove_listener(EventKind::Add, id1);
        notifier.dispatch(&make_event(EventKind::Add));

        assert_eq!(count1.load(Ordering::SeqCst), 0);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_all_listeners_for_kind() {
        let notifier = TestNotifier::new();
        let (_, count1) = counting_listener(&notifier, EventKind::Add);
        let (_, count2) = counting_listener(&notifier, EventKind::Add);
        let (_, other) = counting_listener(&notifier, EventKind::Resolve);

        notifier.remove_listeners(EventKind::Add);
        notifier.dispatch(&make_event(EventKind::Add));
        notifier.dispatch(&make_event(EventKind::Resolve));

        assert_eq!(count1.load(Ordering::SeqCst), 0);
        assert_eq!(count2.load(Ordering::SeqCst), 0);
        assert_eq!(other.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_unknown_listener_is_noop() {
        let notifier = TestNotifier::new();
        let (id, count) = counting_listener(&notifier, EventKind::Add);

        // Wrong kind, then a stale id: neither may disturb the registration.
        notifier.remove_listener(EventKind::Settled, id);
        notifier.remove_listeners(EventKind::Reject);
        notifier.dispatch(&make_event(EventKind::Add));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_all_clears_every_kind() {
        let notifier = TestNotifier::new();
        let (_, add_count) = counting_listener(&notifier, EventKind::Add);
        let (_, settle_count) = counting_listener(&notifier, EventKind::Settled);

        notifier.remove_all();
        notifier.dispatch(&make_event(EventKind::Add));
        notifier.dispatch(&make_event(EventKind::Settled));

        assert_eq!(add_count.load(Ordering::SeqCst), 0);
        assert_eq!(settle_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_added_during_dispatch_fires_next_time() {
        let notifier = Arc::new(TestNotifier::new());
        let late_count = Arc::new(AtomicUsize::new(0));

        let notifier_in = notifier.clone();
        let late_in = late_count.clone();
        notifier.add_listener(EventKind::Add, move |_| {
            let late = late_in.clone();
            notifier_in.add_listener(EventKind::Add, move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        notifier.dispatch(&make_event(EventKind::Add));
        assert_eq!(late_count.load(Ordering::SeqCst), 0);

        notifier.dispatch(&make_event(EventKind::Add));
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }
}
