//! At-most-one-call semantics on top of a [`CallStore`].
//!
//! "Singleton" refers to the call, not the store: a `SingletonCallStore` is
//! an ordinary owned value, it just guarantees that repeated invocations
//! before settlement fold into one live call sharing one deferred result.
//! The typical use is a modal that can only be shown once at a time.

use crate::call::{Call, CallPromise};
use crate::events::{CallEvent, EventKind, ListenerId};
use crate::store::{CallOptions, CallStore, CallStoreOptions};

/// Wraps a [`CallStore`] so at most one call is live at a time.
///
/// While a call is pending, further `call` invocations replace its payload
/// and return the same shared promise; the most recent payload wins. Once
/// the call settles (and its unmounting delay elapses), `current` is `None`
/// and the next `call` starts a fresh cycle with a new promise.
pub struct SingletonCallStore<P, D, R> {
    store: CallStore<P, D, R>,
}

impl<P, D, R> SingletonCallStore<P, D, R>
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            store: CallStore::new(),
        }
    }

    pub fn with_options(options: CallStoreOptions) -> Self {
        Self {
            store: CallStore::with_options(options),
        }
    }

    /// The live call, or `None` if there is none.
    pub fn current(&self) -> Option<Call<P, D, R>> {
        self.store.stack().pop()
    }

    /// See [`call_with`](SingletonCallStore::call_with).
    pub fn call(&self, payload: P) -> CallPromise<D, R> {
        self.call_with(payload, CallOptions::default())
    }

    /// Start a call, or fold into the live one.
    ///
    /// With no live call this delegates to the engine and returns a fresh
    /// promise. Otherwise the invocation becomes a payload update and the
    /// existing promise is returned, so every concurrent caller awaits the
    /// same settlement. `options` only take effect when a call is actually
    /// created.
    pub fn call_with(&self, payload: P, options: CallOptions) -> CallPromise<D, R> {
        if let Some(current) = self.current() {
            let _ = self.store.update(current.handle(), payload);
            return current.promise;
        }

        self.store.call_with(payload, options)
    }

    /// Replace the live call's payload. `None` if there is no live call.
    pub fn update(&self, payload: P) -> Option<CallPromise<D, R>> {
        let current = self.current()?;
        self.store.update(current.handle(), payload)
    }

    /// Resolve the live call. No-op if there is none.
    pub fn resolve(&self, data: D) {
        if let Some(current) = self.current() {
            self.store.resolve(current.handle(), data);
        }
    }

    /// Reject the live call. No-op if there is none.
    pub fn reject(&self, reason: R) {
        if let Some(current) = self.current() {
            self.store.reject(current.handle(), reason);
        }
    }

    // Listener registration passes straight through to the inner store.

    pub fn add_listener(
        &self,
        kind: EventKind,
        listener: impl Fn(&CallEvent<P, D, R>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.store.add_listener(kind, listener)
    }

    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) {
        self.store.remove_listener(kind, id);
    }

    pub fn remove_listeners(&self, kind: EventKind) {
        self.store.remove_listeners(kind);
    }
}

impl<P, D, R> Default for SingletonCallStore<P, D, R>
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type TestStore = SingletonCallStore<String, String, String>;

    #[test]
    fn test_new_store_has_no_current_call() {
        let store = TestStore::new();
        assert!(store.current().is_none());
    }

    #[test]
    fn test_first_call_becomes_current() {
        let store = TestStore::new();
        let promise = store.call("first".to_string());

        let current = store.current().expect("call is live");
        assert_eq!(current.handle(), promise.handle());
        assert_eq!(current.payload, "first");
        assert!(current.pending);
    }

    #[test]
    fn test_repeat_calls_share_one_promise_and_keep_newest_payload() {
        let store = TestStore::new();
        let first = store.call("first".to_string());
        let second = store.call("second".to_string());
        let third = store.call("third".to_string());

        assert_eq!(first.handle(), second.handle());
        assert_eq!(second.handle(), third.handle());

        let current = store.current().expect("call is live");
        assert_eq!(current.handle(), first.handle());
        assert_eq!(current.payload, "third");
    }

    #[test]
    fn test_repeat_call_dispatches_update_not_add() {
        let store = TestStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::Add, EventKind::Update] {
            let seen = seen.clone();
            store.add_listener(kind, move |event| {
                seen.lock().unwrap().push(event.kind);
            });
        }

        store.call("first".to_string());
        store.call("second".to_string());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::Add, EventKind::Update]
        );
    }

    #[test]
    fn test_update_replaces_current_payload() {
        let store = TestStore::new();
        let promise = store.call("initial".to_string());

        let returned = store.update("updated".to_string());

        assert_eq!(returned.map(|p| p.handle()), Some(promise.handle()));
        assert_eq!(store.current().expect("call is live").payload, "updated");
    }

    #[test]
    fn test_update_without_current_call_is_noop() {
        let store = TestStore::new();

        assert!(store.update("payload".to_string()).is_none());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_resolve_settles_and_clears_current() {
        let store = TestStore::new();
        let promise = store.call("payload".to_string());

        store.resolve("data".to_string());

        assert_eq!(promise.await, Ok("data".to_string()));
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_reject_settles_and_clears_current() {
        let store = TestStore::new();
        let promise = store.call("payload".to_string());

        store.reject("reason".to_string());

        assert_eq!(promise.await, Err(CallError::Rejected("reason".to_string())));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_settling_without_current_call_is_noop() {
        let store = TestStore::new();
        store.resolve("data".to_string());
        store.reject("reason".to_string());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_next_cycle_gets_a_fresh_promise() {
        let store = TestStore::new();
        let first = store.call("first".to_string());
        store.resolve("data".to_string());
        assert_eq!(first.handle().id(), 0);

        let second = store.call("second".to_string());

        assert_ne!(first.handle(), second.handle());
        assert_eq!(store.current().expect("call is live").payload, "second");
    }

    #[tokio::test]
    async fn test_all_shared_promises_observe_the_settlement() {
        let store = TestStore::new();
        let first = store.call("first".to_string());
        let second = store.call("second".to_string());

        store.resolve("data".to_string());

        assert_eq!(first.await, Ok("data".to_string()));
        assert_eq!(second.await, Ok("data".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_clears_only_after_unmounting_delay() {
        let store = TestStore::with_options(CallStoreOptions {
            unmounting_delay: Duration::from_millis(50),
        });
        store.call("payload".to_string());
        store.resolve("data".to_string());

        let lingering = store.current().expect("still in its delay window");
        assert!(!lingering.pending);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.current().is_none());
    }
}
