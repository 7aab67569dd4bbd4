//! The call engine: an ordered collection of in-flight calls.
//!
//! [`CallStore`] owns the authoritative state for every outstanding call:
//! the insertion-ordered stack, the settler for each call's deferred result,
//! and the deletion timers that implement the unmounting delay. Application
//! code creates calls and awaits their promises; UI code reads the stack and
//! settles calls; reactive adapters subscribe to the lifecycle events.
//!
//! Every operation runs to completion synchronously. State is mutated under
//! an internal lock, and events are dispatched after the lock is released,
//! so listeners may freely read the stack or call back into the store. The
//! only asynchronous edge is the unmounting-delay timer, which performs one
//! isolated deletion step when it fires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::call::{Call, CallHandle, CallPromise};
use crate::events::{CallEvent, EventKind, EventNotifier, Listener, ListenerId};

/// Store-wide configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStoreOptions {
    /// Grace period a settled call stays in the stack before deletion, so
    /// exit transitions can run against it. Zero means immediate removal.
    #[serde(default)]
    pub unmounting_delay: Duration,
}

/// Per-call overrides for [`CallStore::call_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Overrides the store's `unmounting_delay` for this call only.
    #[serde(default)]
    pub unmounting_delay: Option<Duration>,
}

struct State<P, D, R> {
    stack: Vec<Call<P, D, R>>,
    /// Settle function per outstanding call, consumed on first settlement.
    /// A call that is still in the stack but absent here has already
    /// settled; engine-level resolve/reject against it is a no-op.
    settlers: HashMap<CallHandle, oneshot::Sender<Result<D, R>>>,
    /// Deletion timers for calls inside their unmounting-delay window.
    timers: HashMap<CallHandle, JoinHandle<()>>,
    next_id: u64,
}

struct StoreInner<P, D, R> {
    state: Mutex<State<P, D, R>>,
    notifier: EventNotifier<P, D, R>,
    default_delay: Duration,
}

impl<P, D, R> StoreInner<P, D, R> {
    /// Terminal deletion step: cancel any pending timer, splice the call out
    /// of the stack, and announce `settled` with the pre-deletion snapshot.
    fn delete(&self, handle: CallHandle) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.timers.remove(&handle) {
                timer.abort();
            }
            let Some(position) = state.stack.iter().position(|c| c.handle() == handle) else {
                return;
            };
            state.stack.remove(position)
        };

        log::trace!("[CallStore] deleted {handle}");
        self.notifier.dispatch(&CallEvent {
            kind: EventKind::Settled,
            call: removed,
        });
    }
}

impl<P, D, R> Drop for StoreInner<P, D, R> {
    fn drop(&mut self) {
        // Outstanding timer tasks only hold a weak reference back here, but
        // there is no point letting them sleep out their delay.
        if let Ok(mut state) = self.state.lock() {
            for (_, timer) in state.timers.drain() {
                timer.abort();
            }
        }
    }
}

/// Ordered collection of in-flight calls awaiting a UI decision.
///
/// Cloning a `CallStore` produces another handle to the same store, so the
/// application side (creating and awaiting calls) and the UI side (reading
/// and settling them) can each hold one.
///
/// ```
/// # tokio_test::block_on(async {
/// use ui_call::CallStore;
///
/// let store: CallStore<&str, bool, ()> = CallStore::new();
/// let promise = store.call("confirm-delete");
///
/// // UI side: render the stack, then settle the call.
/// let call = &store.stack()[0];
/// store.resolve(call.handle(), true);
///
/// assert_eq!(promise.await, Ok(true));
/// # });
/// ```
pub struct CallStore<P, D, R> {
    inner: Arc<StoreInner<P, D, R>>,
}

impl<P, D, R> Clone for CallStore<P, D, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, D, R> CallStore<P, D, R>
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// A store with immediate deletion of settled calls.
    pub fn new() -> Self {
        Self::with_options(CallStoreOptions::default())
    }

    pub fn with_options(options: CallStoreOptions) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(State {
                    stack: Vec::new(),
                    settlers: HashMap::new(),
                    timers: HashMap::new(),
                    next_id: 0,
                }),
                notifier: EventNotifier::new(),
                default_delay: options.unmounting_delay,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Snapshot of the current stack, in insertion order.
    pub fn stack(&self) -> Vec<Call<P, D, R>> {
        self.inner.state.lock().unwrap().stack.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().unwrap().stack.is_empty()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a call with the store's default options. See [`call_with`].
    ///
    /// [`call_with`]: CallStore::call_with
    pub fn call(&self, payload: P) -> CallPromise<D, R> {
        self.call_with(payload, CallOptions::default())
    }

    /// Create a call: assign a fresh id, append it to the stack, dispatch
    /// `add`, and return the deferred result for the caller to await.
    pub fn call_with(&self, payload: P, options: CallOptions) -> CallPromise<D, R> {
        let delay = options.unmounting_delay.unwrap_or(self.inner.default_delay);
        let (tx, rx) = oneshot::channel();

        let added = {
            let mut state = self.inner.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;

            let handle = CallHandle::new(id);
            let call = Call {
                id,
                payload,
                promise: CallPromise::new(handle, rx),
                pending: true,
                unmounting_delay: delay,
            };
            state.settlers.insert(handle, tx);
            state.stack.push(call.clone());
            call
        };

        log::trace!("[CallStore] added {}", added.handle());
        let promise = added.promise.clone();
        self.inner.notifier.dispatch(&CallEvent {
            kind: EventKind::Add,
            call: added,
        });
        promise
    }

    /// Replace the payload of the call addressed by `handle`.
    ///
    /// The stack slot is replaced with a new record (same id, same promise),
    /// `update` is dispatched, and the unchanged promise is returned. An
    /// unknown handle returns `None` without touching the stack or
    /// dispatching anything.
    pub fn update(&self, handle: CallHandle, payload: P) -> Option<CallPromise<D, R>> {
        let updated = {
            let mut state = self.inner.state.lock().unwrap();
            let slot = state.stack.iter_mut().find(|c| c.handle() == handle)?;
            let mut next = slot.clone();
            next.payload = payload;
            *slot = next.clone();
            next
        };

        let promise = updated.promise.clone();
        self.inner.notifier.dispatch(&CallEvent {
            kind: EventKind::Update,
            call: updated,
        });
        Some(promise)
    }

    /// Settle the call addressed by `handle` with a success value.
    ///
    /// No-op for unknown handles and for calls that already settled (a call
    /// waiting out its unmounting delay is still in the stack, but its
    /// settler is spent).
    pub fn resolve(&self, handle: CallHandle, data: D) {
        self.settle(handle, Ok(data));
    }

    /// Settle the call addressed by `handle` with a failure reason.
    ///
    /// Same no-op rules as [`resolve`](CallStore::resolve). There is no
    /// separate cancellation API: cancelling a pending call is a reject with
    /// an application-chosen reason.
    pub fn reject(&self, handle: CallHandle, reason: R) {
        self.settle(handle, Err(reason));
    }

    fn settle(&self, handle: CallHandle, outcome: Result<D, R>) {
        let kind = if outcome.is_ok() {
            EventKind::Resolve
        } else {
            EventKind::Reject
        };

        let settled = {
            let mut state = self.inner.state.lock().unwrap();
            // Taking the settler out is the settle-once guard.
            let Some(tx) = state.settlers.remove(&handle) else {
                return;
            };
            let Some(position) = state.stack.iter().position(|c| c.handle() == handle) else {
                return;
            };

            // The caller may have dropped the promise already; the visible
            // lifecycle still runs for the benefit of the UI.
            let _ = tx.send(outcome);

            let mut next = state.stack[position].clone();
            next.pending = false;
            state.stack[position] = next.clone();
            next
        };

        log::trace!("[CallStore] settled {handle} ({kind})");
        let delay = settled.unmounting_delay;
        self.inner.notifier.dispatch(&CallEvent {
            kind,
            call: settled,
        });

        if delay.is_zero() {
            self.inner.delete(handle);
        } else {
            self.schedule_delete(handle, delay);
        }
    }

    /// Arrange for `handle` to be deleted after `delay`.
    ///
    /// Falls back to immediate deletion when no Tokio runtime is available:
    /// the engine's no-panic contract outranks the grace period.
    fn schedule_delete(&self, handle: CallHandle, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!(
                "[CallStore] no async runtime for the unmounting delay; deleting {handle} now"
            );
            self.inner.delete(handle);
            return;
        };

        let weak: Weak<StoreInner<P, D, R>> = Arc::downgrade(&self.inner);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.delete(handle);
            }
        });

        let mut state = self.inner.state.lock().unwrap();
        state.timers.insert(handle, timer);
    }

    // -----------------------------------------------------------------------
    // Listener pass-throughs
    // -----------------------------------------------------------------------

    pub fn add_listener(
        &self,
        kind: EventKind,
        listener: impl Fn(&CallEvent<P, D, R>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.notifier.add_listener(kind, listener)
    }

    pub fn add_shared_listener(&self, kind: EventKind, listener: Listener<P, D, R>) -> ListenerId {
        self.inner.notifier.add_shared_listener(kind, listener)
    }

    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) {
        self.inner.notifier.remove_listener(kind, id);
    }

    pub fn remove_listeners(&self, kind: EventKind) {
        self.inner.notifier.remove_listeners(kind);
    }
}

impl<P, D, R> Default for CallStore<P, D, R>
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
