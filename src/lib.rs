//! # ui-call
//!
//! Framework-agnostic tracking of UI calls awaiting a decision.
//!
//! Application code asks the UI a question with [`CallStore::call`] and
//! awaits the returned [`CallPromise`]; the UI renders a live view of the
//! outstanding [`Call`]s from [`CallStore::stack`] and eventually settles
//! each one with [`CallStore::resolve`] or [`CallStore::reject`]. Reactive
//! framework bindings subscribe to the five lifecycle [`EventKind`]s and
//! re-derive their snapshot on every [`CallEvent`].
//!
//! [`SingletonCallStore`] collapses the collection to at most one live call
//! (a modal, a confirmation dialog): repeated invocations before settlement
//! fold into the existing call and share its promise.
//!
//! A settled call can linger in the stack for a configurable unmounting
//! delay ([`CallStoreOptions::unmounting_delay`]) so exit animations can run
//! against it before it disappears. Delayed deletion uses Tokio timers and
//! needs an ambient runtime; everything else is synchronous.

pub mod call;
pub mod error;
pub mod events;
pub mod singleton;
pub mod store;

pub use call::{Call, CallHandle, CallPromise};
pub use error::CallError;
pub use events::{
    subscribe_all, unsubscribe, CallEvent, EventKind, EventNotifier, Listener, ListenerId,
    Registration, StoreSubscriber,
};
pub use singleton::SingletonCallStore;
pub use store::{CallOptions, CallStore, CallStoreOptions};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
