//! Typed lifecycle events and the listener machinery around them.
//!
//! - [`EventKind`] / [`CallEvent`]: the closed set of five lifecycle events
//!   and the snapshot-carrying record dispatched for each.
//! - [`EventNotifier`]: per-kind listener registry with synchronous,
//!   registration-ordered dispatch.
//! - [`StoreSubscriber`] / [`subscribe_all`]: what reactive adapters build
//!   against.

pub mod event;
pub mod notifier;
pub mod subscriber;

pub use event::{CallEvent, EventKind};
pub use notifier::{EventNotifier, Listener, ListenerId};
pub use subscriber::{subscribe_all, unsubscribe, Registration, StoreSubscriber};
