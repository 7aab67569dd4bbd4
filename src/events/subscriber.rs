//! The capability boundary reactive adapters implement.
//!
//! A framework binding needs exactly three things from a store: a snapshot
//! read ([`CallStore::stack`](crate::CallStore::stack) or
//! [`SingletonCallStore::current`](crate::SingletonCallStore::current)), a
//! way to subscribe and unsubscribe, and the call's public fields. This
//! module provides the subscription half: a trait adapters implement plus
//! helpers for the common subscribe-to-everything pattern.

use std::sync::Arc;

use crate::events::event::{CallEvent, EventKind};
use crate::events::notifier::{Listener, ListenerId};
use crate::store::CallStore;

/// One registration made on a store: the kind it was made under and the id
/// needed to remove it.
pub type Registration = (EventKind, ListenerId);

/// Implemented by reactive adapters that mirror a store into a framework's
/// own change-notification primitive.
///
/// `setup_listeners` registers whatever callbacks the adapter needs and
/// returns the registrations so the adapter can tear them down (see
/// [`unsubscribe`]) when its host unmounts.
pub trait StoreSubscriber<P, D, R>: Send + Sync {
    fn setup_listeners(&self, store: &CallStore<P, D, R>) -> Vec<Registration>;
}

/// Register one callback under every [`EventKind`].
///
/// This is the shape reactive adapters use: any lifecycle event invalidates
/// the adapter's snapshot, which it then re-derives from `stack()` or
/// `current()`.
pub fn subscribe_all<P, D, R>(
    store: &CallStore<P, D, R>,
    listener: impl Fn(&CallEvent<P, D, R>) + Send + Sync + 'static,
) -> Vec<Registration>
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    let shared: Listener<P, D, R> = Arc::new(listener);
    EventKind::ALL
        .iter()
        .map(|&kind| (kind, store.add_shared_listener(kind, shared.clone())))
        .collect()
}

/// Remove a batch of registrations, typically the return value of
/// [`subscribe_all`] or [`StoreSubscriber::setup_listeners`].
pub fn unsubscribe<P, D, R>(store: &CallStore<P, D, R>, registrations: &[Registration])
where
    P: Clone + Send + 'static,
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    for &(kind, id) in registrations {
        store.remove_listener(kind, id);
    }
}
