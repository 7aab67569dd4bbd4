//! Event kinds and the record dispatched to listeners.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::call::Call;

/// The closed set of lifecycle events a store emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A call was created and appended to the stack.
    Add,
    /// A call's payload was replaced.
    Update,
    /// A call's deferred result was resolved.
    Resolve,
    /// A call's deferred result was rejected.
    Reject,
    /// A call was deleted from the stack after settling.
    Settled,
}

impl EventKind {
    /// Every kind, in lifecycle order. Reactive adapters that re-derive
    /// their snapshot on any change subscribe one listener to all of these.
    pub const ALL: [EventKind; 5] = [
        EventKind::Add,
        EventKind::Update,
        EventKind::Resolve,
        EventKind::Reject,
        EventKind::Settled,
    ];

    /// The kind's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::Update => "update",
            EventKind::Resolve => "resolve",
            EventKind::Reject => "reject",
            EventKind::Settled => "settled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event: the kind tag plus a full snapshot of the call as it
/// was at dispatch time.
pub struct CallEvent<P, D, R> {
    pub kind: EventKind,
    pub call: Call<P, D, R>,
}

impl<P: Clone, D, R> Clone for CallEvent<P, D, R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            call: self.call.clone(),
        }
    }
}

impl<P: fmt::Debug, D, R> fmt::Debug for CallEvent<P, D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallEvent")
            .field("kind", &self.kind)
            .field("call", &self.call)
            .finish()
    }
}
