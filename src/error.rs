//! Error types for awaited call promises.

use thiserror::Error;

/// Failure outcome of an awaited [`CallPromise`](crate::CallPromise).
///
/// Engine operations themselves never fail: looking up an unknown or
/// already-settled call is a silent no-op, since stale handles routinely
/// outlive their call (UI effect cleanups firing after unmount). The only
/// errors surface on the awaiting side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError<R> {
    /// The call was rejected; carries the application-chosen reason.
    #[error("call was rejected")]
    Rejected(R),

    /// The store was dropped before the call settled.
    #[error("call store was dropped before the call settled")]
    StoreClosed,
}

impl<R> CallError<R> {
    /// The rejection reason, if this is a [`CallError::Rejected`].
    pub fn reason(&self) -> Option<&R> {
        match self {
            CallError::Rejected(reason) => Some(reason),
            CallError::StoreClosed => None,
        }
    }
}
