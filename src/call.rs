//! Call records and their deferred results.
//!
//! A [`Call`] is one tracked request for a UI decision: a payload describing
//! what is being asked, a [`CallPromise`] the caller awaits, and a pending
//! flag that flips when the call settles. The [`CallHandle`] is the key every
//! engine operation uses to address a call.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::Shared;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::CallError;

/// Opaque key addressing one call inside a store.
///
/// Wraps the call's process-unique, monotonically increasing id. Handles are
/// cheap to copy and remain valid to pass to engine operations after the call
/// is gone; such operations degrade to no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallHandle(u64);

impl CallHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The underlying call id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

/// Maps the raw oneshot outcome into the promise-facing result.
///
/// A closed channel means the store (and with it the settler) was dropped
/// while the call was still pending.
pub(crate) struct SettleFuture<D, R> {
    rx: oneshot::Receiver<Result<D, R>>,
}

impl<D, R> Future for SettleFuture<D, R> {
    type Output = Result<D, CallError<R>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(Ok(data))) => Poll::Ready(Ok(data)),
            Poll::Ready(Ok(Err(reason))) => Poll::Ready(Err(CallError::Rejected(reason))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CallError::StoreClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The deferred result returned by [`CallStore::call`](crate::CallStore::call).
///
/// Settled exactly once, by [`resolve`](crate::CallStore::resolve) or
/// [`reject`](crate::CallStore::reject). The promise is `Clone`: every clone
/// shares the same underlying settlement, so repeated singleton invocations
/// can hand out the identical deferred result. Awaiting yields `Ok(data)`,
/// `Err(CallError::Rejected(reason))`, or `Err(CallError::StoreClosed)` when
/// the store is dropped first.
pub struct CallPromise<D, R> {
    handle: CallHandle,
    shared: Shared<SettleFuture<D, R>>,
}

impl<D, R> CallPromise<D, R>
where
    D: Clone,
    R: Clone,
{
    pub(crate) fn new(handle: CallHandle, rx: oneshot::Receiver<Result<D, R>>) -> Self {
        Self {
            handle,
            shared: SettleFuture { rx }.shared(),
        }
    }
}

impl<D, R> CallPromise<D, R> {
    /// The handle identifying this call in its store.
    pub fn handle(&self) -> CallHandle {
        self.handle
    }
}

impl<D, R> Clone for CallPromise<D, R> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            shared: self.shared.clone(),
        }
    }
}

impl<D, R> Future for CallPromise<D, R>
where
    D: Clone,
    R: Clone,
{
    type Output = Result<D, CallError<R>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.shared).poll(cx)
    }
}

impl<D, R> fmt::Debug for CallPromise<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPromise")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// One outstanding request for a UI decision.
///
/// Calls are immutable snapshots: the store replaces the whole record on
/// payload updates and on settlement, so an observer holding an older
/// snapshot never sees fields change underneath it. `id` is assigned at
/// creation from a per-store monotonic counter and never reused.
pub struct Call<P, D, R> {
    /// Process-unique, monotonically increasing id.
    pub id: u64,
    /// Application data describing what is being asked.
    pub payload: P,
    /// The deferred result awaited by the caller.
    pub promise: CallPromise<D, R>,
    /// True from creation until the call settles.
    pub pending: bool,
    /// Effective grace period before deletion, fixed at creation.
    pub(crate) unmounting_delay: Duration,
}

impl<P, D, R> Call<P, D, R> {
    /// The handle addressing this call in its store.
    pub fn handle(&self) -> CallHandle {
        self.promise.handle()
    }
}

impl<P: Clone, D, R> Clone for Call<P, D, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            payload: self.payload.clone(),
            promise: self.promise.clone(),
            pending: self.pending,
            unmounting_delay: self.unmounting_delay,
        }
    }
}

impl<P: fmt::Debug, D, R> fmt::Debug for Call<P, D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
