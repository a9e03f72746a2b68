// The MIT License (MIT)

// Copyright (c) 2015 Y. T. Chung <zonyitoo@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE

//! Promises whose continuations run on a chosen thread context
//!
//! A `Promise<V>` is a handle to a value which may not have been computed yet.
//! It is populated exactly once, either directly (`supply`) or by a function
//! run on the main thread or the background executor (`supply_sync`,
//! `supply_async`, ...). Continuations (`then_apply_*`, `then_compose_*`,
//! `exceptionally_*`) produce new promises completed from the parent's
//! outcome.
//!
//! Every family of operations comes in four execution variants:
//!
//! * `_sync`: on the main thread, inline if the completing thread already is
//!   the main thread
//! * `_async`: always handed to the background executor
//! * `_delayed_sync` / `_delayed_async`: the same after a delay, given in
//!   ticks or as a `Duration`
//!
//! plus a form taking the `ThreadContext` as a parameter.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Failure, PromiseError};
use crate::report;
use crate::scheduler::Handle;

use self::cell::{CompletionCell, Outcome};

pub use self::external::{wait_on_thread, ExternalFuture};

mod cell;
mod chain;
mod dispatch;
mod external;
mod supply;

const ALREADY_SUPPLIED: &str = "Promise is already being supplied.";

struct Inner<V> {
    handle: Handle,
    cell: CompletionCell<V>,
    supplied: AtomicBool,
}

impl<V: Clone + Send + 'static> Inner<V> {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cell.is_cancelled()
    }

    /// Complete unless the promise was cancelled or already completed
    #[inline]
    fn complete(&self, outcome: Outcome<V>) -> bool {
        self.cell.complete(outcome)
    }

    /// Complete from the result of a user function, reporting failures
    fn settle(&self, result: Result<V, Failure>) {
        match result {
            Ok(value) => {
                self.complete(Outcome::Value(value));
            }
            Err(failure) => {
                report::promise(&failure);
                self.complete(Outcome::Failure(failure));
            }
        }
    }
}

/// A value which will become available later
pub struct Promise<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Promise<V> {
    fn clone(&self) -> Promise<V> {
        Promise { inner: self.inner.clone() }
    }
}

impl<V: Clone + Send + 'static> Promise<V> {
    fn with_cell(handle: &Handle, cell: CompletionCell<V>, supplied: bool) -> Promise<V> {
        Promise {
            inner: Arc::new(Inner {
                handle: handle.clone(),
                cell: cell,
                supplied: AtomicBool::new(supplied),
            }),
        }
    }

    /// A new promise, to be completed through one of the `supply` methods
    pub fn empty(handle: &Handle) -> Promise<V> {
        Promise::with_cell(handle, CompletionCell::new(), false)
    }

    /// A promise already completed with `value`
    pub fn completed(handle: &Handle, value: V) -> Promise<V> {
        Promise::with_cell(handle, CompletionCell::done(Outcome::Value(value)), true)
    }

    /// A promise already completed exceptionally with `failure`
    pub fn failed<E: Into<Failure>>(handle: &Handle, failure: E) -> Promise<V> {
        Promise::with_cell(handle, CompletionCell::done(Outcome::Failure(failure.into())), true)
    }

    /// An empty promise already marked as supplied, completed by the engine
    fn supplied(handle: &Handle) -> Promise<V> {
        Promise::with_cell(handle, CompletionCell::new(), true)
    }

    fn mark_as_supplied(&self) -> Result<(), PromiseError> {
        self.inner
            .supplied
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| PromiseError::IllegalState(ALREADY_SUPPLIED))
    }

    /// The scheduler continuations of this promise are dispatched to
    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Block until completed, returning the value or the failure.
    ///
    /// Calling this on the main thread while the promise waits for a sync
    /// continuation deadlocks; drive the host instead.
    pub fn join(&self) -> Result<V, PromiseError> {
        self.inner.cell.wait().into_result()
    }

    /// Block for at most `timeout`. A timeout leaves the promise untouched.
    pub fn get_timeout(&self, timeout: Duration) -> Result<V, PromiseError> {
        match self.inner.cell.wait_timeout(timeout) {
            Some(outcome) => outcome.into_result(),
            None => Err(PromiseError::Timeout(timeout)),
        }
    }

    /// The result if completed, `value_if_absent` otherwise
    pub fn get_now(&self, value_if_absent: V) -> Result<V, PromiseError> {
        match self.inner.cell.peek() {
            Some(outcome) => outcome.into_result(),
            None => Ok(value_if_absent),
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.inner.cell.is_done()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cell.is_cancelled()
    }

    /// Cancel the promise.
    ///
    /// No producer can complete it afterwards, and continuations that have
    /// not started running yet are skipped. Returns `false` if the promise had
    /// already completed normally.
    pub fn cancel(&self) -> bool {
        self.inner.complete(Outcome::Cancelled);
        self.is_cancelled()
    }

    /// Same as `cancel`
    #[inline]
    pub fn close(&self) -> bool {
        self.cancel()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.is_cancelled()
    }

    fn on_complete<F>(&self, listener: F)
        where F: FnOnce(Outcome<V>) + Send + 'static
    {
        self.inner.cell.on_complete(Box::new(listener))
    }
}

impl Promise<()> {
    /// A completed promise to build a chain on
    pub fn start(handle: &Handle) -> Promise<()> {
        Promise::completed(handle, ())
    }
}

impl<V: Clone + Send + 'static> fmt::Debug for Promise<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Promise")
         .field("supplied", &self.inner.supplied.load(Ordering::SeqCst))
         .field("done", &self.inner.cell.is_done())
         .finish()
    }
}

/// Run a user function, turning a panic into a failure
fn catch<T, F: FnOnce() -> T>(f: F) -> Result<T, Failure> {
    panic::catch_unwind(AssertUnwindSafe(|| cell::detached(f))).map_err(Failure::from_panic)
}

/// Scheduler running every task inline, with the calling thread as main.
///
/// Async and delayed tasks run on the calling thread too, without any delay;
/// tests using it cover completion and propagation, not thread hops.
#[cfg(test)]
pub(crate) fn test_handle() -> Handle {
    use std::thread::{self, ThreadId};

    use crate::context::ThreadContext;
    use crate::scheduler::{Delay, Scheduler, Task};

    struct Inline(ThreadId);

    impl Scheduler for Inline {
        fn main_thread(&self) -> ThreadId {
            self.0
        }

        fn schedule(&self, task: Task, _: ThreadContext, _: Delay) {
            task()
        }
    }

    Handle::new(Inline(thread::current().id()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn handle() -> Handle {
        test_handle()
    }

    #[test]
    fn test_completed_join() {
        let p = Promise::completed(&handle(), 5);
        assert!(p.is_done());
        assert_eq!(p.join().unwrap(), 5);
    }

    #[test]
    fn test_exceptionally_join() {
        let p: Promise<u8> = Promise::failed(&handle(), Failure::msg("boom"));
        match p.join() {
            Err(PromiseError::Completion(f)) => assert_eq!(f.to_string(), "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_get_now() {
        let p = Promise::empty(&handle());
        assert_eq!(p.get_now(3).unwrap(), 3);
        p.supply(4).unwrap();
        assert_eq!(p.get_now(3).unwrap(), 4);
    }

    #[test]
    fn test_get_timeout_on_pending() {
        let p: Promise<u8> = Promise::empty(&handle());
        match p.get_timeout(Duration::from_millis(10)) {
            Err(PromiseError::Timeout(d)) => assert_eq!(d, Duration::from_millis(10)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!p.is_done());
        assert!(!p.is_cancelled());
    }

    #[test]
    fn test_cancel_pending() {
        let p: Promise<u8> = Promise::empty(&handle());
        assert!(p.cancel());
        assert!(p.is_cancelled());
        assert!(p.is_closed());
        assert!(matches!(p.join(), Err(PromiseError::Cancelled)));
    }

    #[test]
    fn test_cancel_completed_returns_false() {
        let p = Promise::completed(&handle(), 1);
        assert!(!p.cancel());
        assert_eq!(p.join().unwrap(), 1);
    }

    #[test]
    fn test_start() {
        assert!(Promise::start(&handle()).join().is_ok());
    }
}
