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

//! Continuations: transform, compose and recover

use crate::context::ThreadContext;
use crate::error::Failure;
use crate::scheduler::Delay;

use super::cell::Outcome;
use super::dispatch::Execution;
use super::{catch, Promise};

impl<V: Clone + Send + 'static> Promise<V> {
    /// A child promise, never supplied from outside
    fn child<U: Clone + Send + 'static>(&self) -> Promise<U> {
        Promise::supplied(&self.inner.handle)
    }

    fn then_apply_with<U, F>(&self, exec: Execution, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static
    {
        let child = self.child();
        let target = child.clone();
        let parent = self.inner.clone();

        self.on_complete(move |outcome| match outcome {
            Outcome::Value(value) => {
                let handle = parent.handle.clone();
                exec.dispatch(&handle, Box::new(move || {
                    if parent.is_cancelled() || target.is_cancelled() {
                        return;
                    }
                    target.inner.settle(catch(move || f(value)));
                }));
            }
            Outcome::Failure(failure) => {
                target.inner.complete(Outcome::Failure(failure));
            }
            Outcome::Cancelled => {
                target.inner.complete(Outcome::Cancelled);
            }
        });

        child
    }

    fn then_compose_with<U, F>(&self, exec: Execution, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static
    {
        let child = self.child();
        let target = child.clone();
        let parent = self.inner.clone();
        let context = exec.context();

        self.on_complete(move |outcome| match outcome {
            Outcome::Value(value) => {
                let handle = parent.handle.clone();
                exec.dispatch(&handle, Box::new(move || {
                    if parent.is_cancelled() || target.is_cancelled() {
                        return;
                    }
                    match catch(move || f(value)) {
                        Ok(composed) => composed.forward_to(context, target),
                        Err(failure) => target.inner.settle(Err(failure)),
                    }
                }));
            }
            Outcome::Failure(failure) => {
                target.inner.complete(Outcome::Failure(failure));
            }
            Outcome::Cancelled => {
                target.inner.complete(Outcome::Cancelled);
            }
        });

        child
    }

    /// Complete `target` with this promise's outcome. Values are handed over
    /// on `context`; failures are passed straight through.
    fn forward_to(&self, context: ThreadContext, target: Promise<V>) {
        let on_value = target.clone();
        self.then_accept(context, move |value| {
            on_value.inner.complete(Outcome::Value(value));
        });

        self.on_complete(move |outcome| match outcome {
            Outcome::Value(..) => {}
            Outcome::Failure(failure) => {
                target.inner.complete(Outcome::Failure(failure));
            }
            Outcome::Cancelled => {
                target.inner.complete(Outcome::Cancelled);
            }
        });
    }

    fn exceptionally_with<F>(&self, exec: Execution, f: F) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static
    {
        let child = self.child();
        let target = child.clone();
        let parent = self.inner.clone();

        self.on_complete(move |outcome| match outcome {
            Outcome::Value(value) => {
                target.inner.complete(Outcome::Value(value));
            }
            Outcome::Failure(failure) => {
                let handle = parent.handle.clone();
                exec.dispatch(&handle, Box::new(move || {
                    if parent.is_cancelled() || target.is_cancelled() {
                        return;
                    }
                    target.inner.settle(catch(move || f(failure)));
                }));
            }
            // A cancelled chain stops here
            Outcome::Cancelled => {}
        });

        child
    }

    /// Transform the value on `context` once this promise completes.
    ///
    /// If this promise fails, `f` is never called and the failure is passed on
    /// to the returned promise. A panic in `f` is reported and completes the
    /// returned promise exceptionally.
    pub fn then_apply<U, F>(&self, context: ThreadContext, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static
    {
        self.then_apply_with(Execution::immediate(context), f)
    }

    pub fn then_apply_sync<U, F>(&self, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static
    {
        self.then_apply_with(Execution::Sync, f)
    }

    pub fn then_apply_async<U, F>(&self, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static
    {
        self.then_apply_with(Execution::Async, f)
    }

    pub fn then_apply_delayed<U, F, D>(&self, context: ThreadContext, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn then_apply_delayed_sync<U, F, D>(&self, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn then_apply_delayed_async<U, F, D>(&self, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> U + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedAsync(delay.into()), f)
    }

    /// Consume the value on `context` once this promise completes
    pub fn then_accept<F>(&self, context: ThreadContext, f: F) -> Promise<()>
        where F: FnOnce(V) + Send + 'static
    {
        self.then_apply_with(Execution::immediate(context), f)
    }

    pub fn then_accept_sync<F>(&self, f: F) -> Promise<()>
        where F: FnOnce(V) + Send + 'static
    {
        self.then_apply_with(Execution::Sync, f)
    }

    pub fn then_accept_async<F>(&self, f: F) -> Promise<()>
        where F: FnOnce(V) + Send + 'static
    {
        self.then_apply_with(Execution::Async, f)
    }

    pub fn then_accept_delayed<F, D>(&self, context: ThreadContext, f: F, delay: D) -> Promise<()>
        where F: FnOnce(V) + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn then_accept_delayed_sync<F, D>(&self, f: F, delay: D) -> Promise<()>
        where F: FnOnce(V) + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn then_accept_delayed_async<F, D>(&self, f: F, delay: D) -> Promise<()>
        where F: FnOnce(V) + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedAsync(delay.into()), f)
    }

    /// Run `f` on `context` once this promise completes, ignoring the value
    pub fn then_run<F>(&self, context: ThreadContext, f: F) -> Promise<()>
        where F: FnOnce() + Send + 'static
    {
        self.then_apply_with(Execution::immediate(context), move |_| f())
    }

    pub fn then_run_sync<F>(&self, f: F) -> Promise<()>
        where F: FnOnce() + Send + 'static
    {
        self.then_apply_with(Execution::Sync, move |_| f())
    }

    pub fn then_run_async<F>(&self, f: F) -> Promise<()>
        where F: FnOnce() + Send + 'static
    {
        self.then_apply_with(Execution::Async, move |_| f())
    }

    pub fn then_run_delayed<F, D>(&self, context: ThreadContext, f: F, delay: D) -> Promise<()>
        where F: FnOnce() + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::delayed(context, delay.into()), move |_| f())
    }

    pub fn then_run_delayed_sync<F, D>(&self, f: F, delay: D) -> Promise<()>
        where F: FnOnce() + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedSync(delay.into()), move |_| f())
    }

    pub fn then_run_delayed_async<F, D>(&self, f: F, delay: D) -> Promise<()>
        where F: FnOnce() + Send + 'static,
              D: Into<Delay>
    {
        self.then_apply_with(Execution::DelayedAsync(delay.into()), move |_| f())
    }

    /// Chain to the promise returned by `f`, run on `context`.
    ///
    /// The returned promise completes with the outcome of the composed one;
    /// its value is handed over on the same thread context.
    pub fn then_compose<U, F>(&self, context: ThreadContext, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static
    {
        self.then_compose_with(Execution::immediate(context), f)
    }

    pub fn then_compose_sync<U, F>(&self, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static
    {
        self.then_compose_with(Execution::Sync, f)
    }

    pub fn then_compose_async<U, F>(&self, f: F) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static
    {
        self.then_compose_with(Execution::Async, f)
    }

    pub fn then_compose_delayed<U, F, D>(&self, context: ThreadContext, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static,
              D: Into<Delay>
    {
        self.then_compose_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn then_compose_delayed_sync<U, F, D>(&self, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static,
              D: Into<Delay>
    {
        self.then_compose_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn then_compose_delayed_async<U, F, D>(&self, f: F, delay: D) -> Promise<U>
        where U: Clone + Send + 'static,
              F: FnOnce(V) -> Promise<U> + Send + 'static,
              D: Into<Delay>
    {
        self.then_compose_with(Execution::DelayedAsync(delay.into()), f)
    }

    /// Recover from a failure by computing a fallback value on `context`.
    ///
    /// Has no effect if this promise completes normally: the value is passed
    /// on as is.
    pub fn exceptionally<F>(&self, context: ThreadContext, f: F) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static
    {
        self.exceptionally_with(Execution::immediate(context), f)
    }

    pub fn exceptionally_sync<F>(&self, f: F) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static
    {
        self.exceptionally_with(Execution::Sync, f)
    }

    pub fn exceptionally_async<F>(&self, f: F) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static
    {
        self.exceptionally_with(Execution::Async, f)
    }

    pub fn exceptionally_delayed<F, D>(&self, context: ThreadContext, f: F, delay: D) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static,
              D: Into<Delay>
    {
        self.exceptionally_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn exceptionally_delayed_sync<F, D>(&self, f: F, delay: D) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static,
              D: Into<Delay>
    {
        self.exceptionally_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn exceptionally_delayed_async<F, D>(&self, f: F, delay: D) -> Promise<V>
        where F: FnOnce(Failure) -> V + Send + 'static,
              D: Into<Delay>
    {
        self.exceptionally_with(Execution::DelayedAsync(delay.into()), f)
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::context::ThreadContext;
    use crate::error::{Failure, Panicked, PromiseError};
    use crate::promise::{test_handle as handle, Promise};

    fn boom() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "boom")
    }

    #[test]
    fn test_then_apply_sync() {
        let p = Promise::completed(&handle(), 5);
        let q = p.then_apply_sync(|x| x * 2);
        assert_eq!(q.join().unwrap(), 10);
    }

    #[test]
    fn test_then_apply_is_associative() {
        let p = Promise::completed(&handle(), 3);
        let chained = p.then_apply_sync(|x| x + 1).then_apply_sync(|x| x * 10);
        let fused = p.then_apply_sync(|x| (x + 1) * 10);
        assert_eq!(chained.join().unwrap(), fused.join().unwrap());
    }

    #[test]
    fn test_failure_skips_then_apply() {
        let p: Promise<u32> = Promise::failed(&handle(), boom());
        let called = Arc::new(AtomicBool::new(false));

        let flag = called.clone();
        let q = p.then_apply(ThreadContext::Sync, move |x| {
            flag.store(true, Ordering::SeqCst);
            x + 1
        });

        let err = q.join().unwrap_err();
        assert!(err.failure().unwrap().is::<io::Error>());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_exceptionally_recovers() {
        let p: Promise<String> = Promise::empty(&handle());
        p.supply_exception(boom()).unwrap();

        let q = p.exceptionally_sync(|f| format!("recovered:{}", f));
        assert_eq!(q.join().unwrap(), "recovered:boom");
    }

    #[test]
    fn test_exceptionally_passes_value_through() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        let q = Promise::completed(&handle(), 7).exceptionally_async(move |_| {
            flag.store(true, Ordering::SeqCst);
            0
        });

        assert_eq!(q.join().unwrap(), 7);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panic_in_continuation_fails_child() {
        let q = Promise::completed(&handle(), 1).then_apply_sync(|_: u32| -> u32 { panic!("bad transform") });
        let err = q.join().unwrap_err();
        assert_eq!(err.failure().unwrap().downcast_ref::<Panicked>(),
                   Some(&Panicked("bad transform".to_owned())));

        let recovered = q.exceptionally_sync(|_| 42);
        assert_eq!(recovered.join().unwrap(), 42);
    }

    #[test]
    fn test_then_accept_and_then_run_inline() {
        let seen = Arc::new(AtomicUsize::new(0));

        let acc = seen.clone();
        let p = Promise::completed(&handle(), 4);
        p.then_accept_sync(move |x| {
            acc.fetch_add(x, Ordering::SeqCst);
        }).join().unwrap();

        let run = seen.clone();
        p.then_run_async(move || {
            run.fetch_add(100, Ordering::SeqCst);
        }).join().unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 104);
    }

    #[test]
    fn test_deep_chain_on_empty_root() {
        let root = Promise::empty(&handle());
        let mut tail = root.then_apply_sync(|x: u64| x + 1);
        for _ in 1..100_000 {
            tail = tail.then_apply_sync(|x| x + 1);
        }
        assert!(!tail.is_done());

        root.supply(0).unwrap();
        assert_eq!(tail.join().unwrap(), 100_000);
    }

    #[test]
    fn test_supply_inside_continuation_is_visible() {
        let h = handle();
        let other: Promise<u32> = Promise::empty(&h);
        let follower = other.then_apply_sync(|x| x * 3);

        let start: Promise<u32> = Promise::empty(&h);
        let q = start.then_apply_sync(move |x| {
            other.supply(x).unwrap();
            follower.get_now(0).unwrap()
        });

        start.supply(2).unwrap();
        assert_eq!(q.join().unwrap(), 6);
    }

    #[test]
    fn test_then_compose_forwards_value() {
        let h = handle();
        let inner = h.clone();
        let q = Promise::completed(&h, 2).then_compose_sync(move |x| Promise::completed(&inner, x.to_string()));
        assert_eq!(q.join().unwrap(), "2");
    }

    #[test]
    fn test_then_compose_forwards_failure() {
        let h = handle();
        let inner = h.clone();
        let q: Promise<u32> = Promise::completed(&h, 2)
            .then_compose_async(move |_| Promise::failed(&inner, Failure::msg("composed failed")));

        let err = q.join().unwrap_err();
        assert_eq!(err.failure().unwrap().to_string(), "composed failed");
    }

    #[test]
    fn test_then_compose_waits_for_composed() {
        let h = handle();
        let composed: Promise<u32> = Promise::empty(&h);
        let source = composed.clone();

        let q = Promise::start(&h).then_compose_sync(move |_| source);
        assert!(!q.is_done());

        composed.supply(11).unwrap();
        assert_eq!(q.join().unwrap(), 11);
    }

    #[test]
    fn test_cancelled_parent_stops_chain() {
        let p: Promise<u32> = Promise::empty(&handle());
        let applied = p.then_apply_sync(|x| x + 1);
        let recovered = p.exceptionally_sync(|_| 0);

        assert!(p.cancel());
        assert!(matches!(applied.join(), Err(PromiseError::Cancelled)));
        assert!(!recovered.is_done());

        // producers can no longer complete the cancelled parent
        assert!(p.supply(1).is_ok());
        assert!(p.is_cancelled());
        assert!(!recovered.is_done());
    }

    #[test]
    fn test_delayed_zero_runs_like_immediate() {
        let q = Promise::completed(&handle(), 1)
            .then_apply_delayed(ThreadContext::Sync, |x| x + 1, crate::scheduler::Delay::ZERO);
        assert_eq!(q.join().unwrap(), 2);
    }
}
