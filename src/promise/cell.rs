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

//! The write-once slot backing every promise

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{Failure, PromiseError};

/// How a promise ended up
#[derive(Debug, Clone)]
pub enum Outcome<V> {
    Value(V),
    Failure(Failure),
    Cancelled,
}

impl<V> Outcome<V> {
    pub fn into_result(self) -> Result<V, PromiseError> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Failure(f) => Err(PromiseError::Completion(f)),
            Outcome::Cancelled => Err(PromiseError::Cancelled),
        }
    }
}

pub type Listener<V> = Box<dyn FnOnce(Outcome<V>) + Send + 'static>;

type Job = Box<dyn FnOnce() + 'static>;

thread_local! {
    // `Some` while this thread is running listeners of a completion. Listeners
    // of completions triggered from inside them are queued here instead of
    // nesting, so a long chain does not grow the stack.
    static DEFERRED: RefCell<Option<VecDeque<Job>>> = RefCell::new(None);
}

/// Puts back the saved queue state when dropped, unwinding included
struct Restore(Option<VecDeque<Job>>);

impl Drop for Restore {
    fn drop(&mut self) {
        let saved = self.0.take();
        let abandoned = DEFERRED.with(|d| d.replace(saved));
        drop(abandoned);
    }
}

fn run_listener(job: Job) {
    let mut job = Some(job);
    DEFERRED.with(|d| {
        if let Some(ref mut queue) = *d.borrow_mut() {
            queue.extend(job.take());
        }
    });

    let job = match job {
        Some(job) => job,
        None => return,
    };

    let _restore = Restore(None);
    DEFERRED.with(|d| *d.borrow_mut() = Some(VecDeque::new()));

    job();
    while let Some(next) = DEFERRED.with(|d| d.borrow_mut().as_mut().and_then(|q| q.pop_front())) {
        next();
    }
}

/// Run user code with completions inside it propagating eagerly, so that a
/// value supplied there is observable before `f` returns.
pub fn detached<T, F: FnOnce() -> T>(f: F) -> T {
    let _restore = Restore(DEFERRED.with(|d| d.borrow_mut().take()));
    f()
}

enum Slot<V> {
    Pending(Vec<Listener<V>>),
    Done(Outcome<V>),
}

/// Holds at most one outcome and notifies listeners and blocked threads
/// when it is written.
pub struct CompletionCell<V> {
    slot: Mutex<Slot<V>>,
    cond: Condvar,
}

impl<V: Clone + Send + 'static> CompletionCell<V> {
    pub fn new() -> CompletionCell<V> {
        CompletionCell {
            slot: Mutex::new(Slot::Pending(Vec::new())),
            cond: Condvar::new(),
        }
    }

    pub fn done(outcome: Outcome<V>) -> CompletionCell<V> {
        CompletionCell {
            slot: Mutex::new(Slot::Done(outcome)),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<Slot<V>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the outcome. Returns `false` if one was already written.
    ///
    /// Listeners run on the calling thread after the lock is released, in
    /// registration order. When called from inside another listener they run
    /// once that listener returns.
    pub fn complete(&self, outcome: Outcome<V>) -> bool {
        let mut listeners = {
            let mut slot = self.lock();
            let listeners = match *slot {
                Slot::Done(..) => return false,
                Slot::Pending(ref mut listeners) => std::mem::take(listeners),
            };
            *slot = Slot::Done(outcome.clone());
            self.cond.notify_all();
            listeners
        };

        if let Some(last) = listeners.pop() {
            for listener in listeners {
                let outcome = outcome.clone();
                run_listener(Box::new(move || listener(outcome)));
            }
            run_listener(Box::new(move || last(outcome)));
        }
        true
    }

    /// Register a listener, running it immediately on the calling thread if
    /// the outcome is already known.
    pub fn on_complete(&self, listener: Listener<V>) {
        let outcome = {
            let mut slot = self.lock();
            match *slot {
                Slot::Pending(ref mut listeners) => {
                    listeners.push(listener);
                    return;
                }
                Slot::Done(ref outcome) => outcome.clone(),
            }
        };
        listener(outcome);
    }

    pub fn peek(&self) -> Option<Outcome<V>> {
        match *self.lock() {
            Slot::Pending(..) => None,
            Slot::Done(ref outcome) => Some(outcome.clone()),
        }
    }

    pub fn is_done(&self) -> bool {
        match *self.lock() {
            Slot::Pending(..) => false,
            Slot::Done(..) => true,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match *self.lock() {
            Slot::Done(Outcome::Cancelled) => true,
            _ => false,
        }
    }

    /// Block until an outcome is written
    pub fn wait(&self) -> Outcome<V> {
        let mut slot = self.lock();
        loop {
            if let Slot::Done(ref outcome) = *slot {
                return outcome.clone();
            }
            slot = match self.cond.wait(slot) {
                Ok(guard) => guard,
                Err(e) => e.into_inner(),
            };
        }
    }

    /// Block for at most `timeout`; `None` if nothing was written in time
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<V>> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Some(self.wait()),
        };
        let mut slot = self.lock();
        loop {
            if let Slot::Done(ref outcome) = *slot {
                return Some(outcome.clone());
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            slot = match self.cond.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_complete_once() {
        let cell = CompletionCell::new();
        assert!(cell.complete(Outcome::Value(1)));
        assert!(!cell.complete(Outcome::Value(2)));
        assert!(!cell.complete(Outcome::Cancelled));
        assert_eq!(cell.wait().into_result().unwrap(), 1);
    }

    #[test]
    fn test_listeners_run_in_order() {
        let cell = CompletionCell::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            cell.on_complete(Box::new(move |o: Outcome<u32>| {
                seen.lock().unwrap().push((i, o.into_result().unwrap()));
            }));
        }
        assert!(seen.lock().unwrap().is_empty());

        cell.complete(Outcome::Value(7));
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);

        let late = seen.clone();
        cell.on_complete(Box::new(move |o: Outcome<u32>| {
            late.lock().unwrap().push((9, o.into_result().unwrap()));
        }));
        assert_eq!(seen.lock().unwrap().last(), Some(&(9, 7)));
    }

    #[test]
    fn test_wait_blocks_until_written() {
        let cell = Arc::new(CompletionCell::new());
        let writer = cell.clone();

        let hdl = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.complete(Outcome::Value("done".to_owned()));
        });

        assert_eq!(cell.wait().into_result().unwrap(), "done");
        hdl.join().unwrap();
    }

    #[test]
    fn test_nested_completion_runs_after_listener() {
        let first: CompletionCell<u32> = CompletionCell::new();
        let second = Arc::new(CompletionCell::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let seen = order.clone();
        second.on_complete(Box::new(move |_: Outcome<u32>| seen.lock().unwrap().push("second")));

        let (seen, nested) = (order.clone(), second.clone());
        first.on_complete(Box::new(move |_: Outcome<u32>| {
            nested.complete(Outcome::Value(2));
            seen.lock().unwrap().push("first");
        }));

        first.complete(Outcome::Value(1));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_detached_completion_runs_eagerly() {
        let first: CompletionCell<u32> = CompletionCell::new();
        let second = Arc::new(CompletionCell::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let seen = order.clone();
        second.on_complete(Box::new(move |_: Outcome<u32>| seen.lock().unwrap().push("second")));

        let (seen, nested) = (order.clone(), second.clone());
        first.on_complete(Box::new(move |_: Outcome<u32>| {
            detached(|| nested.complete(Outcome::Value(2)));
            seen.lock().unwrap().push("first");
        }));

        first.complete(Outcome::Value(1));
        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_wait_timeout_with_unbounded_timeout() {
        let cell = CompletionCell::done(Outcome::Value(3u8));
        assert_eq!(cell.wait_timeout(Duration::MAX).unwrap().into_result().unwrap(), 3);
    }

    #[test]
    fn test_wait_timeout_leaves_cell_pending() {
        let cell: CompletionCell<u8> = CompletionCell::new();
        assert!(cell.wait_timeout(Duration::from_millis(10)).is_none());
        assert!(!cell.is_done());
    }
}
