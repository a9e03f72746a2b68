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

//! Adopting results produced outside of the promise engine

use std::sync::mpsc::{Receiver, RecvError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{Failure, PromiseError};
use crate::scheduler::Handle;

use super::cell::Outcome;
use super::Promise;

/// A result owned by something other than a promise
pub trait ExternalFuture<V>: Send + Sized + 'static {
    /// Hand the result to `complete` once it is available.
    ///
    /// Must not block the calling thread; sources that can only be waited on
    /// use `wait_on_thread`.
    fn on_result<F>(self, complete: F)
        where F: FnOnce(Result<V, PromiseError>) + Send + 'static;
}

/// Block on `wait` in a thread of its own, never on a pool worker
pub fn wait_on_thread<V, W, F>(wait: W, complete: F)
    where W: FnOnce() -> Result<V, Failure> + Send + 'static,
          F: FnOnce(Result<V, PromiseError>) + Send + 'static
{
    let slot = Arc::new(Mutex::new(Some((wait, complete))));
    let job = slot.clone();

    let spawned = thread::Builder::new()
        .name("nexus-external".to_owned())
        .spawn(move || {
            let taken = job.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some((wait, complete)) = taken {
                complete(wait().map_err(PromiseError::Completion));
            }
        });

    if let Err(err) = spawned {
        error!("Failed to spawn a thread waiting on an external future: {}", err);
        let taken = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some((_, complete)) = taken {
            complete(Err(PromiseError::Completion(Failure::new(err))));
        }
    }
}

impl<V: Send + 'static> ExternalFuture<V> for JoinHandle<V> {
    fn on_result<F>(self, complete: F)
        where F: FnOnce(Result<V, PromiseError>) + Send + 'static
    {
        if self.is_finished() {
            complete(self.join().map_err(|p| PromiseError::Completion(Failure::from_panic(p))));
        } else {
            wait_on_thread(move || self.join().map_err(Failure::from_panic), complete);
        }
    }
}

impl<V: Send + 'static> ExternalFuture<V> for Receiver<V> {
    fn on_result<F>(self, complete: F)
        where F: FnOnce(Result<V, PromiseError>) + Send + 'static
    {
        match self.try_recv() {
            Ok(value) => complete(Ok(value)),
            Err(TryRecvError::Disconnected) => complete(Err(PromiseError::Completion(Failure::new(RecvError)))),
            Err(TryRecvError::Empty) => wait_on_thread(move || self.recv().map_err(Failure::new), complete),
        }
    }
}

impl<V: Clone + Send + 'static> ExternalFuture<V> for Promise<V> {
    fn on_result<F>(self, complete: F)
        where F: FnOnce(Result<V, PromiseError>) + Send + 'static
    {
        self.on_complete(move |outcome| complete(outcome.into_result()));
    }
}

impl<V: Clone + Send + 'static> Promise<V> {
    /// Adopt an external future.
    ///
    /// A finished future becomes a completed promise right away. An unfinished
    /// one completes the promise when its result arrives; a cancelled promise
    /// being adopted cancels the new one.
    pub fn wrap_future<F: ExternalFuture<V>>(handle: &Handle, future: F) -> Promise<V> {
        let promise = Promise::supplied(handle);
        let target = promise.inner.clone();

        future.on_result(move |result| {
            let outcome = match result {
                Ok(value) => Outcome::Value(value),
                Err(PromiseError::Cancelled) => Outcome::Cancelled,
                Err(PromiseError::Completion(failure)) => Outcome::Failure(failure),
                Err(other) => Outcome::Failure(Failure::new(other)),
            };
            target.complete(outcome);
        });

        promise
    }
}
