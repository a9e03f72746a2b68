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

//! Populating promises

use crate::context::ThreadContext;
use crate::error::{Failure, PromiseError};
use crate::scheduler::{Delay, Handle};

use super::cell::Outcome;
use super::dispatch::Execution;
use super::{catch, Promise};

impl<V: Clone + Send + 'static> Promise<V> {
    /// Run `f` under `exec` and complete this promise with its result,
    /// unless the promise gets cancelled first.
    fn run_supplier<F>(&self, exec: Execution, f: F)
        where F: FnOnce() -> Result<V, Failure> + Send + 'static
    {
        let inner = self.inner.clone();
        exec.dispatch(&self.inner.handle, Box::new(move || {
            if inner.is_cancelled() {
                return;
            }
            inner.settle(catch(f).and_then(|r| r));
        }));
    }

    fn supply_with<F>(&self, exec: Execution, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static
    {
        self.mark_as_supplied()?;
        self.run_supplier(exec, move || Ok(f()));
        Ok(self)
    }

    fn supply_exceptionally_with<F, E>(&self, exec: Execution, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        self.mark_as_supplied()?;
        self.run_supplier(exec, move || f().map_err(Into::into));
        Ok(self)
    }

    /// Complete the promise with `value`.
    ///
    /// Fails with `IllegalState` if the promise is already being supplied.
    pub fn supply(&self, value: V) -> Result<&Promise<V>, PromiseError> {
        self.mark_as_supplied()?;
        self.inner.complete(Outcome::Value(value));
        Ok(self)
    }

    /// Complete the promise exceptionally
    pub fn supply_exception<E: Into<Failure>>(&self, failure: E) -> Result<&Promise<V>, PromiseError> {
        self.mark_as_supplied()?;
        self.inner.complete(Outcome::Failure(failure.into()));
        Ok(self)
    }

    /// Supply the result of `f`, run on `context`
    pub fn supply_from<F>(&self, context: ThreadContext, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static
    {
        self.supply_with(Execution::immediate(context), f)
    }

    pub fn supply_sync<F>(&self, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static
    {
        self.supply_with(Execution::Sync, f)
    }

    pub fn supply_async<F>(&self, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static
    {
        self.supply_with(Execution::Async, f)
    }

    pub fn supply_delayed<F, D>(&self, context: ThreadContext, f: F, delay: D) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        self.supply_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn supply_delayed_sync<F, D>(&self, f: F, delay: D) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        self.supply_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn supply_delayed_async<F, D>(&self, f: F, delay: D) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        self.supply_with(Execution::DelayedAsync(delay.into()), f)
    }

    /// Supply the result of a fallible `f`, run on `context`. An `Err`
    /// completes the promise exceptionally.
    pub fn supply_exceptionally<F, E>(&self, context: ThreadContext, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        self.supply_exceptionally_with(Execution::immediate(context), f)
    }

    pub fn supply_exceptionally_sync<F, E>(&self, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        self.supply_exceptionally_with(Execution::Sync, f)
    }

    pub fn supply_exceptionally_async<F, E>(&self, f: F) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        self.supply_exceptionally_with(Execution::Async, f)
    }

    pub fn supply_exceptionally_delayed<F, E, D>(&self,
                                                 context: ThreadContext,
                                                 f: F,
                                                 delay: D)
                                                 -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        self.supply_exceptionally_with(Execution::delayed(context, delay.into()), f)
    }

    pub fn supply_exceptionally_delayed_sync<F, E, D>(&self, f: F, delay: D) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        self.supply_exceptionally_with(Execution::DelayedSync(delay.into()), f)
    }

    pub fn supply_exceptionally_delayed_async<F, E, D>(&self, f: F, delay: D) -> Result<&Promise<V>, PromiseError>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        self.supply_exceptionally_with(Execution::DelayedAsync(delay.into()), f)
    }

    fn supplying_with<F>(handle: &Handle, exec: Execution, f: F) -> Promise<V>
        where F: FnOnce() -> Result<V, Failure> + Send + 'static
    {
        let promise = Promise::supplied(handle);
        promise.run_supplier(exec, f);
        promise
    }

    /// A new promise supplied by `f`, run on `context`
    pub fn supplying<F>(handle: &Handle, context: ThreadContext, f: F) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static
    {
        Promise::supplying_with(handle, Execution::immediate(context), move || Ok(f()))
    }

    pub fn supplying_sync<F>(handle: &Handle, f: F) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static
    {
        Promise::supplying_with(handle, Execution::Sync, move || Ok(f()))
    }

    pub fn supplying_async<F>(handle: &Handle, f: F) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static
    {
        Promise::supplying_with(handle, Execution::Async, move || Ok(f()))
    }

    pub fn supplying_delayed<F, D>(handle: &Handle, context: ThreadContext, f: F, delay: D) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        Promise::supplying_with(handle, Execution::delayed(context, delay.into()), move || Ok(f()))
    }

    pub fn supplying_delayed_sync<F, D>(handle: &Handle, f: F, delay: D) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        Promise::supplying_with(handle, Execution::DelayedSync(delay.into()), move || Ok(f()))
    }

    pub fn supplying_delayed_async<F, D>(handle: &Handle, f: F, delay: D) -> Promise<V>
        where F: FnOnce() -> V + Send + 'static,
              D: Into<Delay>
    {
        Promise::supplying_with(handle, Execution::DelayedAsync(delay.into()), move || Ok(f()))
    }

    /// A new promise supplied by a fallible `f`, run on `context`
    pub fn supplying_exceptionally<F, E>(handle: &Handle, context: ThreadContext, f: F) -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        Promise::supplying_with(handle, Execution::immediate(context), move || f().map_err(Into::into))
    }

    pub fn supplying_exceptionally_sync<F, E>(handle: &Handle, f: F) -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        Promise::supplying_with(handle, Execution::Sync, move || f().map_err(Into::into))
    }

    pub fn supplying_exceptionally_async<F, E>(handle: &Handle, f: F) -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>
    {
        Promise::supplying_with(handle, Execution::Async, move || f().map_err(Into::into))
    }

    pub fn supplying_exceptionally_delayed<F, E, D>(handle: &Handle,
                                                    context: ThreadContext,
                                                    f: F,
                                                    delay: D)
                                                    -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        Promise::supplying_with(handle,
                                Execution::delayed(context, delay.into()),
                                move || f().map_err(Into::into))
    }

    pub fn supplying_exceptionally_delayed_sync<F, E, D>(handle: &Handle, f: F, delay: D) -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        Promise::supplying_with(handle, Execution::DelayedSync(delay.into()), move || f().map_err(Into::into))
    }

    pub fn supplying_exceptionally_delayed_async<F, E, D>(handle: &Handle, f: F, delay: D) -> Promise<V>
        where F: FnOnce() -> Result<V, E> + Send + 'static,
              E: Into<Failure>,
              D: Into<Delay>
    {
        Promise::supplying_with(handle, Execution::DelayedAsync(delay.into()), move || f().map_err(Into::into))
    }
}
