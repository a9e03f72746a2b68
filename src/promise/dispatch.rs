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

//! Selects where a continuation runs
//!
//! Every thread-affinity rule of the promise engine lives here.

use crate::context::ThreadContext;
use crate::report;
use crate::scheduler::{Delay, Handle, Task};

/// The four ways a continuation can be run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// On the main thread; inline when already on it
    Sync,
    /// On the background executor, never inline
    Async,
    DelayedSync(Delay),
    DelayedAsync(Delay),
}

impl Execution {
    #[inline]
    pub fn immediate(context: ThreadContext) -> Execution {
        match context {
            ThreadContext::Sync => Execution::Sync,
            ThreadContext::Async => Execution::Async,
        }
    }

    #[inline]
    pub fn delayed(context: ThreadContext, delay: Delay) -> Execution {
        match context {
            ThreadContext::Sync => Execution::DelayedSync(delay),
            ThreadContext::Async => Execution::DelayedAsync(delay),
        }
    }

    #[inline]
    pub fn context(&self) -> ThreadContext {
        match *self {
            Execution::Sync | Execution::DelayedSync(..) => ThreadContext::Sync,
            Execution::Async | Execution::DelayedAsync(..) => ThreadContext::Async,
        }
    }

    pub fn dispatch(self, handle: &Handle, task: Task) {
        match self {
            Execution::Sync => execute_sync(handle, task),
            Execution::Async => execute_async(handle, task),
            Execution::DelayedSync(delay) => {
                if delay.is_zero() {
                    execute_sync(handle, task)
                } else {
                    handle.execute_later(ThreadContext::Sync, delay, task)
                }
            }
            Execution::DelayedAsync(delay) => {
                if delay.is_zero() {
                    execute_async(handle, task)
                } else {
                    handle.execute_later(ThreadContext::Async, delay, task)
                }
            }
        }
    }
}

fn execute_sync(handle: &Handle, task: Task) {
    if handle.is_main_thread() {
        report::guard(task);
    } else {
        handle.execute(ThreadContext::Sync, task);
    }
}

#[inline]
fn execute_async(handle: &Handle, task: Task) {
    handle.execute(ThreadContext::Async, task);
}
