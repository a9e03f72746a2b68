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

//! Promises whose continuations are dispatched onto a host's main thread or
//! its background executor.
//!
//! A host owns exactly one "main" thread (usually a game loop) and a
//! pool of background threads. Every [`Promise`] carries a
//! [`Handle`] to that host, and every continuation picks one of four
//! dispatch variants: sync, async, delayed sync and delayed async.
//!
//! ```no_run
//! use nexus_promise::{HostScheduler, Options, Promise};
//!
//! let scheduler = HostScheduler::new(Options::new()).unwrap();
//! let handle = scheduler.handle();
//!
//! let doubled = Promise::supplying_async(&handle, || 21)
//!     .then_apply_sync(|x| x * 2);
//!
//! scheduler.run_until(|| doubled.is_done()).unwrap();
//! assert_eq!(doubled.join().unwrap(), 42);
//! ```

#[macro_use]
extern crate log;
extern crate num_cpus;
extern crate slab;
extern crate thiserror;

pub use context::ThreadContext;
pub use error::{Failure, Panicked, PromiseError, SchedulerError};
pub use options::Options;
pub use promise::{ExternalFuture, Promise};
pub use scheduler::{Delay, Handle, HostScheduler, Scheduler, Task};

pub mod context;
pub mod error;
pub mod options;
pub mod promise;
pub mod report;
pub mod scheduler;
pub mod ticks;
