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

//! The seam between promises and the host that runs their continuations
//!
//! A host has to provide two things: the identity of its main thread and a
//! way to run a task on either thread context, optionally after a delay.
//! `HostScheduler` is a standalone host built on plain threads.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use crate::context::ThreadContext;
use crate::ticks;

pub use self::host::HostScheduler;

mod host;
mod pool;
mod timer;

/// A unit of work handed to the host
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Host side of continuation dispatch
pub trait Scheduler: Send + Sync + 'static {
    /// The designated main thread
    fn main_thread(&self) -> ThreadId;

    /// Run `task` on `context`, after `delay` unless it is zero.
    ///
    /// A zero delay means "at the next opportunity". The scheduler is free to
    /// convert the delay into its native unit.
    fn schedule(&self, task: Task, context: ThreadContext, delay: Delay);
}

/// How long to wait before running a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Host ticks
    Ticks(u64),
    /// Wall-clock time
    Duration(Duration),
}

impl Delay {
    pub const ZERO: Delay = Delay::Ticks(0);

    #[inline]
    pub fn ticks(ticks: u64) -> Delay {
        Delay::Ticks(ticks)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        match *self {
            Delay::Ticks(t) => t == 0,
            Delay::Duration(d) => d == Duration::ZERO,
        }
    }

    /// The delay in ticks, truncating partial ticks
    #[inline]
    pub fn as_ticks(&self) -> u64 {
        match *self {
            Delay::Ticks(t) => t,
            Delay::Duration(d) => ticks::from_duration(d),
        }
    }

    #[inline]
    pub fn as_duration(&self) -> Duration {
        match *self {
            Delay::Ticks(t) => ticks::to_duration(t),
            Delay::Duration(d) => d,
        }
    }
}

impl From<Duration> for Delay {
    fn from(d: Duration) -> Delay {
        Delay::Duration(d)
    }
}

impl Default for Delay {
    fn default() -> Delay {
        Delay::ZERO
    }
}

/// Shared reference to the host scheduler, carried by every promise
#[derive(Clone)]
pub struct Handle(Arc<dyn Scheduler>);

impl Handle {
    pub fn new<S: Scheduler>(scheduler: S) -> Handle {
        Handle(Arc::new(scheduler))
    }

    pub fn from_arc<S: Scheduler>(scheduler: Arc<S>) -> Handle {
        Handle(scheduler)
    }

    #[inline]
    pub fn main_thread(&self) -> ThreadId {
        self.0.main_thread()
    }

    /// Classify the calling thread
    #[inline]
    pub fn context(&self) -> ThreadContext {
        ThreadContext::for_current_thread(self.0.main_thread())
    }

    #[inline]
    pub fn is_main_thread(&self) -> bool {
        self.context() == ThreadContext::Sync
    }

    /// Run `task` on `context` at the next opportunity
    #[inline]
    pub fn execute(&self, context: ThreadContext, task: Task) {
        self.0.schedule(task, context, Delay::ZERO)
    }

    /// Run `task` on `context` after `delay`
    #[inline]
    pub fn execute_later(&self, context: ThreadContext, delay: Delay, task: Task) {
        self.0.schedule(task, context, delay)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle {{ main_thread: {:?} }}", self.main_thread())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_delay_conversions() {
        assert!(Delay::ZERO.is_zero());
        assert!(Delay::from(Duration::ZERO).is_zero());
        assert!(!Delay::from(Duration::from_millis(10)).is_zero());

        assert_eq!(Delay::ticks(3).as_duration(), Duration::from_millis(150));
        assert_eq!(Delay::from(Duration::from_millis(120)).as_ticks(), 2);
    }
}
