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

//! A standalone host: a main thread driven as a tick loop, a worker pool and
//! a timer thread

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::context::ThreadContext;
use crate::error::SchedulerError;
use crate::options::Options;
use crate::report;

use super::pool::Pool;
use super::timer::{Deadlines, Timer};
use super::{Delay, Handle, Scheduler, Task};

struct MainQueue {
    ready: VecDeque<Task>,
    delayed: Deadlines<u64>,
}

impl MainQueue {
    fn new() -> MainQueue {
        MainQueue {
            ready: VecDeque::new(),
            delayed: Deadlines::new(),
        }
    }
}

struct Shared {
    main_thread: ThreadId,
    options: Options,
    current_tick: AtomicU64,
    shutdown: AtomicBool,
    main: Mutex<MainQueue>,
    pool: Pool,
    timer: Timer,
}

impl Shared {
    fn main(&self) -> MutexGuard<MainQueue> {
        self.main.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Host scheduler built on plain threads.
///
/// The thread designated as main never runs on its own: the owner drives it
/// by calling `tick` (or `run_until`) from that thread, the same way a game
/// loop would. Async tasks run on a fixed worker pool.
#[derive(Clone)]
pub struct HostScheduler {
    inner: Arc<Shared>,
}

impl HostScheduler {
    /// Create a scheduler whose main thread is the calling thread
    pub fn new(opts: Options) -> Result<HostScheduler, SchedulerError> {
        HostScheduler::with_main_thread(opts, thread::current().id())
    }

    /// Create a scheduler with an explicitly designated main thread
    pub fn with_main_thread(opts: Options, main_thread: ThreadId) -> Result<HostScheduler, SchedulerError> {
        let pool = Pool::spawn(&opts.name, opts.workers)?;
        let timer = Timer::spawn(&opts.name, pool.sender())?;

        debug!("Scheduler {:?} started with {} workers", opts.name, opts.workers.max(1));

        Ok(HostScheduler {
            inner: Arc::new(Shared {
                main_thread: main_thread,
                options: opts,
                current_tick: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
                main: Mutex::new(MainQueue::new()),
                pool: pool,
                timer: timer,
            }),
        })
    }

    /// A promise-facing handle to this scheduler
    pub fn handle(&self) -> Handle {
        Handle::new(self.clone())
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Number of ticks run so far
    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.inner.current_tick.load(Ordering::SeqCst)
    }

    /// Sync tasks waiting for a tick, delayed ones included
    pub fn pending_sync(&self) -> usize {
        let main = self.inner.main();
        main.ready.len() + main.delayed.len()
    }

    /// Async tasks queued on the pool or waiting on the timer
    pub fn pending_async(&self) -> usize {
        self.inner.pool.pending() + self.inner.timer.pending()
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Run one tick on the main thread.
    ///
    /// Runs every ready sync task and every delayed one due on this tick, then
    /// advances the tick counter. Tasks scheduled while the tick runs wait for
    /// the next one. Returns the number of tasks run.
    pub fn tick(&self) -> Result<usize, SchedulerError> {
        if thread::current().id() != self.inner.main_thread {
            return Err(SchedulerError::NotMainThread);
        }
        if self.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }

        let now = self.inner.current_tick.load(Ordering::SeqCst);
        let batch = {
            let mut main = self.inner.main();
            let mut batch: Vec<Task> = main.ready.drain(..).collect();
            while let Some(task) = main.delayed.try_awake(now) {
                batch.push(task);
            }
            batch
        };
        self.inner.current_tick.fetch_add(1, Ordering::SeqCst);

        let count = batch.len();
        for task in batch {
            report::guard(task);
        }

        trace!("Tick {} ran {} tasks", now, count);
        Ok(count)
    }

    /// Keep ticking until `done` returns true
    pub fn run_until<F>(&self, mut done: F) -> Result<(), SchedulerError>
        where F: FnMut() -> bool
    {
        while !done() {
            self.tick()?;
            if done() {
                break;
            }
            thread::sleep(self.inner.options.tick_interval);
        }
        Ok(())
    }

    /// Stop worker and timer threads and drop every pending task
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        let dropped = {
            let mut main = self.inner.main();
            mem::replace(&mut *main, MainQueue::new())
        };
        drop(dropped);
        self.inner.timer.shutdown();
        self.inner.pool.shutdown();

        debug!("Scheduler {:?} shut down", self.inner.options.name);
    }
}

impl Scheduler for HostScheduler {
    fn main_thread(&self) -> ThreadId {
        self.inner.main_thread
    }

    fn schedule(&self, task: Task, context: ThreadContext, delay: Delay) {
        if self.is_shutdown() {
            warn!("Scheduler {:?} is shut down, dropping {} task", self.inner.options.name, context);
            return;
        }

        let accepted = match context {
            ThreadContext::Sync => {
                let mut main = self.inner.main();
                if delay.is_zero() {
                    main.ready.push_back(task);
                } else {
                    let due = self.current_tick().saturating_add(delay.as_ticks());
                    main.delayed.wait_until(due, task);
                }
                true
            }
            ThreadContext::Async => {
                if delay.is_zero() {
                    self.inner.pool.execute(task)
                } else {
                    self.inner.timer.schedule(delay.as_duration(), task)
                }
            }
        };

        if !accepted {
            warn!("Scheduler {:?} is shut down, dropping {} task", self.inner.options.name, context);
        }
    }
}

impl fmt::Debug for HostScheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HostScheduler")
         .field("name", &self.inner.options.name)
         .field("main_thread", &self.inner.main_thread)
         .field("current_tick", &self.current_tick())
         .finish()
    }
}
