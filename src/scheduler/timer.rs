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

//! Deadline ordered task storage and the delayed async timer thread

use std::cmp::{Ord, Ordering, PartialOrd};
use std::collections::BinaryHeap;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use slab::Slab;

use super::pool::PoolSender;
use super::Task;

#[derive(Eq, PartialEq)]
struct SleepingTask<T: Ord> {
    expected_wakeup: T,
    seq: u64,
    key: usize,
}

// Reversed so that the `BinaryHeap` pops the earliest wakeup first;
// `seq` keeps FIFO order between tasks due at the same time.
impl<T: Ord> PartialOrd<SleepingTask<T>> for SleepingTask<T> {
    fn partial_cmp(&self, other: &SleepingTask<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for SleepingTask<T> {
    fn cmp(&self, other: &SleepingTask<T>) -> Ordering {
        other.expected_wakeup
             .cmp(&self.expected_wakeup)
             .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Tasks waiting for a deadline of type `T`
pub struct Deadlines<T: Ord + Copy> {
    sleeping: BinaryHeap<SleepingTask<T>>,
    tasks: Slab<Task>,
    seq: u64,
}

impl<T: Ord + Copy> Deadlines<T> {
    pub fn new() -> Deadlines<T> {
        Deadlines {
            sleeping: BinaryHeap::new(),
            tasks: Slab::new(),
            seq: 0,
        }
    }

    pub fn wait_until(&mut self, wakeup: T, task: Task) {
        let key = self.tasks.insert(task);
        self.seq = self.seq.wrapping_add(1);
        self.sleeping.push(SleepingTask {
            expected_wakeup: wakeup,
            seq: self.seq,
            key: key,
        });
    }

    /// Pop one task whose deadline is at or before `now`
    pub fn try_awake(&mut self, now: T) -> Option<Task> {
        let due = match self.sleeping.peek() {
            Some(sleeping) => sleeping.expected_wakeup <= now,
            None => false,
        };

        if !due {
            return None;
        }

        self.sleeping.pop().map(|sleeping| self.tasks.remove(sleeping.key))
    }

    /// The earliest pending deadline
    pub fn next_wakeup(&self) -> Option<T> {
        self.sleeping.peek().map(|sleeping| sleeping.expected_wakeup)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

struct TimerQueue {
    deadlines: Deadlines<Instant>,
    shutdown: bool,
}

struct TimerState {
    queue: Mutex<TimerQueue>,
    cond: Condvar,
}

impl TimerState {
    fn lock(&self) -> MutexGuard<TimerQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Single thread that hands delayed async tasks to the worker pool once due
pub struct Timer {
    state: Arc<TimerState>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    pub fn spawn(name: &str, pool: PoolSender) -> std::io::Result<Timer> {
        let state = Arc::new(TimerState {
            queue: Mutex::new(TimerQueue {
                deadlines: Deadlines::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let thread_state = state.clone();
        let hdl = thread::Builder::new()
            .name(format!("{}-timer", name))
            .spawn(move || run(thread_state, pool))?;

        Ok(Timer {
            state: state,
            thread: Mutex::new(Some(hdl)),
        })
    }

    /// Returns `false` if the timer has been shut down
    pub fn schedule(&self, delay: Duration, task: Task) -> bool {
        let mut queue = self.state.lock();
        if queue.shutdown {
            return false;
        }

        let wakeup = deadline(Instant::now(), delay);
        let wakes_earlier = match queue.deadlines.next_wakeup() {
            Some(next) => wakeup < next,
            None => true,
        };
        queue.deadlines.wait_until(wakeup, task);

        if wakes_earlier {
            self.state.cond.notify_one();
        }
        true
    }

    pub fn pending(&self) -> usize {
        self.state.lock().deadlines.len()
    }

    pub fn shutdown(&self) {
        signal_shutdown(&self.state);

        let hdl = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(hdl) = hdl {
            if hdl.thread().id() != thread::current().id() && hdl.join().is_err() {
                error!("Timer thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        signal_shutdown(&self.state);
    }
}

/// About thirty years out, used when `now + delay` does not fit an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
       .or_else(|| now.checked_add(FAR_FUTURE))
       .unwrap_or(now)
}

fn signal_shutdown(state: &TimerState) {
    let dropped = {
        let mut queue = state.lock();
        queue.shutdown = true;
        state.cond.notify_all();
        mem::replace(&mut queue.deadlines, Deadlines::new())
    };
    drop(dropped);
}

fn run(state: Arc<TimerState>, pool: PoolSender) {
    debug!("Timer thread {:?} started", thread::current().name());

    let mut queue = state.lock();
    loop {
        if queue.shutdown {
            break;
        }

        let now = Instant::now();
        while let Some(task) = queue.deadlines.try_awake(now) {
            if !pool.execute(task) {
                warn!("Worker pool is shut down, dropping delayed task");
            }
        }

        queue = match queue.deadlines.next_wakeup() {
            Some(wakeup) => {
                let timeout = wakeup.saturating_duration_since(now);
                match state.cond.wait_timeout(queue, timeout) {
                    Ok((guard, _)) => guard,
                    Err(e) => e.into_inner().0,
                }
            }
            None => match state.cond.wait(queue) {
                Ok(guard) => guard,
                Err(e) => e.into_inner(),
            },
        };
    }

    debug!("Timer thread {:?} exited", thread::current().name());
}
