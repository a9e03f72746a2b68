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

//! Background worker threads backing the async thread context

use std::collections::VecDeque;
use std::io;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::report;

use super::Task;

struct PoolQueue {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

struct PoolState {
    queue: Mutex<PoolQueue>,
    cond: Condvar,
}

impl PoolState {
    fn lock(&self) -> MutexGuard<PoolQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Dropped tasks are released after the lock, they may own promises
    fn signal_shutdown(&self) {
        let dropped = {
            let mut queue = self.lock();
            queue.shutdown = true;
            self.cond.notify_all();
            mem::take(&mut queue.tasks)
        };
        drop(dropped);
    }
}

/// Submits tasks to the pool without owning its threads
#[derive(Clone)]
pub struct PoolSender {
    state: Arc<PoolState>,
}

impl PoolSender {
    /// Returns `false` if the pool has been shut down
    pub fn execute(&self, task: Task) -> bool {
        let mut queue = self.state.lock();
        if queue.shutdown {
            return false;
        }

        queue.tasks.push_back(task);
        self.state.cond.notify_one();
        true
    }
}

pub struct Pool {
    sender: PoolSender,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    pub fn spawn(name: &str, workers: usize) -> io::Result<Pool> {
        let state = Arc::new(PoolState {
            queue: Mutex::new(PoolQueue {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let mut threads = Vec::with_capacity(workers);
        for tid in 0..workers.max(1) {
            let worker_state = state.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{}", name, tid))
                .spawn(move || run(worker_state));

            match spawned {
                Ok(hdl) => threads.push(hdl),
                Err(err) => {
                    state.signal_shutdown();
                    for hdl in threads {
                        let _ = hdl.join();
                    }
                    return Err(err);
                }
            }
        }

        Ok(Pool {
            sender: PoolSender { state: state },
            threads: Mutex::new(threads),
        })
    }

    #[inline]
    pub fn sender(&self) -> PoolSender {
        self.sender.clone()
    }

    #[inline]
    pub fn execute(&self, task: Task) -> bool {
        self.sender.execute(task)
    }

    pub fn pending(&self) -> usize {
        self.sender.state.lock().tasks.len()
    }

    /// Stop the workers, dropping queued tasks, and wait for them to exit
    pub fn shutdown(&self) {
        self.sender.state.signal_shutdown();

        let threads = {
            let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
            threads.drain(..).collect::<Vec<_>>()
        };

        let current = thread::current().id();
        for hdl in threads {
            if hdl.thread().id() == current {
                continue;
            }
            if hdl.join().is_err() {
                error!("Worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.sender.state.signal_shutdown();
    }
}

fn run(state: Arc<PoolState>) {
    debug!("Worker {:?} started", thread::current().name());

    loop {
        let task = {
            let mut queue = state.lock();
            loop {
                if queue.shutdown {
                    break None;
                }
                if let Some(task) = queue.tasks.pop_front() {
                    break Some(task);
                }
                queue = match state.cond.wait(queue) {
                    Ok(guard) => guard,
                    Err(e) => e.into_inner(),
                };
            }
        };

        match task {
            Some(task) => report::guard(task),
            None => break,
        }
    }

    debug!("Worker {:?} exited", thread::current().name());
}
