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

//! Process-wide sink for failures nobody is synchronously waiting on
//!
//! A continuation body that panics, or a scheduled task that blows up, has no
//! caller to return an error to. Those failures are logged here and then
//! handed to every installed hook.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::Failure;

/// Where a reported failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// A function attached to a promise chain failed
    PromiseChain,
    /// A task handed to the scheduler panicked outside of any promise
    SchedulerTask,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReportKind::PromiseChain => f.write_str("Promise chain"),
            ReportKind::SchedulerTask => f.write_str("Scheduler task"),
        }
    }
}

#[derive(Debug)]
pub struct Report<'a> {
    pub kind: ReportKind,
    pub failure: &'a Failure,
}

pub type Hook = Arc<dyn Fn(&Report) + Send + Sync + 'static>;

/// Identifies an installed hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(usize);

static HOOKS: RwLock<Vec<(HookId, Hook)>> = RwLock::new(Vec::new());
static NEXT_HOOK: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static FIRING: Cell<bool> = Cell::new(false);
}

/// Install a hook receiving every report
pub fn add_hook<F>(hook: F) -> HookId
    where F: Fn(&Report) + Send + Sync + 'static
{
    let id = HookId(NEXT_HOOK.fetch_add(1, Ordering::Relaxed));
    let hook: Hook = Arc::new(hook);
    let mut hooks = HOOKS.write().unwrap_or_else(|e| e.into_inner());
    hooks.push((id, hook));
    id
}

/// Remove a hook installed with `add_hook`
pub fn remove_hook(id: HookId) -> bool {
    let mut hooks = HOOKS.write().unwrap_or_else(|e| e.into_inner());
    let before = hooks.len();
    hooks.retain(|&(hid, _)| hid != id);
    hooks.len() != before
}

fn log(kind: ReportKind, failure: &Failure) {
    error!(target: "nexus_promise::report", "{}: {}", kind, failure);

    let hooks: Vec<Hook> = {
        let hooks = HOOKS.read().unwrap_or_else(|e| e.into_inner());
        hooks.iter().map(|&(_, ref hook)| hook.clone()).collect()
    };

    if hooks.is_empty() {
        return;
    }

    // A hook that reports again must not recurse
    if FIRING.with(|f| f.replace(true)) {
        return;
    }

    let report = Report {
        kind: kind,
        failure: failure,
    };
    for hook in hooks {
        if panic::catch_unwind(AssertUnwindSafe(|| hook(&report))).is_err() {
            warn!(target: "nexus_promise::report", "report hook panicked while handling: {}", failure);
        }
    }

    FIRING.with(|f| f.set(false));
}

/// Report a failure raised inside a promise chain
pub fn promise(failure: &Failure) {
    log(ReportKind::PromiseChain, failure);
}

/// Report a failure raised by a scheduled task
pub fn scheduler(failure: &Failure) {
    log(ReportKind::SchedulerTask, failure);
}

/// Run `task`, reporting a panic as a scheduler failure instead of unwinding
pub fn guard<F: FnOnce()>(task: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        scheduler(&Failure::from_panic(payload));
    }
}
