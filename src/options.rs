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

//! Host scheduler configuration

use std::time::Duration;

use crate::ticks::MILLISECONDS_PER_TICK;

/// Host scheduler configuration
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of background worker threads
    pub workers: usize,
    /// Prefix used when naming worker and timer threads
    pub name: String,
    /// Sleep between two ticks of `HostScheduler::run_until`
    pub tick_interval: Duration,
}

/// Default thread name prefix
pub const DEFAULT_NAME: &str = "nexus";

impl Options {
    pub fn new() -> Options {
        Options {
            workers: num_cpus::get(),
            name: DEFAULT_NAME.to_owned(),
            tick_interval: Duration::from_millis(MILLISECONDS_PER_TICK),
        }
    }

    pub fn workers(&mut self, workers: usize) -> &mut Options {
        self.workers = workers;
        self
    }

    pub fn name(&mut self, name: String) -> &mut Options {
        self.name = name;
        self
    }

    pub fn tick_interval(&mut self, interval: Duration) -> &mut Options {
        self.tick_interval = interval;
        self
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}
