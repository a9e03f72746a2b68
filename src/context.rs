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

//! Classification of the thread a piece of code is running on

use std::fmt;
use std::thread::{self, ThreadId};

/// The two kinds of thread a host offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadContext {
    /// The host's single designated main thread
    Sync,
    /// Anything which isn't the `Sync` thread
    Async,
}

impl ThreadContext {
    /// Classify the calling thread against the designated main thread.
    #[inline]
    pub fn for_current_thread(main: ThreadId) -> ThreadContext {
        ThreadContext::for_thread(thread::current().id(), main)
    }

    /// Classify `thread` against the designated main thread.
    #[inline]
    pub fn for_thread(thread: ThreadId, main: ThreadId) -> ThreadContext {
        if thread == main {
            ThreadContext::Sync
        } else {
            ThreadContext::Async
        }
    }
}

impl fmt::Display for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ThreadContext::Sync => f.write_str("SYNC"),
            ThreadContext::Async => f.write_str("ASYNC"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::thread;

    #[test]
    fn test_current_thread_is_sync_when_main() {
        let main = thread::current().id();
        assert_eq!(ThreadContext::for_current_thread(main), ThreadContext::Sync);
    }

    #[test]
    fn test_other_thread_is_async() {
        let main = thread::current().id();
        let ctx = thread::spawn(move || ThreadContext::for_current_thread(main))
            .join()
            .unwrap();
        assert_eq!(ctx, ThreadContext::Async);
    }

    #[test]
    fn test_display() {
        assert_eq!(ThreadContext::Sync.to_string(), "SYNC");
        assert_eq!(ThreadContext::Async.to_string(), "ASYNC");
    }
}
