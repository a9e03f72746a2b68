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

//! Errors raised by promises and the host scheduler

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// The cause of an exceptional completion.
///
/// Cheap to clone; every continuation observing a failed promise receives
/// the same underlying error.
#[derive(Clone)]
pub struct Failure(Arc<dyn Error + Send + Sync + 'static>);

impl Failure {
    pub fn new<E>(err: E) -> Failure
        where E: Error + Send + Sync + 'static
    {
        Failure(Arc::new(err))
    }

    /// Build a failure carrying only a message
    pub fn msg<M: fmt::Display>(message: M) -> Failure {
        Failure::new(Message(message.to_string()))
    }

    pub fn from_boxed(err: Box<dyn Error + Send + Sync + 'static>) -> Failure {
        Failure(Arc::from(err))
    }

    /// Turn a panic payload caught with `catch_unwind` into a failure
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Failure {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_owned(),
                Err(_) => "Box<dyn Any>".to_owned(),
            },
        };
        Failure::new(Panicked(message))
    }

    pub fn is<E: Error + 'static>(&self) -> bool {
        self.0.is::<E>()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn as_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl<E> From<E> for Failure
    where E: Error + Send + Sync + 'static
{
    fn from(err: E) -> Failure {
        Failure::new(err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Failure({:?})", &*self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// A user function panicked
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Panicked(pub String);

#[derive(Debug, Clone, thiserror::Error)]
pub enum PromiseError {
    /// The promise is already being supplied
    #[error("{0}")]
    IllegalState(&'static str),
    /// The promise completed exceptionally
    #[error("promise completed exceptionally: {0}")]
    Completion(Failure),
    #[error("promise was cancelled")]
    Cancelled,
    #[error("timed out after {0:?} waiting for promise")]
    Timeout(Duration),
}

impl PromiseError {
    /// The failure behind a `Completion` error
    pub fn failure(&self) -> Option<&Failure> {
        match *self {
            PromiseError::Completion(ref f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("tick called outside of the designated main thread")]
    NotMainThread,
    #[error("scheduler has been shut down")]
    Shutdown,
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io;
    use std::panic;

    #[test]
    fn test_failure_from_error() {
        let f = Failure::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(f.to_string(), "boom");
        assert!(f.is::<io::Error>());
        assert!(f.downcast_ref::<Panicked>().is_none());
    }

    #[test]
    fn test_failure_from_panic() {
        let payload = panic::catch_unwind(|| panic!("exploded {}", 1)).unwrap_err();
        let f = Failure::from_panic(payload);
        assert_eq!(f.downcast_ref::<Panicked>(), Some(&Panicked("exploded 1".to_owned())));
    }

    #[test]
    fn test_completion_display() {
        let err = PromiseError::Completion(Failure::msg("bad"));
        assert_eq!(err.to_string(), "promise completed exceptionally: bad");
        assert_eq!(err.failure().map(|f| f.to_string()), Some("bad".to_owned()));
    }
}
