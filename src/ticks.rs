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

//! Conversions between host ticks and wall-clock durations
//!
//! The host is assumed to run at a perfect tick rate.

use std::time::Duration;

/// Number of ticks which occur in a second
pub const TICKS_PER_SECOND: u64 = 20;
pub const MILLISECONDS_PER_SECOND: u64 = 1000;
/// Milliseconds in a tick
pub const MILLISECONDS_PER_TICK: u64 = MILLISECONDS_PER_SECOND / TICKS_PER_SECOND;

/// Convert a duration into ticks, truncating any partial tick.
#[inline]
pub fn from_duration(duration: Duration) -> u64 {
    let ms = duration.as_millis() / MILLISECONDS_PER_TICK as u128;
    if ms > u64::MAX as u128 {
        u64::MAX
    } else {
        ms as u64
    }
}

/// Convert a tick count into a duration.
#[inline]
pub fn to_duration(ticks: u64) -> Duration {
    Duration::from_millis(ticks.saturating_mul(MILLISECONDS_PER_TICK))
}

#[cfg(test)]
mod test {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_from_duration_truncates() {
        assert_eq!(from_duration(Duration::from_secs(1)), 20);
        assert_eq!(from_duration(Duration::from_millis(149)), 2);
        assert_eq!(from_duration(Duration::from_millis(49)), 0);
    }

    #[test]
    fn test_to_duration() {
        assert_eq!(to_duration(20), Duration::from_secs(1));
        assert_eq!(to_duration(3), Duration::from_millis(150));
    }
}
