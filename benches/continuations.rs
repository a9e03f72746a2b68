// Copyright 2015 The coio Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

extern crate nexus_promise;
extern crate num_cpus;

use std::time::{Duration, Instant};

use nexus_promise::{HostScheduler, Options, Promise};

const NS_PER_MS: u64 = 1_000_000;
const CHAIN_LENGTH: usize = 100_000;

#[derive(Clone, Copy)]
struct Result {
    duration: u64,
    iters: u64,
}

#[inline]
fn rdiv(a: u64, b: u64) -> u64 {
    (a + (b / 2)) / b
}

#[inline]
fn nanos(d: Duration) -> u64 {
    d.as_secs() * 1_000_000_000 + d.subsec_nanos() as u64
}

/// Sync continuations attached on the main thread run inline
fn run_sync_chain(sched: &HostScheduler) -> Result {
    let handle = sched.handle();

    let beg = Instant::now();
    let mut p = Promise::completed(&handle, 0usize);
    for _ in 0..CHAIN_LENGTH {
        p = p.then_apply_sync(|x| x + 1);
    }
    let n = p.join().unwrap();
    let dur = nanos(beg.elapsed());

    assert_eq!(n, CHAIN_LENGTH);
    Result {
        duration: dur,
        iters: CHAIN_LENGTH as u64,
    }
}

/// Every async continuation is a round trip through the worker pool
fn run_async_fanout(sched: &HostScheduler) -> Result {
    let handle = sched.handle();

    let beg = Instant::now();
    let root = Promise::completed(&handle, 1usize);
    let leaves: Vec<_> = (0..CHAIN_LENGTH).map(|_| root.then_apply_async(|x| x + 1)).collect();
    let sum = leaves.iter().fold(0, |acc, p| acc + p.join().unwrap());
    let dur = nanos(beg.elapsed());

    assert_eq!(sum, CHAIN_LENGTH * 2);
    Result {
        duration: dur,
        iters: CHAIN_LENGTH as u64,
    }
}

// Run this benchmark with
//   cargo bench --bench continuations -- --csv
// to get a parsable output: worker count, then ns/continuation for the sync
// chain and the async fan-out.
fn main() {
    let csv = std::env::args().any(|arg| arg == "--csv");

    for workers in 1..(num_cpus::get() + 1) {
        let mut opts = Options::new();
        opts.workers(workers).name("bench".to_owned());
        let sched = HostScheduler::new(opts).unwrap();

        let sync = run_sync_chain(&sched);
        let fanout = run_async_fanout(&sched);
        sched.shutdown();

        if csv {
            println!("{};{};{}",
                     workers,
                     rdiv(sync.duration, sync.iters),
                     rdiv(fanout.duration, fanout.iters));
        } else {
            println!("\n==== {} Workers ====\n", workers);
            println!("Sync chain: {} continuations in {} ms => {} ns/iter",
                     sync.iters,
                     rdiv(sync.duration, NS_PER_MS),
                     rdiv(sync.duration, sync.iters));
            println!("Async fan-out: {} continuations in {} ms => {} ns/iter",
                     fanout.iters,
                     rdiv(fanout.duration, NS_PER_MS),
                     rdiv(fanout.duration, fanout.iters));
        }
    }
}
