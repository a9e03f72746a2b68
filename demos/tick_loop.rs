extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;

extern crate nexus_promise;

use std::thread;
use std::time::Duration;

use clap::{App, Arg};

use nexus_promise::{Delay, HostScheduler, Options, Promise, ThreadContext};

fn main() {
    env_logger::init();

    let matches = App::new("tick-loop")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::with_name("WORKERS").short("w").long("workers").takes_value(true)
                .help("Number of background workers"))
        .arg(Arg::with_name("TICKS").short("t").long("ticks").takes_value(true)
                .help("Delay of the last stage, in ticks"))
        .get_matches();

    let mut opts = Options::new();
    if let Some(workers) = matches.value_of("WORKERS") {
        opts.workers(workers.parse().unwrap());
    }
    let ticks: u64 = matches.value_of("TICKS").unwrap_or("10").parse().unwrap();

    let sched = HostScheduler::new(opts).unwrap();
    let handle = sched.handle();

    let lookup = Promise::supplying_async(&handle, || {
        info!("Loading on {:?}", thread::current().name());
        thread::sleep(Duration::from_millis(200));
        42u64
    });

    let done = lookup
        .then_apply_sync(|n| {
            info!("Back on the main thread with {}", n);
            n * 2
        })
        .then_apply_delayed(ThreadContext::Sync, |n| n + 1, Delay::ticks(ticks))
        .exceptionally_sync(|failure| {
            error!("Lookup failed: {}", failure);
            0
        });

    sched.run_until(|| done.is_done()).unwrap();

    println!("Result {} after {} ticks", done.join().unwrap(), sched.current_tick());
    sched.shutdown();
}
