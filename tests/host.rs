extern crate env_logger;
extern crate nexus_promise;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use nexus_promise::report;
use nexus_promise::{Delay, Failure, HostScheduler, Options, Promise, PromiseError, ThreadContext};

fn scheduler(name: &str) -> HostScheduler {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut opts = Options::new();
    opts.workers(2).name(name.to_owned()).tick_interval(Duration::from_millis(1));
    HostScheduler::new(opts).unwrap()
}

#[test]
fn test_async_supply_then_sync_apply() {
    let sched = scheduler("async-then-sync");
    let handle = sched.handle();
    let main = thread::current().id();

    let worker = Promise::supplying_async(&handle, || thread::current().id());
    let seen = worker.then_apply_sync(move |worker_id| (worker_id, thread::current().id()));

    sched.run_until(|| seen.is_done()).unwrap();

    let (worker_id, continuation_id) = seen.join().unwrap();
    assert!(worker_id != main);
    assert_eq!(continuation_id, main);
    sched.shutdown();
}

#[test]
fn test_async_join_from_main_thread() {
    let sched = scheduler("async-join");
    let handle = sched.handle();

    let p = Promise::supplying_async(&handle, || 20).then_apply_async(|x| x + 1);
    assert_eq!(p.join().unwrap(), 21);
    sched.shutdown();
}

#[test]
fn test_delayed_sync_waits_for_ticks() {
    let sched = scheduler("delayed-sync");
    let handle = sched.handle();

    let p = Promise::supplying_delayed_sync(&handle, || "late", Delay::ticks(3));
    for _ in 0..3 {
        sched.tick().unwrap();
        assert!(!p.is_done());
    }
    sched.tick().unwrap();
    assert_eq!(p.join().unwrap(), "late");
    sched.shutdown();
}

#[test]
fn test_delayed_async_waits_for_duration() {
    let sched = scheduler("delayed-async");
    let handle = sched.handle();

    let p = Promise::supplying_delayed_async(&handle, || 1, Duration::from_millis(100));
    assert!(matches!(p.get_timeout(Duration::from_millis(10)), Err(PromiseError::Timeout(..))));
    assert_eq!(p.get_timeout(Duration::from_secs(5)).unwrap(), 1);
    sched.shutdown();
}

#[test]
fn test_compose_across_contexts() {
    let sched = scheduler("compose");
    let handle = sched.handle();

    let inner = handle.clone();
    let p = Promise::completed(&handle, 4)
        .then_compose(ThreadContext::Async, move |x| Promise::supplying_async(&inner, move || x * x))
        .then_apply_sync(|x| x + 1);

    sched.run_until(|| p.is_done()).unwrap();
    assert_eq!(p.join().unwrap(), 17);
    sched.shutdown();
}

#[test]
fn test_recovery_after_async_failure() {
    let sched = scheduler("recovery");
    let handle = sched.handle();

    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    let hook = report::add_hook(move |r| {
        if r.failure.to_string() == "host recovery marker" {
            sink.lock().unwrap().push(r.kind);
        }
    });

    let p = Promise::supplying_exceptionally_async(&handle, || -> Result<u32, Failure> {
        Err(Failure::msg("host recovery marker"))
    });
    let recovered = p.exceptionally_sync(|f| f.to_string().len() as u32);

    sched.run_until(|| recovered.is_done()).unwrap();
    assert_eq!(recovered.join().unwrap(), 20);
    assert_eq!(*reports.lock().unwrap(), vec![report::ReportKind::PromiseChain]);

    assert!(report::remove_hook(hook));
    sched.shutdown();
}

#[test]
fn test_wrap_unfinished_future() {
    let sched = scheduler("wrap-future");
    let handle = sched.handle();

    let (tx, rx) = mpsc::channel();
    let p = Promise::wrap_future(&handle, rx);
    assert!(!p.is_done());

    tx.send(String::from("external")).unwrap();
    assert_eq!(p.get_timeout(Duration::from_secs(5)).unwrap(), "external");
    sched.shutdown();
}

#[test]
fn test_shutdown_drops_pending_work() {
    let sched = scheduler("shutdown");
    let handle = sched.handle();

    // on the main thread a plain sync supplier runs inline, so delay it
    let p = Promise::supplying_delayed_sync(&handle, || 1, Delay::ticks(5));
    let q: Promise<u32> = Promise::supplying_delayed_async(&handle, || 2, Delay::ticks(100));
    assert_eq!(sched.pending_sync(), 1);
    assert_eq!(sched.pending_async(), 1);

    sched.shutdown();
    assert!(sched.is_shutdown());
    assert_eq!(sched.pending_sync(), 0);
    assert_eq!(sched.pending_async(), 0);
    assert!(!p.is_done());
    assert!(!q.is_done());
}

#[test]
fn test_sync_work_from_worker_is_queued_until_shutdown() {
    let sched = scheduler("shutdown-queued");
    let handle = sched.handle();

    let worker = handle.clone();
    let p = thread::spawn(move || Promise::supplying_sync(&worker, || 1)).join().unwrap();
    assert_eq!(sched.pending_sync(), 1);

    sched.shutdown();
    assert_eq!(sched.pending_sync(), 0);
    assert!(!p.is_done());
}

#[test]
fn test_wrap_promise_completed_by_the_only_worker() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut opts = Options::new();
    opts.workers(1).name("wrap-single-worker".to_owned());
    let sched = HostScheduler::new(opts).unwrap();
    let handle = sched.handle();

    let inner: Promise<u32> = Promise::empty(&handle);
    let wrapped = Promise::wrap_future(&handle, inner.clone());
    inner.supply_async(|| 5).unwrap();

    assert_eq!(wrapped.get_timeout(Duration::from_secs(5)).unwrap(), 5);
    sched.shutdown();
}

#[test]
fn test_unbounded_async_delay_is_accepted() {
    let sched = scheduler("unbounded-delay");
    let handle = sched.handle();

    let a = Promise::completed(&handle, 1).then_apply_delayed_async(|x| x + 1, Duration::MAX);
    let b = Promise::completed(&handle, 1).then_apply_delayed_async(|x| x + 1, Delay::ticks(u64::MAX));
    assert_eq!(sched.pending_async(), 2);
    assert!(!a.is_done());
    assert!(!b.is_done());

    // the timer keeps serving short delays
    let c = Promise::supplying_delayed_async(&handle, || 3, Duration::from_millis(10));
    assert_eq!(c.get_timeout(Duration::from_secs(5)).unwrap(), 3);
    sched.shutdown();
}
