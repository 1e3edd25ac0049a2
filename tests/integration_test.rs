use crossbeam_channel::{bounded, unbounded};
use parking_lot::Mutex;
use queue_centre::prelude::*;
use queue_centre::telemetry::{RecordBuffer, TaskRecord};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn registry() -> Arc<SchedulerRegistry> {
    let config = Config::builder()
        .worker_threads(4)
        .leeway(Duration::from_millis(1))
        .build()
        .unwrap();
    SchedulerRegistry::new(config).unwrap()
}

#[test]
fn test_schedule_returns_action_value() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::High).unwrap();

    let value = scheduler.schedule(21, |x| x * 2).join().unwrap();

    assert_eq!(value, 42);
    assert_eq!(registry.counter(Priority::High).value(), 1);
}

#[test]
fn test_serial_scheduler_runs_fifo_without_overlap() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Low).unwrap();
    assert_eq!(scheduler.kind(), QueueKind::Serial);

    let order = Arc::new(Mutex::new(Vec::new()));
    let running = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let order = order.clone();
            let running = running.clone();
            let overlapped = overlapped.clone();
            scheduler.schedule(i, move |i| {
                if running.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlapped.fetch_add(1, Ordering::SeqCst);
                }
                order.lock().push(i);
                thread::sleep(Duration::from_micros(200));
                running.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*order.lock(), (0..50).collect::<Vec<_>>());
    assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    assert_eq!(registry.counter(Priority::Low).value(), 50);
}

#[test]
fn test_concurrent_scheduler_overlaps_tasks() {
    let registry = registry();
    let scheduler = registry.async_scheduler(Priority::Default).unwrap();
    assert_eq!(scheduler.kind(), QueueKind::Concurrent);

    // Both tasks must be running at once for either to get past the barrier.
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = barrier.clone();
            scheduler.schedule((), move |_| {
                barrier.wait();
            })
        })
        .collect();

    for handle in &handles {
        handle.join_timeout(WAIT).unwrap();
    }
    assert_eq!(registry.counter(Priority::Default).value(), 2);
}

#[test]
fn test_schedulers_of_one_priority_share_a_counter() {
    let registry = registry();
    let serial = registry.scheduler(Priority::Background).unwrap();
    let concurrent = registry.async_scheduler(Priority::Background).unwrap();

    serial.schedule((), |_| ()).join().unwrap();
    concurrent.schedule((), |_| ()).join().unwrap();
    concurrent.schedule((), |_| ()).join().unwrap();

    assert_eq!(registry.counter(Priority::Background).value(), 3);
    assert_eq!(registry.counter(Priority::Low).value(), 0);
}

#[test]
fn test_schedule_relative_waits_for_due_time() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Default).unwrap();

    let submitted = Instant::now();
    let handle = scheduler.schedule_relative((), Duration::from_millis(50), |_| Instant::now());
    let ran_at = handle.join_timeout(WAIT).unwrap();

    assert!(ran_at.duration_since(submitted) >= Duration::from_millis(50));
    assert_eq!(registry.counter(Priority::Default).value(), 1);
}

#[test]
fn test_schedule_relative_zero_delay_runs_immediately() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Default).unwrap();

    let handle = scheduler.schedule_relative("now", Duration::ZERO, |s| s.len());

    assert_eq!(handle.join_timeout(WAIT).unwrap(), 3);
    assert_eq!(registry.counter(Priority::Default).value(), 1);
}

#[test]
fn test_zero_delay_runs_no_later_than_schedule() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Default).unwrap();

    // Hold the serial context so both submissions queue up together.
    let (release_tx, release_rx) = bounded::<()>(0);
    let gate = scheduler.schedule((), move |_| {
        let _ = release_rx.recv();
    });

    let order = Arc::new(Mutex::new(Vec::new()));
    let relative_order = order.clone();
    let relative = scheduler.schedule_relative((), Duration::ZERO, move |_| {
        relative_order.lock().push("relative");
    });
    let immediate_order = order.clone();
    let immediate = scheduler.schedule((), move |_| {
        immediate_order.lock().push("immediate");
    });

    release_tx.send(()).unwrap();
    gate.join().unwrap();
    relative.join_timeout(WAIT).unwrap();
    immediate.join_timeout(WAIT).unwrap();

    assert_eq!(*order.lock(), vec!["relative", "immediate"]);
}

#[test]
fn test_periodic_threads_state_and_stops_on_cancel() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Low).unwrap();

    let (tx, rx) = unbounded();
    let token: Arc<OnceLock<CancellationHandle>> = Arc::new(OnceLock::new());
    let inner = token.clone();

    let handle = scheduler.schedule_periodic(1u32, Duration::ZERO, Duration::from_millis(20), move |n| {
        let _ = tx.send(n);
        if n == 2 {
            if let Some(handle) = inner.get() {
                handle.cancel();
            }
        }
        n + 1
    });
    token.set(handle.clone()).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);

    thread::sleep(Duration::from_millis(100));
    assert!(rx.try_recv().is_err());
    assert!(handle.is_cancelled());
    assert_eq!(registry.counter(Priority::Low).value(), 2);
}

#[test]
fn test_periodic_first_run_honours_start_delay() {
    let registry = registry();
    let scheduler = registry.async_scheduler(Priority::Highest).unwrap();

    let (tx, rx) = bounded(16);
    let started = Instant::now();
    let handle = scheduler.schedule_periodic((), Duration::from_millis(40), Duration::from_millis(10), move |s| {
        let _ = tx.try_send(Instant::now());
        s
    });

    let first = rx.recv_timeout(WAIT).unwrap();
    handle.cancel();

    assert!(first.duration_since(started) >= Duration::from_millis(40));
}

#[test]
fn test_ui_priority_routes_to_ui_thread() {
    let registry = registry();
    let sync = registry.scheduler(Priority::Ui).unwrap();
    let asynchronous = registry.async_scheduler(Priority::Ui).unwrap();

    assert_eq!(Priority::Ui.weight_class(), None);
    assert_eq!(sync.kind(), QueueKind::Ui);
    assert_eq!(asynchronous.kind(), QueueKind::Ui);

    let reg = registry.clone();
    assert!(sync.schedule((), move |_| reg.is_ui_thread()).join().unwrap());

    let reg = registry.clone();
    assert!(asynchronous.schedule((), move |_| reg.is_ui_thread()).join().unwrap());

    assert!(!registry.is_ui_thread());
    assert!(!sync.is_attached());
    assert_eq!(registry.counter(Priority::Ui).value(), 0);
}

#[test]
fn test_ui_delayed_and_periodic_work_is_not_counted() {
    let registry = registry();
    let scheduler = registry.async_scheduler(Priority::Ui).unwrap();

    scheduler
        .schedule_relative((), Duration::from_millis(10), |_| ())
        .join_timeout(WAIT)
        .unwrap();

    let (tx, rx) = unbounded();
    let ticks = scheduler.schedule_periodic(0u32, Duration::ZERO, Duration::from_millis(5), move |n| {
        let _ = tx.send(n);
        n + 1
    });
    rx.recv_timeout(WAIT).unwrap();
    rx.recv_timeout(WAIT).unwrap();
    ticks.cancel();

    assert_eq!(registry.counter(Priority::Ui).value(), 0);
}

#[test]
#[should_panic(expected = "no weight class")]
fn test_weighted_constructor_rejects_ui_priority() {
    let registry = registry();
    let sink: Arc<dyn MetricSink<Duration>> = registry.metrics();
    let _ = ObservedScheduler::<ElapsedProbe>::serial(&registry, Priority::Ui, sink);
}

#[test]
fn test_action_error_reaches_caller_unchanged() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::High).unwrap();

    let handle = scheduler.schedule((), |_| -> std::result::Result<(), String> { Err("disk full".into()) });

    assert_eq!(handle.join().unwrap(), Err("disk full".to_string()));
    assert_eq!(registry.counter(Priority::High).value(), 1);
}

#[test]
fn test_panicking_action_is_counted_and_reported() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Default).unwrap();

    let handle = scheduler.schedule((), |_| -> u32 { panic!("boom") });

    match handle.join() {
        Err(Error::TaskPanicked(msg)) => assert!(msg.contains("boom")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(registry.counter(Priority::Default).value(), 1);

    // The context keeps running after a panic.
    assert_eq!(scheduler.schedule(1, |x| x + 1).join().unwrap(), 2);
    assert_eq!(registry.counter(Priority::Default).value(), 2);
}

#[test]
fn test_panic_reaches_queue_handler_while_handle_is_held() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Low).unwrap();

    let handle = scheduler.schedule((), |_| -> u32 { panic!("still reported") });
    assert!(matches!(handle.join(), Err(Error::TaskPanicked(msg)) if msg == "still reported"));

    // FIFO: this runs only after the handler has dealt with the panic.
    scheduler.schedule((), |_| ()).join().unwrap();
    assert_eq!(scheduler.panic_count(), 1);
    assert_eq!(scheduler.pending_tasks(), 0);
}

const ABORT_CHILD_ENV: &str = "QUEUE_CENTRE_ABORT_CHILD";

#[test]
fn test_abort_strategy_terminates_process() {
    if std::env::var_os(ABORT_CHILD_ENV).is_some() {
        let config = Config::builder()
            .worker_threads(2)
            .panic_strategy(PanicStrategy::Abort)
            .build()
            .unwrap();
        let registry = SchedulerRegistry::new(config).unwrap();
        let scheduler = registry.scheduler(Priority::Default).unwrap();

        let handle = scheduler.schedule((), |_| -> u32 { panic!("fatal") });
        let _ = handle.join();
        // Only reachable if the process survived the panic.
        scheduler.schedule((), |_| ()).join().unwrap();
        return;
    }

    let status = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "test_abort_strategy_terminates_process", "--test-threads=1"])
        .env(ABORT_CHILD_ENV, "1")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();

    assert!(!status.success());
}

#[test]
fn test_cancel_before_start() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Low).unwrap();

    let (release_tx, release_rx) = bounded::<()>(0);
    let gate = scheduler.schedule((), move |_| {
        let _ = release_rx.recv();
    });
    let ran = Arc::new(AtomicUsize::new(0));
    let flag = ran.clone();
    let victim = scheduler.schedule((), move |_| {
        flag.fetch_add(1, Ordering::SeqCst);
    });

    victim.cancel();
    release_tx.send(()).unwrap();
    gate.join().unwrap();

    assert!(matches!(victim.join(), Err(Error::Cancelled)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(registry.counter(Priority::Low).value(), 1);
}

#[test]
fn test_cancel_delayed_task() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Default).unwrap();

    let handle = scheduler.schedule_relative((), Duration::from_millis(30), |_| ());
    handle.cancel();

    assert!(matches!(handle.join_timeout(WAIT), Err(Error::Cancelled)));
    assert_eq!(registry.counter(Priority::Default).value(), 0);
}

#[test]
fn test_detached_scheduler_runs_without_counting() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Highest).unwrap();

    scheduler.schedule((), |_| ()).join().unwrap();
    scheduler.detach();
    assert!(!scheduler.is_attached());

    assert_eq!(scheduler.schedule(5, |x| x * 3).join().unwrap(), 15);
    assert_eq!(registry.counter(Priority::Highest).value(), 1);
}

#[test]
fn test_dropped_scheduler_finishes_queued_work() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::Background).unwrap();

    let handles: Vec<_> = (0..10).map(|i| scheduler.schedule(i, |i| i)).collect();
    drop(scheduler);

    let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_record_probe_feeds_custom_sink() {
    let registry = registry();
    let buffer = Arc::new(RecordBuffer::new());
    let sink: Arc<dyn MetricSink<TaskRecord>> = buffer.clone();
    let scheduler = registry
        .scheduler_with_sink::<RecordProbe>(Priority::Low, sink)
        .unwrap();

    scheduler
        .schedule((), |_| thread::sleep(Duration::from_millis(5)))
        .join()
        .unwrap();

    let records = buffer.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].priority, Priority::Low);
    assert_eq!(records[0].outcome, Outcome::Completed);
    assert!(records[0].record.elapsed_ns >= 5_000_000);
    assert!(records[0]
        .record
        .thread
        .as_deref()
        .is_some_and(|name| name.contains("observed.utility")));
    assert_eq!(registry.counter(Priority::Low).value(), 1);
}

#[cfg(feature = "telemetry")]
#[test]
fn test_default_sink_aggregates_per_priority() {
    let registry = registry();
    let scheduler = registry.scheduler(Priority::High).unwrap();

    scheduler.schedule((), |_| ()).join().unwrap();
    let _ = scheduler.schedule((), |_| -> () { panic!("nope") }).join();

    let stats = registry.metrics().snapshot(Priority::High);
    assert_eq!(stats.tasks_executed, 2);
    assert_eq!(stats.tasks_panicked, 1);

    let snapshot = registry.metrics().snapshot_all();
    assert!(snapshot.get(Priority::Low).is_none());
    assert_eq!(snapshot.total_executed(), 2);
}

#[test]
fn test_global_registry_lifecycle() {
    let _ = queue_centre::uninstall_global();
    assert!(matches!(queue_centre::global(), Err(Error::NotInitialized)));

    let registry = registry();
    queue_centre::install_global(registry.clone()).unwrap();
    assert!(matches!(
        queue_centre::install_global(self::registry()),
        Err(Error::AlreadyInitialized)
    ));

    let global = queue_centre::global().unwrap();
    assert!(Arc::ptr_eq(&global, &registry));

    let removed = queue_centre::uninstall_global().unwrap();
    assert!(Arc::ptr_eq(&removed, &registry));
    assert!(queue_centre::global().is_err());
}
