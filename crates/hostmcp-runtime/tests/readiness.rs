use hostmcp_runtime::{
    MonitorOutcome, PollSchedule, ReadinessMonitor, ReadinessState, ReadyOutcome, TcpProbe,
};
use pretty_assertions::assert_eq;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn schedule(max_attempts: u32) -> PollSchedule {
    PollSchedule {
        interval: Duration::from_millis(20),
        max_attempts,
        probe_timeout: Duration::from_millis(200),
    }
}

fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    addr.to_string()
}

#[test]
fn concurrent_monitors_fire_one_callback() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let state = Arc::new(ReadinessState::new());
    let runs = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let runs = runs.clone();
            let monitor = ReadinessMonitor::new(state.clone(), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            });
            monitor
                .spawn(schedule(5), TcpProbe::new(addr.clone()))
                .expect("spawn")
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();
    let fired = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, MonitorOutcome::Fired { .. }))
        .count();
    assert_eq!(fired, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn unreachable_host_exhausts_attempts() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let monitor = ReadinessMonitor::new(Arc::new(ReadinessState::new()), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<(), String>(())
    });
    let outcome = monitor
        .spawn(schedule(3), TcpProbe::new(closed_port()))
        .expect("spawn")
        .join()
        .expect("join");
    assert_eq!(outcome, MonitorOutcome::Exhausted { attempts: 3 });
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn host_coming_up_late_is_detected() {
    let addr = closed_port();
    let state = Arc::new(ReadinessState::new());
    let monitor = ReadinessMonitor::new(state, || Ok::<(), String>(()));
    let handle = monitor
        .spawn(schedule(100), TcpProbe::new(addr.clone()))
        .expect("spawn");

    thread::sleep(Duration::from_millis(100));
    let _listener = TcpListener::bind(&addr).expect("rebind");

    match handle.join().expect("join") {
        MonitorOutcome::Fired { attempt, callback } => {
            assert!(attempt > 1);
            assert_eq!(callback, ReadyOutcome::Fired);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
