use super::{Probe, ReadinessState};
use crate::bridge::panic_message;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type ReadyCallback = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
    pub probe_timeout: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Result of one [`ReadinessMonitor::notify_ready`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// This caller won and the callback completed.
    Fired,
    /// This caller won but the callback returned an error or panicked.
    CallbackFailed(String),
    /// Someone else already fired; nothing ran.
    AlreadyFired,
}

/// How a polling thread ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The host answered on `attempt` and this thread ran the callback.
    Fired { attempt: u32, callback: ReadyOutcome },
    /// Another detection path fired first.
    AlreadyFired,
    /// The host never answered.
    Exhausted { attempts: u32 },
}

/// Owns the startup callback and decides who may run it.
pub struct ReadinessMonitor {
    state: Arc<ReadinessState>,
    callback: Mutex<Option<ReadyCallback>>,
}

impl std::fmt::Debug for ReadinessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessMonitor")
            .field("fired", &self.state.has_fired())
            .finish()
    }
}

impl ReadinessMonitor {
    /// Monitor bound to `state`. Several monitors may share one state; the
    /// callback of whichever wins runs.
    pub fn new<F, E>(state: Arc<ReadinessState>, callback: F) -> Arc<Self>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let callback: ReadyCallback = Box::new(move || callback().map_err(|err| err.to_string()));
        Arc::new(Self {
            state,
            callback: Mutex::new(Some(callback)),
        })
    }

    /// Start polling against the process-wide state.
    pub fn start<P, F, E>(
        schedule: PollSchedule,
        probe: P,
        callback: F,
    ) -> std::io::Result<MonitorHandle>
    where
        P: Probe + 'static,
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        Self::new(ReadinessState::process(), callback).spawn(schedule, probe)
    }

    /// Spawn the polling thread and return immediately.
    pub fn spawn<P>(
        self: &Arc<Self>,
        schedule: PollSchedule,
        probe: P,
    ) -> std::io::Result<MonitorHandle>
    where
        P: Probe + 'static,
    {
        let monitor = self.clone();
        let thread = thread::Builder::new()
            .name("hostmcp-readiness".to_string())
            .spawn(move || monitor.poll(schedule, &probe))?;
        Ok(MonitorHandle {
            monitor: self.clone(),
            thread,
        })
    }

    pub fn state(&self) -> &Arc<ReadinessState> {
        &self.state
    }

    /// Report that the host is ready. Only the first caller across all
    /// detection paths runs the callback; it runs on the caller's thread.
    pub fn notify_ready(&self) -> ReadyOutcome {
        if !self.state.try_fire() {
            debug!("readiness already signalled; skipping callback");
            return ReadyOutcome::AlreadyFired;
        }
        let Some(callback) = self.callback.lock().take() else {
            return ReadyOutcome::AlreadyFired;
        };
        info!("host ready; running startup callback");
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(())) => ReadyOutcome::Fired,
            Ok(Err(err)) => {
                error!("startup callback failed (error={})", err);
                ReadyOutcome::CallbackFailed(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("startup callback panicked (error={})", message);
                ReadyOutcome::CallbackFailed(message)
            }
        }
    }

    fn poll(&self, schedule: PollSchedule, probe: &dyn Probe) -> MonitorOutcome {
        let target = probe.target();
        info!(
            "waiting for host (target={}, attempts={}, interval_ms={})",
            target,
            schedule.max_attempts,
            schedule.interval.as_millis()
        );
        for attempt in 1..=schedule.max_attempts {
            if self.state.has_fired() {
                debug!("readiness signalled elsewhere; stopping poll");
                return MonitorOutcome::AlreadyFired;
            }
            match probe.check(schedule.probe_timeout) {
                Ok(()) => {
                    info!("host answered (target={}, attempt={})", target, attempt);
                    return match self.notify_ready() {
                        ReadyOutcome::AlreadyFired => MonitorOutcome::AlreadyFired,
                        callback => MonitorOutcome::Fired { attempt, callback },
                    };
                }
                Err(err) => debug!(
                    "host not ready (target={}, attempt={}/{}, error={})",
                    target, attempt, schedule.max_attempts, err
                ),
            }
            if attempt < schedule.max_attempts {
                thread::sleep(schedule.interval);
            }
        }
        warn!(
            "host did not become ready; giving up (target={}, attempts={})",
            target, schedule.max_attempts
        );
        MonitorOutcome::Exhausted {
            attempts: schedule.max_attempts,
        }
    }
}

/// Handle to a running poll thread.
#[derive(Debug)]
pub struct MonitorHandle {
    monitor: Arc<ReadinessMonitor>,
    thread: JoinHandle<MonitorOutcome>,
}

impl MonitorHandle {
    pub fn monitor(&self) -> &Arc<ReadinessMonitor> {
        &self.monitor
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the poll thread. `None` if it panicked.
    pub fn join(self) -> Option<MonitorOutcome> {
        self.thread.join().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::ProbeFailure;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Fails until `ready_after` attempts have been made.
    struct ScriptedProbe {
        attempts: Arc<AtomicU32>,
        ready_after: Option<u32>,
    }

    impl Probe for ScriptedProbe {
        fn target(&self) -> String {
            "scripted".to_string()
        }

        fn check(&self, _timeout: Duration) -> Result<(), ProbeFailure> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match self.ready_after {
                Some(n) if attempt >= n => Ok(()),
                _ => Err(ProbeFailure::Connect("refused".to_string())),
            }
        }
    }

    fn fast_schedule(max_attempts: u32) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_millis(5),
            max_attempts,
            probe_timeout: Duration::from_millis(50),
        }
    }

    fn counting_monitor(
        state: Arc<ReadinessState>,
        runs: Arc<AtomicUsize>,
    ) -> Arc<ReadinessMonitor> {
        ReadinessMonitor::new(state, move || {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        })
    }

    #[test]
    fn fires_once_host_answers() {
        let runs = Arc::new(AtomicUsize::new(0));
        let monitor = counting_monitor(Arc::new(ReadinessState::new()), runs.clone());
        let attempts = Arc::new(AtomicU32::new(0));
        let probe = ScriptedProbe {
            attempts: attempts.clone(),
            ready_after: Some(3),
        };
        let outcome = monitor
            .spawn(fast_schedule(10), probe)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(
            outcome,
            MonitorOutcome::Fired {
                attempt: 3,
                callback: ReadyOutcome::Fired
            }
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausts_without_firing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let monitor = counting_monitor(Arc::new(ReadinessState::new()), runs.clone());
        let attempts = Arc::new(AtomicU32::new(0));
        let probe = ScriptedProbe {
            attempts: attempts.clone(),
            ready_after: None,
        };
        let outcome = monitor
            .spawn(fast_schedule(4), probe)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(outcome, MonitorOutcome::Exhausted { attempts: 4 });
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!monitor.state().has_fired());
    }

    #[test]
    fn concurrent_notifiers_run_callback_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let monitor = counting_monitor(Arc::new(ReadinessState::new()), runs.clone());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = monitor.clone();
                thread::spawn(move || monitor.notify_ready())
            })
            .collect();
        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect();
        let fired = outcomes
            .iter()
            .filter(|outcome| **outcome == ReadyOutcome::Fired)
            .count();
        assert_eq!(fired, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_panic_is_contained() {
        let monitor = ReadinessMonitor::new(Arc::new(ReadinessState::new()), || -> Result<(), String> {
            panic!("startup blew up")
        });
        match monitor.notify_ready() {
            ReadyOutcome::CallbackFailed(message) => assert!(message.contains("startup blew up")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(monitor.notify_ready(), ReadyOutcome::AlreadyFired);
    }

    #[test]
    fn callback_error_is_not_retried() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let monitor = ReadinessMonitor::new(Arc::new(ReadinessState::new()), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("bind failed")
        });
        assert_eq!(
            monitor.notify_ready(),
            ReadyOutcome::CallbackFailed("bind failed".to_string())
        );
        assert_eq!(monitor.notify_ready(), ReadyOutcome::AlreadyFired);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn poll_stops_when_fired_elsewhere() {
        let state = Arc::new(ReadinessState::new());
        assert!(state.try_fire());
        let runs = Arc::new(AtomicUsize::new(0));
        let monitor = counting_monitor(state, runs.clone());
        let probe = ScriptedProbe {
            attempts: Arc::new(AtomicU32::new(0)),
            ready_after: Some(1),
        };
        let outcome = monitor
            .spawn(fast_schedule(3), probe)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(outcome, MonitorOutcome::AlreadyFired);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
