use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static PROCESS_STATE: OnceLock<Arc<ReadinessState>> = OnceLock::new();

/// Whether the startup callback has fired.
#[derive(Debug, Default)]
pub struct ReadinessState {
    fired: AtomicBool,
}

impl ReadinessState {
    /// Fresh, unfired state. Tests use this to stay isolated from the
    /// process-wide flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The single state shared by every monitor in this process.
    pub fn process() -> Arc<ReadinessState> {
        PROCESS_STATE
            .get_or_init(|| Arc::new(ReadinessState::new()))
            .clone()
    }

    /// Flip unfired to fired. Exactly one caller ever sees `true`.
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::ReadinessState;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn only_one_thread_wins() {
        let state = Arc::new(ReadinessState::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                let wins = wins.clone();
                thread::spawn(move || {
                    if state.try_fire() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(state.has_fired());
    }

    #[test]
    fn process_state_is_shared() {
        assert!(Arc::ptr_eq(
            &ReadinessState::process(),
            &ReadinessState::process()
        ));
    }
}
