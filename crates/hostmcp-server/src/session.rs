use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Live transport sessions: streamable-HTTP ids and SSE channels.
///
/// Streamable-HTTP sessions idle for longer than `idle` are dropped the
/// next time the store is touched. SSE sessions live as long as their
/// event stream.
#[derive(Debug)]
pub(crate) struct SessionStore {
    idle: Duration,
    http: Mutex<HashMap<String, Instant>>,
    sse: Mutex<HashMap<String, UnboundedSender<String>>>,
}

impl SessionStore {
    pub(crate) fn new(idle: Duration) -> Self {
        Self {
            idle,
            http: Mutex::new(HashMap::new()),
            sse: Mutex::new(HashMap::new()),
        }
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, Instant>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, seen| now.duration_since(*seen) < self.idle);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("idle sessions evicted (transport=http, count={})", evicted);
        }
    }

    pub(crate) fn open_http(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        debug!("session opened (transport=http, id={})", id);
        let now = Instant::now();
        let mut sessions = self.http.lock();
        self.evict_idle(&mut sessions, now);
        sessions.insert(id.clone(), now);
        id
    }

    /// Whether `id` is live. A live session counts as used.
    pub(crate) fn has_http(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut sessions = self.http.lock();
        self.evict_idle(&mut sessions, now);
        match sessions.get_mut(id) {
            Some(seen) => {
                *seen = now;
                true
            }
            None => false,
        }
    }

    pub(crate) fn close_http(&self, id: &str) -> bool {
        let mut sessions = self.http.lock();
        self.evict_idle(&mut sessions, Instant::now());
        let removed = sessions.remove(id).is_some();
        if removed {
            debug!("session closed (transport=http, id={})", id);
        }
        removed
    }

    pub(crate) fn open_sse(&self) -> (String, UnboundedReceiver<String>) {
        let id = Uuid::new_v4().simple().to_string();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sse.lock().insert(id.clone(), sender);
        debug!("session opened (transport=sse, id={})", id);
        (id, receiver)
    }

    pub(crate) fn sse_sender(&self, id: &str) -> Option<UnboundedSender<String>> {
        self.sse.lock().get(id).cloned()
    }

    pub(crate) fn close_sse(&self, id: &str) {
        if self.sse.lock().remove(id).is_some() {
            debug!("session closed (transport=sse, id={})", id);
        }
    }
}

/// Closes an SSE session when its event stream is dropped.
pub(crate) struct SseGuard {
    pub(crate) sessions: Arc<SessionStore>,
    pub(crate) id: String,
}

impl Drop for SseGuard {
    fn drop(&mut self) {
        self.sessions.close_sse(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn http_sessions_open_and_close() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.open_http();
        assert!(store.has_http(&id));
        assert!(store.close_http(&id));
        assert!(!store.has_http(&id));
        assert!(!store.close_http(&id));
    }

    #[test]
    fn idle_http_sessions_are_evicted() {
        let store = SessionStore::new(Duration::from_millis(50));
        let stale = store.open_http();
        std::thread::sleep(Duration::from_millis(120));
        let fresh = store.open_http();
        assert!(!store.has_http(&stale));
        assert!(store.has_http(&fresh));
        assert_eq!(store.http.lock().len(), 1);
    }

    #[test]
    fn use_keeps_a_session_alive() {
        let store = SessionStore::new(Duration::from_millis(300));
        let id = store.open_http();
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(100));
            assert!(store.has_http(&id));
        }
    }

    #[test]
    fn dropping_guard_closes_sse_session() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let (id, _receiver) = store.open_sse();
        assert!(store.sse_sender(&id).is_some());
        drop(SseGuard {
            sessions: store.clone(),
            id: id.clone(),
        });
        assert!(store.sse_sender(&id).is_none());
    }
}
