use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use vendorlink_core::domain::chat::Message;

/// Process-wide conversation store, keyed by opaque session identifier.
///
/// The outer map lock is held only long enough to clone an entry handle;
/// each entry carries its own mutex, so overlapping turns for the same
/// identifier serialize while other sessions proceed. Idle sessions past
/// the TTL are evicted on the next store access, bounding memory without a
/// background task.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionEntry>>>>,
}

pub struct SessionEntry {
    messages: Vec<Message>,
    last_active: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self { messages: Vec::new(), last_active: Instant::now() }
    }

    /// Copy of the conversation so far, in append order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Appends a completed turn in one step. Callers build the full message
    /// set first so a cancelled turn leaves history untouched.
    pub fn commit_turn(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
        self.last_active = Instant::now();
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: Mutex::new(HashMap::new()) }
    }

    /// Fetches (or creates) the entry for `session_id`, evicting expired
    /// idle sessions along the way. Locking the returned entry serializes
    /// the turn.
    pub async fn checkout(&self, session_id: &str) -> Arc<Mutex<SessionEntry>> {
        let mut sessions = self.sessions.lock().await;

        // An entry whose lock is held has a turn in flight; never evict it.
        let ttl = self.ttl;
        sessions.retain(|_, entry| {
            entry.try_lock().map(|guard| guard.last_active.elapsed() <= ttl).unwrap_or(true)
        });

        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionEntry::new())))
            .clone();

        // Mark the entry live while the map lock is still held; a sweep
        // from a concurrent checkout must not evict it before the caller
        // takes the turn lock, or the turn would commit to an orphaned
        // entry. A held entry lock means a turn is in flight, which the
        // sweep already skips.
        if let Ok(mut guard) = entry.try_lock() {
            guard.last_active = Instant::now();
        }

        entry
    }

    /// Read-only history snapshot; empty for unknown identifiers.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let entry = {
            let sessions = self.sessions.lock().await;
            sessions.get(session_id).cloned()
        };
        match entry {
            Some(entry) => entry.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vendorlink_core::domain::chat::Message;

    use super::SessionStore;

    #[tokio::test]
    async fn history_is_empty_for_unknown_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.history("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn committed_turns_append_in_order() {
        let store = SessionStore::new(Duration::from_secs(60));
        let entry = store.checkout("u-1").await;
        entry.lock().await.commit_turn(vec![
            Message::user("hello"),
            Message::assistant("hi there"),
        ]);

        let history = store.history("u-1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "hi there");
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted_on_access() {
        let store = SessionStore::new(Duration::from_millis(10));
        let entry = store.checkout("stale").await;
        entry.lock().await.commit_turn(vec![Message::user("old")]);
        drop(entry);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Touching any session sweeps the idle one out.
        let _ = store.checkout("fresh").await;
        assert_eq!(store.session_count().await, 1);
        assert!(store.history("stale").await.is_empty());
    }

    #[tokio::test]
    async fn in_flight_sessions_survive_the_sweep() {
        let store = SessionStore::new(Duration::from_millis(10));
        let entry = store.checkout("busy").await;
        let guard = entry.lock().await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = store.checkout("other").await;

        drop(guard);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn checkout_shields_the_entry_from_a_concurrent_sweep() {
        let store = SessionStore::new(Duration::from_millis(100));
        let entry = store.checkout("slow").await;
        entry.lock().await.commit_turn(vec![Message::user("first")]);
        drop(entry);

        // Still within the TTL when handed out again; checkout marks the
        // entry live so the stale timestamp cannot linger.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let entry = store.checkout("slow").await;

        // Past the original timestamp's TTL by now; the sweep from another
        // session must leave the checked-out entry in place.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let _ = store.checkout("other").await;

        entry.lock().await.commit_turn(vec![Message::user("second")]);
        assert_eq!(store.history("slow").await.len(), 2);
    }

    #[tokio::test]
    async fn overlapping_turns_serialize_per_session() {
        let store = std::sync::Arc::new(SessionStore::new(Duration::from_secs(60)));

        let first = store.checkout("shared").await;
        let guard = first.lock().await;

        let store_clone = store.clone();
        let contender = tokio::spawn(async move {
            let entry = store_clone.checkout("shared").await;
            let mut entry = entry.lock().await;
            entry.commit_turn(vec![Message::user("second")]);
        });

        // The spawned turn cannot proceed until the first guard drops.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes");
        assert_eq!(store.history("shared").await.len(), 1);
    }
}
