//! In-memory session table with idle expiry and a hard cap.

use listdash_core::session::Session;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

struct Entry {
    session: Session,
    last_seen: Instant,
    /// Monotonic touch counter; orders entries for eviction when instants tie.
    touched: u64,
}

pub struct SessionStore {
    entries: HashMap<Uuid, Entry>,
    ttl: Duration,
    capacity: usize,
    clock: u64,
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Live session for `id`, marking it as used. An expired entry is dropped and
    /// reported as absent.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        let now = Instant::now();
        let ttl = self.ttl;
        if self
            .entries
            .get(id)
            .is_some_and(|e| now.duration_since(e.last_seen) > ttl)
        {
            self.entries.remove(id);
            tracing::debug!(session_id = %id, "session expired");
            return None;
        }

        self.clock += 1;
        let entry = self.entries.get_mut(id)?;
        entry.last_seen = now;
        entry.touched = self.clock;
        Some(&mut entry.session)
    }

    /// Stores `session` under a fresh id after dropping idle sessions. At capacity the
    /// least recently used session makes room.
    pub fn insert(&mut self, session: Session) -> Uuid {
        let now = Instant::now();
        self.sweep(now);

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(id, _)| *id)
            else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::info!(session_id = %oldest, capacity = self.capacity, "evicted least recently used session");
        }

        self.clock += 1;
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Entry {
                session,
                last_seen: now,
                touched: self.clock,
            },
        );
        id
    }

    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.entries.remove(id).is_some()
    }

    fn sweep(&mut self, now: Instant) {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.last_seen) <= ttl);
        let expired = before - self.entries.len();
        if expired > 0 {
            tracing::info!(expired, live = self.entries.len(), "swept idle sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listdash_core::ingest::Source;

    fn fixture() -> Session {
        Session::open(Source::Fixture).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_on_access() {
        let mut store = SessionStore::new(Duration::from_secs(60), 10);
        let id = store.insert(fixture());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.get_mut(&id).is_some());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.get_mut(&id).is_some(), "access renews the idle window");

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get_mut(&id).is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_idle_sessions() {
        let mut store = SessionStore::new(Duration::from_secs(60), 10);
        store.insert(fixture());
        store.insert(fixture());

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = store.insert(fixture());

        assert_eq!(store.len(), 1);
        assert!(store.get_mut(&fresh).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_least_recently_used() {
        let mut store = SessionStore::new(Duration::from_secs(60), 2);
        let a = store.insert(fixture());
        let b = store.insert(fixture());
        assert!(store.get_mut(&a).is_some());

        let c = store.insert(fixture());

        assert_eq!(store.len(), 2);
        assert!(store.get_mut(&b).is_none());
        assert!(store.get_mut(&a).is_some());
        assert!(store.get_mut(&c).is_some());
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let mut store = SessionStore::new(Duration::from_secs(60), 2);
        let id = store.insert(fixture());
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
    }
}
