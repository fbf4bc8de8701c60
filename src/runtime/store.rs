//! Volatile, bounded storage for sessions and chat history
//!
//! Entries idle longer than the TTL are dropped, and the least recently used
//! entry is evicted once a map holds more than `max_entries` clients.

use super::traits::{HistoryStore, SessionStore};
use crate::history::ConversationHistory;
use crate::state_machine::{FlowState, VerificationSession};
use crate::subject::Subject;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Bounds applied to every client-keyed map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Idle time after which an entry is dropped
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_entries: 10_000,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    last_access: Instant,
}

/// HashMap with idle expiry and an LRU size cap
#[derive(Debug)]
pub struct BoundedMap<K, V> {
    entries: HashMap<K, Entry<V>>,
    policy: EvictionPolicy,
}

impl<K: Eq + Hash + Clone, V> BoundedMap<K, V> {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.last_access) >= self.policy.ttl
    }

    /// Live value for `key`, refreshing its access time
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let now = Instant::now();
        let expired = self.entries.get(key).is_some_and(|e| self.is_expired(e, now));
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.last_access = now;
        Some(&mut entry.value)
    }

    /// Live value for `key`, inserting `make()` if absent or expired
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let now = Instant::now();
        if self.entries.get(&key).is_some_and(|e| self.is_expired(e, now)) {
            self.entries.remove(&key);
        }
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }
        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            value: make(),
            last_access: now,
        });
        entry.last_access = now;
        &mut entry.value
    }

    pub fn insert(&mut self, key: K, value: V) {
        let now = Instant::now();
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }
        self.entries.insert(key, Entry { value, last_access: now });
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Number of stored entries, expired ones included until the next sweep
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep expired entries, then evict least recently used ones until a
    /// new key fits under `max_entries`
    fn make_room(&mut self, now: Instant) {
        let ttl = self.policy.ttl;
        self.entries.retain(|_, e| now.duration_since(e.last_access) < ttl);

        while !self.is_empty() && self.len() >= self.policy.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
    }
}

/// In-process storage used by the server
#[derive(Debug)]
pub struct MemoryStorage {
    sessions: Mutex<BoundedMap<String, VerificationSession>>,
    histories: Mutex<BoundedMap<(String, Subject), ConversationHistory>>,
    history_cap: usize,
}

impl MemoryStorage {
    pub fn new(policy: EvictionPolicy, history_cap: usize) -> Self {
        Self {
            sessions: Mutex::new(BoundedMap::new(policy)),
            histories: Mutex::new(BoundedMap::new(policy)),
            history_cap,
        }
    }
}

fn poisoned<T>(_: T) -> String {
    "storage lock poisoned".to_string()
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn load_session(&self, client_id: &str) -> Result<FlowState, String> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let session = sessions.get_mut(&client_id.to_string()).cloned();
        Ok(FlowState::from_session(session))
    }

    async fn save_session(&self, client_id: &str, session: &VerificationSession) -> Result<(), String> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.insert(client_id.to_string(), session.clone());
        tracing::debug!(client_id, stored_sessions = sessions.len(), "Session saved");
        Ok(())
    }

    async fn clear_session(&self, client_id: &str) -> Result<(), String> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.remove(&client_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStorage {
    async fn load_history(&self, client_id: &str, subject: Subject) -> Result<ConversationHistory, String> {
        let mut histories = self.histories.lock().map_err(poisoned)?;
        Ok(histories
            .get_mut(&(client_id.to_string(), subject))
            .cloned()
            .unwrap_or_else(|| ConversationHistory::new(self.history_cap)))
    }

    async fn record_exchange(
        &self,
        client_id: &str,
        subject: Subject,
        user: &str,
        assistant: &str,
    ) -> Result<(), String> {
        let mut histories = self.histories.lock().map_err(poisoned)?;
        let cap = self.history_cap;
        histories
            .get_or_insert_with((client_id.to_string(), subject), || ConversationHistory::new(cap))
            .record_exchange(user, assistant);
        Ok(())
    }
}
