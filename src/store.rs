//! Answer storage consulted by verification.
//!
//! The generator writes the expected answer under a single key; the
//! verification side reads it back. `SessionStore` scopes that key per
//! browser session and expires idle entries.

use papaya::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key/value sink for the expected answer.
pub trait VerificationStore: Send + Sync {
    fn write(&self, key: &str, value: String);
    fn read(&self, key: &str) -> Option<String>;
}

/// Process-wide store with no expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the value held under `key`, if any.
    pub fn remove(&self, key: &str) {
        self.entries.pin().remove(key);
    }
}

impl VerificationStore for MemoryStore {
    fn write(&self, key: &str, value: String) {
        self.entries.pin().insert(key.to_string(), value);
    }

    fn read(&self, key: &str) -> Option<String> {
        self.entries.pin().get(key).cloned()
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    values: Vec<(String, String)>,
    touched: Instant,
}

/// Per-session values with idle expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, SessionEntry>,
    expiry: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(expiry: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            expiry,
        }
    }

    /// View of a single session usable as a `VerificationStore`.
    #[must_use]
    pub fn scope(self: &Arc<Self>, session_id: &str) -> SessionScope {
        SessionScope {
            store: Arc::clone(self),
            session_id: session_id.to_string(),
        }
    }

    /// Upserts `key` in the session, replacing an expired session wholesale.
    ///
    /// The read-modify-write runs inside the map's update so concurrent
    /// writers to one session never drop each other's keys.
    pub fn set(&self, session_id: &str, key: &str, value: &str) {
        self.sessions.pin().update_or_insert_with(
            session_id.to_string(),
            |entry| {
                let mut values = if self.is_expired(entry) {
                    Vec::new()
                } else {
                    entry.values.clone()
                };
                match values.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => value.clone_into(&mut slot.1),
                    None => values.push((key.to_string(), value.to_string())),
                }
                SessionEntry {
                    values,
                    touched: Instant::now(),
                }
            },
            || SessionEntry {
                values: vec![(key.to_string(), value.to_string())],
                touched: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, session_id: &str, key: &str) -> Option<String> {
        let sessions = self.sessions.pin();
        let entry = sessions.get(session_id)?;
        if self.is_expired(entry) {
            let _ = sessions.remove_if(session_id, |_, e| self.is_expired(e));
            return None;
        }
        entry
            .values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Removes every session idle longer than the expiry window.
    pub fn purge_expired(&self) -> usize {
        let sessions = self.sessions.pin();
        let stale: Vec<String> = sessions
            .iter()
            .filter(|(_, e)| self.is_expired(e))
            .map(|(k, _)| k.clone())
            .collect();

        let purged = stale
            .iter()
            .filter(|id| {
                matches!(
                    sessions.remove_if(*id, |_, e| self.is_expired(e)),
                    Ok(Some(_))
                )
            })
            .count();
        if purged > 0 {
            debug!(count = purged, "Purged expired sessions");
        }
        purged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.pin().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        entry.touched.elapsed() > self.expiry
    }
}

/// A `SessionStore` bound to one session id.
#[derive(Debug, Clone)]
pub struct SessionScope {
    store: Arc<SessionStore>,
    session_id: String,
}

impl SessionScope {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl VerificationStore for SessionScope {
    fn write(&self, key: &str, value: String) {
        self.store.set(&self.session_id, key, &value);
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(&self.session_id, key)
    }
}
