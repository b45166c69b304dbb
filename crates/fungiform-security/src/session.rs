//! Session storage used by CSRF protection.
//!
//! fungiform does not manage sessions. Applications hand their own session
//! to a form through the [`Session`] trait; [`MemorySession`] is a simple
//! implementation for tests and single-process applications.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Key/value data of a session.
///
/// Serializes as the plain key/value object, so applications can persist it
/// in a cookie or a store of their choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData {
    pub data: HashMap<String, serde_json::Value>,
    /// Whether the data has been changed since it was loaded.
    #[serde(skip)]
    pub modified: bool,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.to_string(), value);
        self.modified = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        let result = self.data.remove(key);
        if result.is_some() {
            self.modified = true;
        }
        result
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A session shared between requests.
///
/// Methods take `&self` because a session is usually shared with the rest
/// of the request handling; implementations use interior mutability.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value);

    fn remove(&self, key: &str) -> Option<serde_json::Value>;

    /// Replaces the value under `key` with whatever `f` returns for the
    /// current one, without letting another writer interleave. Returning
    /// `None` removes the key.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<serde_json::Value>) -> Option<serde_json::Value>,
    );
}

/// An in-memory [`Session`].
///
/// ```
/// use fungiform_security::session::{MemorySession, Session};
///
/// let session = MemorySession::new();
/// session.set("user", serde_json::json!("jane"));
/// assert_eq!(session.get("user"), Some(serde_json::json!("jane")));
/// assert!(session.is_modified());
/// ```
#[derive(Debug, Default)]
pub struct MemorySession {
    inner: RwLock<SessionData>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: SessionData) -> Self {
        Self {
            inner: RwLock::new(data),
        }
    }

    /// A copy of the current data.
    pub fn snapshot(&self) -> SessionData {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_modified(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .modified
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(key, value);
    }

    fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<serde_json::Value>) -> Option<serde_json::Value>,
    ) {
        let mut data = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let current = data.get(key).cloned();
        match f(current.clone()) {
            Some(value) if current.as_ref() == Some(&value) => {}
            Some(value) => data.set(key, value),
            None => {
                data.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_data_tracks_modification() {
        let mut data = SessionData::new();
        assert!(data.is_empty());
        assert!(data.remove("missing").is_none());
        assert!(!data.modified);

        data.set("key", json!(1));
        assert!(data.modified);
        assert_eq!(data.get("key"), Some(&json!(1)));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_memory_session() {
        let session = MemorySession::new();
        assert_eq!(session.get("a"), None);
        session.set("a", json!([1, 2]));
        assert_eq!(session.get("a"), Some(json!([1, 2])));
        assert_eq!(session.remove("a"), Some(json!([1, 2])));
        assert!(session.snapshot().is_empty());
        assert!(session.is_modified());
    }

    #[test]
    fn test_update_replaces_and_removes() {
        let session = MemorySession::new();
        session.update("n", &mut |current| {
            assert_eq!(current, None);
            Some(json!(1))
        });
        session.update("n", &mut |current| {
            Some(json!(current.and_then(|v| v.as_i64()).unwrap_or(0) + 1))
        });
        assert_eq!(session.get("n"), Some(json!(2)));

        session.update("n", &mut |_| None);
        assert_eq!(session.get("n"), None);
    }

    #[test]
    fn test_update_returning_same_value_is_not_a_write() {
        let session = MemorySession::from_data(SessionData::new());
        session.update("n", &mut |current| current);
        assert!(!session.is_modified());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let session = std::sync::Arc::new(MemorySession::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = std::sync::Arc::clone(&session);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        session.update("count", &mut |current| {
                            Some(json!(current.and_then(|v| v.as_i64()).unwrap_or(0) + 1))
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(session.get("count"), Some(json!(1000)));
    }

    #[test]
    fn test_from_data() {
        let mut data = SessionData::new();
        data.data.insert("x".into(), json!("y"));
        let session = MemorySession::from_data(data);
        assert_eq!(session.get("x"), Some(json!("y")));
        assert!(!session.is_modified());
    }

    #[test]
    fn test_session_data_persists_as_plain_object() {
        let mut data = SessionData::new();
        data.set("user", json!("jane"));
        let stored = serde_json::to_value(&data).unwrap();
        assert_eq!(stored, json!({"user": "jane"}));

        let loaded: SessionData = serde_json::from_value(stored).unwrap();
        assert_eq!(loaded.get("user"), Some(&json!("jane")));
        assert!(!loaded.modified);
    }
}
