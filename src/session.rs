//! Session values and the per-request session handle

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::CookieOptions;
use crate::error::SessionError;

/// Application data carried inside the session cookie.
///
/// Keys are kept ordered so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionValues {
    data: BTreeMap<String, Value>,
}

impl SessionValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from session data
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in session data.
    ///
    /// Fails with [`SessionError::SerializationError`] when the value has no
    /// JSON representation; the previous value for `key` is kept.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)
            .map_err(|e| SessionError::SerializationError(format!("session value {:?}: {}", key, e)))?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

struct SessionInner {
    name: String,
    values: RwLock<SessionValues>,
    options: RwLock<CookieOptions>,
    is_new: bool,
}

/// One named cookie-backed session for the current request.
///
/// `Session` is a handle: clones share the same values and options, and
/// [`Session::ptr_eq`] tells whether two handles are the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a new, empty session
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Self {
        Self::build(name.into(), SessionValues::default(), options, true)
    }

    /// A session restored from a cookie that decoded successfully
    pub(crate) fn restored(name: String, values: SessionValues, options: CookieOptions) -> Self {
        Self::build(name, values, options, false)
    }

    fn build(name: String, values: SessionValues, options: CookieOptions, is_new: bool) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                name,
                values: RwLock::new(values),
                options: RwLock::new(options),
                is_new,
            }),
        }
    }

    /// Cookie name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True when no valid cookie was found for this name on this request
    pub fn is_new(&self) -> bool {
        self.inner.is_new
    }

    /// Whether both handles refer to the same session
    pub fn ptr_eq(a: &Session, b: &Session) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Get a value from the session
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.inner.values.read().get(key)
    }

    /// Set a value in the session; see [`SessionValues::set`]
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        self.inner.values.write().set(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.values.read().contains(key)
    }

    /// Clear all session values
    pub fn clear(&self) {
        self.inner.values.write().clear();
    }

    /// Get a copy of the session values
    pub fn values(&self) -> SessionValues {
        self.inner.values.read().clone()
    }

    /// Replace all session values
    pub fn set_values(&self, values: SessionValues) {
        *self.inner.values.write() = values;
    }

    /// Get a copy of the cookie options
    pub fn options(&self) -> CookieOptions {
        self.inner.options.read().clone()
    }

    /// Replace the cookie options for this session only
    pub fn set_options(&self, options: CookieOptions) {
        *self.inner.options.write() = options;
    }

    /// Override the cookie max age in seconds for this session
    pub fn set_max_age(&self, seconds: i64) {
        self.inner.options.write().max_age = seconds;
    }

    /// Mark the cookie for deletion on the next save
    pub fn expire(&self) {
        self.set_max_age(-1);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values.read().is_empty()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.inner.name)
            .field("values", &*self.inner.values.read())
            .field("options", &*self.inner.options.read())
            .field("is_new", &self.inner.is_new)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_serialize_deterministically() {
        let mut a = SessionValues::new();
        a.set("zeta", 1).unwrap();
        a.set("alpha", "x").unwrap();
        let mut b = SessionValues::new();
        b.set("alpha", "x").unwrap();
        b.set("zeta", 1).unwrap();

        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"alpha":"x","zeta":1}"#);
        assert_eq!(json, serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_values_get_set_remove() {
        let mut values = SessionValues::new();
        values.set("user", "alice").unwrap();
        values.set("views", 3).unwrap();
        assert_eq!(values.get::<String>("user"), Some("alice".to_string()));
        assert_eq!(values.get::<i32>("views"), Some(3));
        assert_eq!(values.get::<i32>("user"), None);
        assert!(values.remove("user").is_some());
        assert!(!values.contains("user"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_session_clones_share_state() {
        let session = Session::new("session", CookieOptions::default());
        let other = session.clone();
        other.set("user", "bob").unwrap();
        other.expire();

        assert!(Session::ptr_eq(&session, &other));
        assert_eq!(session.get::<String>("user"), Some("bob".to_string()));
        assert_eq!(session.options().max_age, -1);
        assert!(session.is_new());
    }

    #[test]
    fn test_set_rejects_value_without_json_form() {
        let session = Session::new("session", CookieOptions::default());
        session.set("oidc_state", "pending").unwrap();

        // JSON object keys must be strings
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "nonce");
        let err = session.set("oidc_state", bad).unwrap_err();

        assert!(matches!(err, SessionError::SerializationError(_)));
        assert_eq!(session.get::<String>("oidc_state"), Some("pending".to_string()));
    }

    #[test]
    fn test_option_overrides_are_per_session() {
        let defaults = CookieOptions::default();
        let a = Session::new("a", defaults.clone());
        let b = Session::new("b", defaults.clone());
        a.set_max_age(10);
        assert_eq!(a.options().max_age, 10);
        assert_eq!(b.options().max_age, defaults.max_age);
        assert!(!Session::ptr_eq(&a, &b));
    }
}
