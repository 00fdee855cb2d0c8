//! Per-request session registry
//!
//! A `Registry` belongs to exactly one request. It remembers every session
//! resolved during that request so that all handlers see the same
//! [`Session`] handle and the same decode outcome, and cookies are decoded
//! at most once.

use salvo_core::Request;
use std::collections::HashMap;

use crate::error::SessionError;
use crate::session::Session;
use crate::store::CookieStore;

/// Request-scoped cache of resolved sessions, keyed by cookie name.
///
/// Create one per inbound request and drop it with the request; it must
/// never be shared between requests.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<String, (Session, Option<SessionError>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session `name`, decoding the request cookie on first use.
    ///
    /// A session is always returned. The error, if any, says why the cookie
    /// could not be used; every later call for `name` returns the same
    /// session and the same error. Invalid cookie names get a fresh,
    /// uncached session and [`SessionError::InvalidCookieName`] without
    /// touching the codecs.
    pub fn get(&mut self, store: &CookieStore, req: &Request, name: &str) -> (Session, Option<SessionError>) {
        if let Err(e) = validate_cookie_name(name) {
            return (Session::new(name, store.options().clone()), Some(e));
        }
        if let Some((session, err)) = self.sessions.get(name) {
            tracing::trace!(cookie = name, "session already resolved for this request");
            return (session.clone(), err.clone());
        }
        let (session, err) = store.new_session(req, name);
        self.sessions.insert(name.to_string(), (session.clone(), err.clone()));
        (session, err)
    }

    /// Number of sessions resolved so far
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Check `name` against the RFC 6265 cookie-name grammar.
///
/// Only visible ASCII is allowed, minus the HTTP separators.
pub fn validate_cookie_name(name: &str) -> Result<(), SessionError> {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";

    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| (0x21..=0x7e).contains(&b) && !SEPARATORS.contains(&b));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidCookieName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, SecureCookie};
    use crate::session::SessionValues;
    use salvo_core::http::cookie::Cookie;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Wraps a codec and counts calls into it
    struct CountingCodec {
        inner: SecureCookie,
        calls: Arc<AtomicUsize>,
    }

    impl Codec for CountingCodec {
        fn encode(&self, name: &str, values: &SessionValues) -> Result<String, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(name, values)
        }

        fn decode(&self, name: &str, token: &str) -> Result<SessionValues, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(name, token)
        }
    }

    fn counting_store() -> (CookieStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let codec = CountingCodec {
            inner: SecureCookie::new(b"registry-test-hash-key-000000000", Some(&[4u8; 16][..])).unwrap(),
            calls: Arc::clone(&calls),
        };
        (CookieStore::new(vec![Box::new(codec)]).unwrap(), calls)
    }

    fn request_with_session(store: &CookieStore, user: &str) -> Request {
        let session = Session::new("session", store.options().clone());
        session.set("user", user).unwrap();
        let cookie = store.build_cookie(&session).unwrap();

        let mut req = Request::new();
        req.cookies_mut().add(Cookie::new("session", cookie.value().to_string()));
        req
    }

    #[test]
    fn test_same_session_within_request() {
        let (store, calls) = counting_store();
        let req = request_with_session(&store, "alice");
        calls.store(0, Ordering::SeqCst);

        let mut registry = Registry::new();
        let (first, first_err) = registry.get(&store, &req, "session");
        let (second, second_err) = store.get(&mut registry, &req, "session");

        assert!(first_err.is_none());
        assert!(second_err.is_none());
        assert!(Session::ptr_eq(&first, &second));
        assert_eq!(second.get::<String>("user"), Some("alice".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);

        // Mutations through one handle are visible through the other
        first.set("user", "mallory").unwrap();
        assert_eq!(second.get::<String>("user"), Some("mallory".to_string()));
    }

    #[test]
    fn test_same_error_within_request() {
        let (store, calls) = counting_store();
        let mut req = request_with_session(&store, "alice");
        let mut tampered = req.cookie("session").unwrap().value().to_string();
        tampered.insert(0, 'x');
        req.cookies_mut().add(Cookie::new("session", tampered));
        calls.store(0, Ordering::SeqCst);

        let mut registry = Registry::new();
        let (first, first_err) = registry.get(&store, &req, "session");
        let (second, second_err) = store.get(&mut registry, &req, "session");
        let (third, third_err) = registry.get(&store, &req, "session");

        assert!(first.is_new());
        assert!(first.is_empty());
        assert!(first_err.as_ref().is_some_and(SessionError::is_decode));
        assert_eq!(first_err, second_err);
        assert_eq!(second_err, third_err);
        assert!(Session::ptr_eq(&first, &second));
        assert!(Session::ptr_eq(&first, &third));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registries_are_isolated() {
        let (store, calls) = counting_store();
        let req_a = request_with_session(&store, "alice");
        let req_b = Request::new();
        calls.store(0, Ordering::SeqCst);

        let mut registry_a = Registry::new();
        let mut registry_b = Registry::new();
        let (a, _) = registry_a.get(&store, &req_a, "session");
        let (b, _) = registry_b.get(&store, &req_b, "session");

        assert!(!Session::ptr_eq(&a, &b));
        assert!(!a.is_new());
        assert!(b.is_new());
        assert_eq!(b.get::<String>("user"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_names_rejected_before_decoding() {
        let (store, calls) = counting_store();
        let req = request_with_session(&store, "alice");
        calls.store(0, Ordering::SeqCst);

        let mut registry = Registry::new();
        for name in ["", "bad name", "bad\"name", "bad\u{7}name", "tab\tname", "semi;colon", "caf\u{e9}"] {
            let (session, err) = registry.get(&store, &req, name);
            assert_eq!(err, Some(SessionError::InvalidCookieName(name.to_string())));
            assert!(session.is_new());
            assert!(session.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());

        let (_, err) = registry.get(&store, &req, "session");
        assert!(err.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate_cookie_name() {
        for name in ["session", "__Host-id", "a.b_c-d~e!#$%&'*+^`|"] {
            assert!(validate_cookie_name(name).is_ok(), "{}", name);
        }
    }
}
