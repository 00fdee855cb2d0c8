//! Extension trait for Depot to easily access sessions

use salvo_core::{Depot, Request, Response};
use std::sync::Arc;

use crate::config::CookieOptions;
use crate::error::SessionError;
use crate::handler::{REGISTRY_KEY, STORE_KEY};
use crate::registry::Registry;
use crate::session::Session;
use crate::store::CookieStore;

/// Extension trait for Salvo's Depot to provide easy session access.
///
/// Requires a [`SessionHandler`](crate::SessionHandler) earlier in the chain.
pub trait SessionDepotExt {
    /// The cookie store installed by the session handler
    fn session_store(&self) -> Option<&Arc<CookieStore>>;

    /// This request's registry, if a session has been resolved yet
    fn session_registry(&self) -> Option<&Registry>;

    /// Resolve the session `name` for this request.
    ///
    /// Always yields a usable session. The error says why the request cookie
    /// was not used (tampered, expired, invalid name, no store installed);
    /// every call for the same name within a request returns the same
    /// session and the same error.
    fn session(&mut self, req: &Request, name: &str) -> (Session, Option<SessionError>);

    /// Write `session` into the response with the store's current codec
    fn save_session(&self, res: &mut Response, session: &Session) -> Result<(), SessionError>;
}

impl SessionDepotExt for Depot {
    fn session_store(&self) -> Option<&Arc<CookieStore>> {
        self.get::<Arc<CookieStore>>(STORE_KEY).ok()
    }

    fn session_registry(&self) -> Option<&Registry> {
        self.get::<Registry>(REGISTRY_KEY).ok()
    }

    fn session(&mut self, req: &Request, name: &str) -> (Session, Option<SessionError>) {
        let Some(store) = self.session_store().cloned() else {
            tracing::error!(cookie = name, "session requested but no SessionHandler is installed");
            return (
                Session::new(name, CookieOptions::default()),
                Some(SessionError::StoreNotInstalled),
            );
        };

        // Created on first access, dropped with the depot at the end of the request
        let mut registry = self.remove::<Registry>(REGISTRY_KEY).unwrap_or_default();
        let resolved = registry.get(&store, req, name);
        self.insert(REGISTRY_KEY, registry);
        resolved
    }

    fn save_session(&self, res: &mut Response, session: &Session) -> Result<(), SessionError> {
        let store = self.session_store().ok_or(SessionError::StoreNotInstalled)?;
        store.save(res, session).inspect_err(|e| {
            tracing::error!(cookie = session.name(), error = %e, "failed to save session");
        })
    }
}
