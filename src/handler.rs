//! Session middleware handler for Salvo

use salvo_core::prelude::*;
use std::sync::Arc;

use crate::store::CookieStore;

pub(crate) const STORE_KEY: &str = "salvo.secure_session.store";
pub(crate) const REGISTRY_KEY: &str = "salvo.secure_session.registry";

/// Makes a [`CookieStore`] available to every handler behind it.
///
/// The store is shared across requests; the per-request
/// [`Registry`](crate::Registry) is created in the request's depot the first
/// time a session is resolved (see [`SessionDepotExt`](crate::SessionDepotExt)).
/// Sessions are written back only when a handler saves them explicitly.
pub struct SessionHandler {
    store: Arc<CookieStore>,
}

impl SessionHandler {
    /// Create a new session handler
    pub fn new(store: CookieStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Create a session handler sharing an existing store
    pub fn with_store(store: Arc<CookieStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CookieStore> {
        &self.store
    }
}

impl Clone for SessionHandler {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl Handler for SessionHandler {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        depot.insert(STORE_KEY, Arc::clone(&self.store));
        ctrl.call_next(req, depot, res).await;
    }
}
