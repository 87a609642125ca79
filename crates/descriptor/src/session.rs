//! HTTP sessions
//!
//! The container owns the session store; a request only sees a
//! [`SessionBinding`], which resolves the session named by the request's
//! cookie and remembers whether a new one had to be created.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A server-side session with string attributes
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    attributes: Arc<RwLock<HashMap<String, String>>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
}

/// Storage backing session support in a context
pub trait SessionStore: Send + Sync {
    /// Look up a live session
    fn find(&self, id: &str) -> Option<Session>;

    /// Start a new session
    fn create(&self) -> Session;
}

#[derive(Default)]
struct BindingState {
    current: Option<Session>,
    created: bool,
}

/// Per-request view of the session store
pub struct SessionBinding {
    store: Arc<dyn SessionStore>,
    requested_id: Option<String>,
    state: Mutex<BindingState>,
}

impl SessionBinding {
    /// Bind `store` to a request that carried `requested_id` in its cookie
    pub fn new(store: Arc<dyn SessionStore>, requested_id: Option<String>) -> Self {
        Self {
            store,
            requested_id,
            state: Mutex::new(BindingState::default()),
        }
    }

    /// Resolve the request's session, creating one if asked to
    pub fn session(&self, create: bool) -> Option<Session> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = &state.current {
            return Some(session.clone());
        }

        if let Some(session) = self.requested_id.as_deref().and_then(|id| self.store.find(id)) {
            state.current = Some(session.clone());
            return Some(session);
        }

        if !create {
            return None;
        }

        let session = self.store.create();
        state.current = Some(session.clone());
        state.created = true;
        Some(session)
    }

    /// Id of the session created while handling this request, if any
    pub fn created_session_id(&self) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.created {
            return None;
        }
        state.current.as_ref().map(|session| session.id().to_string())
    }
}

impl fmt::Debug for SessionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBinding")
            .field("requested_id", &self.requested_id)
            .finish_non_exhaustive()
    }
}
