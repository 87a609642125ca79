//! In-memory session support for a servlet context

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use http::header::{HeaderMap, COOKIE};
use http::HeaderValue;
use rand::distributions::Alphanumeric;
use rand::Rng;
use testbed_descriptor::{EventListener, Session, SessionStore};
use tracing::debug;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "TESTBED_SESSION";

const SESSION_ID_LEN: usize = 32;

/// Session store of one context; notifies listeners on create and destroy.
///
/// Sessions never time out. They live until invalidated or until the
/// context stops, which bounds them to the lifetime of one server run.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl SessionManager {
    pub fn new(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            listeners,
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop one session
    pub fn invalidate(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match removed {
            Some(session) => {
                self.notify_destroyed(&session);
                true
            }
            None => false,
        }
    }

    /// Drop every session, as on shutdown
    pub fn invalidate_all(&self) {
        let drained: Vec<Session> = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect();

        for session in &drained {
            self.notify_destroyed(session);
        }
    }

    fn notify_destroyed(&self, session: &Session) {
        debug!("session destroyed = {}", session.id());
        for listener in self.listeners.iter().rev() {
            listener.session_destroyed(session);
        }
    }
}

impl SessionStore for SessionManager {
    fn find(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn create(&self) -> Session {
        let session = Session::new(generate_session_id());
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), session.clone());

        debug!("session created = {}", session.id());
        for listener in &self.listeners {
            listener.session_created(&session);
        }
        session
    }
}

fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Session id sent by the client, if any
pub fn requested_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` value for a new session scoped to the context path
pub fn session_cookie(id: &str, context_path: &str) -> Option<HeaderValue> {
    let path = if context_path.is_empty() { "/" } else { context_path };
    HeaderValue::from_str(&format!(
        "{}={}; Path={}; HttpOnly",
        SESSION_COOKIE, id, path
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl EventListener for Recorder {
        fn session_created(&self, session: &Session) {
            self.events
                .lock()
                .unwrap()
                .push(format!("created:{}", session.id()));
        }

        fn session_destroyed(&self, session: &Session) {
            self.events
                .lock()
                .unwrap()
                .push(format!("destroyed:{}", session.id()));
        }
    }

    #[test]
    fn test_create_and_find() {
        let manager = SessionManager::new(Vec::new());
        let session = manager.create();

        assert_eq!(session.id().len(), SESSION_ID_LEN);
        assert!(session.id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(manager.find(session.id()).is_some());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let manager = SessionManager::new(Vec::new());
        let a = manager.create();
        let b = manager.create();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_listeners_notified() {
        let recorder = Arc::new(Recorder::default());
        let manager = SessionManager::new(vec![recorder.clone() as Arc<dyn EventListener>]);

        let session = manager.create();
        assert!(manager.invalidate(session.id()));
        assert!(!manager.invalidate(session.id()));

        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                format!("created:{}", session.id()),
                format!("destroyed:{}", session.id())
            ]
        );
    }

    #[test]
    fn test_invalidate_all() {
        let manager = SessionManager::new(Vec::new());
        manager.create();
        manager.create();

        manager.invalidate_all();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_requested_session_id() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; TESTBED_SESSION=abc123; lang=en"),
        );
        assert_eq!(requested_session_id(&headers).as_deref(), Some("abc123"));

        assert_eq!(requested_session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_path() {
        let cookie = session_cookie("abc", "").unwrap();
        assert_eq!(cookie.to_str().unwrap(), "TESTBED_SESSION=abc; Path=/; HttpOnly");

        let cookie = session_cookie("abc", "/app").unwrap();
        assert_eq!(cookie.to_str().unwrap(), "TESTBED_SESSION=abc; Path=/app; HttpOnly");
    }
}
