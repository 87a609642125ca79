//! Context, request and session listeners

use http::{Method, Uri};

use crate::servlet::ServletContext;
use crate::session::Session;

/// A request entering or leaving the context
#[derive(Debug, Clone, Copy)]
pub struct RequestEvent<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub context: &'a ServletContext,
}

/// Lifecycle listener registered with a context.
///
/// Every callback defaults to doing nothing, so a listener only overrides
/// the events it cares about.
pub trait EventListener: Send + Sync + 'static {
    /// The server started and the context is about to accept requests
    fn context_initialized(&self, _context: &ServletContext) {}

    /// The server stopped
    fn context_destroyed(&self, _context: &ServletContext) {}

    fn request_initialized(&self, _event: &RequestEvent<'_>) {}

    fn request_destroyed(&self, _event: &RequestEvent<'_>) {}

    fn session_created(&self, _session: &Session) {}

    fn session_destroyed(&self, _session: &Session) {}
}
