//! Servlet context handler
//!
//! The handler is the routing scope bound to one context path. It is
//! configured while the container is built and, on every server start,
//! produces an [`ActiveContext`]: the initialised components that serve
//! requests until the server stops.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http::header::SET_COOKIE;
use http::StatusCode;
use testbed_descriptor::{
    DispatcherType, EventListener, Filter, FilterChain, RequestEvent, Servlet, ServletContext,
    ServletRequest, SessionBinding, SessionStore,
};
use tracing::{debug, info};

use crate::errors::ContainerError;
use crate::holder::{FilterHolder, FilterMapping, ServletHolder};
use crate::mapping::{normalize_context_path, strip_context, PathPattern};
use crate::session::{requested_session_id, session_cookie, SessionManager};

/// Routing context for one context path
pub struct ServletContextHandler {
    context_path: String,
    sessions: bool,
    init_params: BTreeMap<String, String>,
    listeners: Vec<Arc<dyn EventListener>>,
    servlets: Vec<(PathPattern, ServletHolder)>,
    filters: Vec<(FilterMapping, FilterHolder)>,
}

impl ServletContextHandler {
    /// Handler for the root context, without session support
    pub fn new() -> Self {
        Self {
            context_path: String::new(),
            sessions: false,
            init_params: BTreeMap::new(),
            listeners: Vec::new(),
            servlets: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Handler with session support enabled
    pub fn with_sessions() -> Self {
        Self {
            sessions: true,
            ..Self::new()
        }
    }

    pub fn set_context_path(&mut self, context_path: &str) {
        self.context_path = normalize_context_path(context_path);
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn sessions_enabled(&self) -> bool {
        self.sessions
    }

    /// Context init parameters, visible to every component
    pub fn init_params_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.init_params
    }

    pub fn add_event_listener(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(Arc::from(listener));
    }

    pub fn add_servlet(&mut self, holder: ServletHolder, pattern: &str) -> Result<(), ContainerError> {
        let pattern = PathPattern::parse(pattern)?;
        self.servlets.push((pattern, holder));
        Ok(())
    }

    pub fn add_filter(
        &mut self,
        holder: FilterHolder,
        pattern: &str,
        dispatches: &[DispatcherType],
    ) -> Result<(), ContainerError> {
        let mapping = FilterMapping::new(PathPattern::parse(pattern)?, dispatches);
        self.filters.push((mapping, holder));
        Ok(())
    }

    /// Initialise listeners, filters and servlets for a server start
    pub(crate) fn start(&mut self) -> Result<Arc<ActiveContext>, ContainerError> {
        let context = Arc::new(ServletContext::new(
            self.context_path.clone(),
            self.init_params.clone(),
        ));

        for listener in &self.listeners {
            listener.context_initialized(&context);
        }

        let mut filters = Vec::with_capacity(self.filters.len());
        for (mapping, holder) in &mut self.filters {
            filters.push((mapping.clone(), holder.start(&context)?));
        }

        let mut servlets = Vec::with_capacity(self.servlets.len());
        for (pattern, holder) in &mut self.servlets {
            servlets.push((pattern.clone(), holder.start(&context)?));
        }

        let sessions = self
            .sessions
            .then(|| Arc::new(SessionManager::new(self.listeners.clone())));

        info!(
            "Context '{}' started with {} servlet(s), {} filter(s)",
            self.context_path,
            servlets.len(),
            filters.len()
        );

        Ok(Arc::new(ActiveContext {
            context,
            listeners: self.listeners.clone(),
            servlets,
            filters,
            sessions,
            not_found: Arc::new(NotFound),
        }))
    }
}

impl Default for ServletContextHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Components of a started context
pub struct ActiveContext {
    context: Arc<ServletContext>,
    listeners: Vec<Arc<dyn EventListener>>,
    servlets: Vec<(PathPattern, Arc<dyn Servlet>)>,
    filters: Vec<(FilterMapping, Arc<dyn Filter>)>,
    sessions: Option<Arc<SessionManager>>,
    not_found: Arc<dyn Servlet>,
}

impl ActiveContext {
    pub fn servlet_context(&self) -> &Arc<ServletContext> {
        &self.context
    }

    pub fn sessions(&self) -> Option<&Arc<SessionManager>> {
        self.sessions.as_ref()
    }

    /// Router sending every request through [`ActiveContext::dispatch`]
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(dispatch_request)
            .with_state(Arc::clone(self))
    }

    /// Route one request through the filter chain to its servlet
    pub async fn dispatch(&self, request: Request) -> Response {
        let path = request.uri().path().to_string();
        let Some(in_context) = strip_context(self.context.context_path(), &path) else {
            debug!("no context for {}", path);
            return StatusCode::NOT_FOUND.into_response();
        };
        let in_context = in_context.to_string();

        let method = request.method().clone();
        let uri = request.uri().clone();
        self.notify_request(&method, &uri, true);
        let _scope = RequestScope {
            context: self,
            method,
            uri,
        };

        let binding = self.sessions.as_ref().map(|manager| {
            let store: Arc<dyn SessionStore> = manager.clone();
            Arc::new(SessionBinding::new(
                store,
                requested_session_id(request.headers()),
            ))
        });

        let (target, servlet_path, path_info) = match self.resolve_servlet(&in_context) {
            Some((servlet, servlet_path, path_info)) => (servlet, servlet_path, path_info),
            None => (Arc::clone(&self.not_found), String::new(), Some(in_context.clone())),
        };

        let dispatcher_type = DispatcherType::Request;
        let filters: Vec<Arc<dyn Filter>> = self
            .filters
            .iter()
            .filter(|(mapping, _)| mapping.applies_to(&in_context, dispatcher_type))
            .map(|(_, filter)| Arc::clone(filter))
            .collect();

        let mut servlet_request = ServletRequest::new(request, Arc::clone(&self.context))
            .with_paths(servlet_path, path_info)
            .with_dispatcher_type(dispatcher_type);
        if let Some(binding) = &binding {
            servlet_request = servlet_request.with_session(Arc::clone(binding));
        }

        let mut response = FilterChain::new(filters, target)
            .proceed(servlet_request)
            .await;

        if let Some(id) = binding.and_then(|binding| binding.created_session_id()) {
            if let Some(cookie) = session_cookie(&id, self.context.context_path()) {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
        }

        response
    }

    fn resolve_servlet(&self, path: &str) -> Option<(Arc<dyn Servlet>, String, Option<String>)> {
        self.servlets
            .iter()
            .filter_map(|(pattern, servlet)| {
                pattern
                    .matches(path)
                    .map(|m| (pattern.precedence(), servlet, m))
            })
            .max_by_key(|(precedence, _, _)| *precedence)
            .map(|(_, servlet, m)| (Arc::clone(servlet), m.servlet_path, m.path_info))
    }

    fn notify_request(&self, method: &http::Method, uri: &http::Uri, initialized: bool) {
        let event = RequestEvent {
            method,
            uri,
            context: &self.context,
        };
        if initialized {
            for listener in &self.listeners {
                listener.request_initialized(&event);
            }
        } else {
            for listener in self.listeners.iter().rev() {
                listener.request_destroyed(&event);
            }
        }
    }

    /// Destroy components and notify listeners, in reverse start order
    pub(crate) fn shutdown(&self) {
        for (_, servlet) in self.servlets.iter().rev() {
            servlet.destroy();
        }
        for (_, filter) in self.filters.iter().rev() {
            filter.destroy();
        }
        if let Some(sessions) = &self.sessions {
            sessions.invalidate_all();
        }
        for listener in self.listeners.iter().rev() {
            listener.context_destroyed(&self.context);
        }
        info!("Context '{}' stopped", self.context.context_path());
    }
}

/// Fires `request_destroyed` when dropped, including when the request
/// future is cancelled or unwinds.
struct RequestScope<'a> {
    context: &'a ActiveContext,
    method: http::Method,
    uri: http::Uri,
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        self.context.notify_request(&self.method, &self.uri, false);
    }
}

async fn dispatch_request(State(active): State<Arc<ActiveContext>>, request: Request) -> Response {
    active.dispatch(request).await
}

/// Answers requests no servlet is mapped to
struct NotFound;

#[async_trait]
impl Servlet for NotFound {
    async fn service(&self, _request: ServletRequest) -> Response {
        StatusCode::NOT_FOUND.into_response()
    }
}
