//! Servlet API
//!
//! The servlet is the request handler at the end of the filter chain. It is
//! built from its class by the container, initialised with a
//! [`ServletConfig`] when the server starts and destroyed when it stops.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Request;
use axum::response::Response;
use http::{HeaderMap, Method, Uri};

use crate::descriptor::DispatcherType;
use crate::errors::{BodyError, ServletError};
use crate::session::{Session, SessionBinding};

/// Largest request body [`ServletRequest::body`] will buffer
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Primary request handler of a web application
#[async_trait]
pub trait Servlet: Send + Sync + 'static {
    /// Called once per server start, before the first request
    fn init(&mut self, _config: &ServletConfig) -> Result<(), ServletError> {
        Ok(())
    }

    /// Handle one request
    async fn service(&self, request: ServletRequest) -> Response;

    /// Called once when the server stops
    fn destroy(&self) {}
}

/// Shared state of one routing context
#[derive(Debug)]
pub struct ServletContext {
    context_path: String,
    init_params: BTreeMap<String, String>,
    attributes: RwLock<HashMap<String, String>>,
}

impl ServletContext {
    /// Create a context for the given path and init parameters
    pub fn new(context_path: impl Into<String>, init_params: BTreeMap<String, String>) -> Self {
        Self {
            context_path: context_path.into(),
            init_params,
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// Context path, empty for the root context
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Look up a context parameter
    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    /// All context parameters
    pub fn init_parameters(&self) -> &BTreeMap<String, String> {
        &self.init_params
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
}

/// Configuration handed to a servlet's `init`
#[derive(Debug, Clone)]
pub struct ServletConfig {
    servlet_name: String,
    init_params: BTreeMap<String, String>,
    context: Arc<ServletContext>,
}

impl ServletConfig {
    pub fn new(
        servlet_name: impl Into<String>,
        init_params: BTreeMap<String, String>,
        context: Arc<ServletContext>,
    ) -> Self {
        Self {
            servlet_name: servlet_name.into(),
            init_params,
            context,
        }
    }

    pub fn servlet_name(&self) -> &str {
        &self.servlet_name
    }

    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    pub fn init_parameters(&self) -> &BTreeMap<String, String> {
        &self.init_params
    }

    pub fn servlet_context(&self) -> &Arc<ServletContext> {
        &self.context
    }
}

/// An HTTP request as seen by filters and the servlet
#[derive(Debug)]
pub struct ServletRequest {
    inner: Request,
    context: Arc<ServletContext>,
    servlet_path: String,
    path_info: Option<String>,
    dispatcher_type: DispatcherType,
    attributes: HashMap<String, String>,
    session: Option<Arc<SessionBinding>>,
}

impl ServletRequest {
    /// Wrap a raw request dispatched inside `context`
    pub fn new(inner: Request, context: Arc<ServletContext>) -> Self {
        Self {
            inner,
            context,
            servlet_path: String::new(),
            path_info: None,
            dispatcher_type: DispatcherType::Request,
            attributes: HashMap::new(),
            session: None,
        }
    }

    /// Set the servlet path and path info resolved by the mapping
    pub fn with_paths(mut self, servlet_path: impl Into<String>, path_info: Option<String>) -> Self {
        self.servlet_path = servlet_path.into();
        self.path_info = path_info;
        self
    }

    pub fn with_dispatcher_type(mut self, dispatcher_type: DispatcherType) -> Self {
        self.dispatcher_type = dispatcher_type;
        self
    }

    /// Attach session support
    pub fn with_session(mut self, binding: Arc<SessionBinding>) -> Self {
        self.session = Some(binding);
        self
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Full request path, including the context path
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Header value, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.inner.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn context_path(&self) -> &str {
        self.context.context_path()
    }

    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    pub fn path_info(&self) -> Option<&str> {
        self.path_info.as_deref()
    }

    pub fn dispatcher_type(&self) -> DispatcherType {
        self.dispatcher_type
    }

    pub fn servlet_context(&self) -> &Arc<ServletContext> {
        &self.context
    }

    /// Request-scoped attribute, typically set by a filter
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Current session; with `create` a new one is started when none exists.
    ///
    /// Always `None` when the context has no session support.
    pub fn session(&self, create: bool) -> Option<Session> {
        self.session.as_ref()?.session(create)
    }

    pub fn inner(&self) -> &Request {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut Request {
        &mut self.inner
    }

    pub fn into_inner(self) -> Request {
        self.inner
    }

    /// Buffer the request body, up to [`MAX_BODY_SIZE`]
    pub async fn body(self) -> Result<Bytes, BodyError> {
        let bytes = axum::body::to_bytes(self.inner.into_body(), MAX_BODY_SIZE).await?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn context() -> Arc<ServletContext> {
        let mut params = BTreeMap::new();
        params.insert("config".to_string(), "test.xml".to_string());
        Arc::new(ServletContext::new("/app", params))
    }

    #[test]
    fn test_context_params_and_attributes() {
        let ctx = context();
        assert_eq!(ctx.context_path(), "/app");
        assert_eq!(ctx.init_parameter("config"), Some("test.xml"));
        assert_eq!(ctx.init_parameter("missing"), None);

        ctx.set_attribute("started", "yes");
        assert_eq!(ctx.attribute("started").as_deref(), Some("yes"));
    }

    #[test]
    fn test_request_accessors() {
        let raw = Request::builder()
            .method(Method::POST)
            .uri("/app/api/users?name=J%C3%BCrgen&x=1")
            .header("x-token", "abc")
            .body(Body::empty())
            .unwrap();

        let mut request =
            ServletRequest::new(raw, context()).with_paths("/api", Some("/users".to_string()));
        request.set_attribute("user", "admin");

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/app/api/users");
        assert_eq!(request.context_path(), "/app");
        assert_eq!(request.servlet_path(), "/api");
        assert_eq!(request.path_info(), Some("/users"));
        assert_eq!(request.header("x-token"), Some("abc"));
        assert_eq!(request.query_param("name").as_deref(), Some("Jürgen"));
        assert_eq!(request.query_param("missing"), None);
        assert_eq!(request.attribute("user"), Some("admin"));
        assert_eq!(request.dispatcher_type(), DispatcherType::Request);

        let forwarded = request.with_dispatcher_type(DispatcherType::Forward);
        assert_eq!(forwarded.dispatcher_type(), DispatcherType::Forward);
    }

    #[test]
    fn test_session_absent_without_support() {
        let raw = Request::builder().uri("/").body(Body::empty()).unwrap();
        let request = ServletRequest::new(raw, context());
        assert!(request.session(true).is_none());
    }

    #[tokio::test]
    async fn test_body_is_buffered() {
        let raw = Request::builder()
            .uri("/")
            .body(Body::from("payload"))
            .unwrap();
        let request = ServletRequest::new(raw, context());

        let body = request.body().await.unwrap();
        assert_eq!(&body[..], b"payload");
    }
}
