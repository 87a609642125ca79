//! Components shared by the container tests

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use testbed_descriptor::{
    async_trait, EventListener, Filter, FilterChain, FilterClass, FilterConfig, ListenerClass,
    RequestEvent, Servlet, ServletClass, ServletConfig, ServletContext, ServletError,
    ServletRequest, Session,
};

/// Reserve a port nothing is listening on
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Describes how a request arrived
#[derive(Default)]
pub struct EchoServlet {
    log: Option<EventLog>,
}

impl EchoServlet {
    /// Class whose instances record `servlet:destroy` in `log`
    pub fn class(log: &EventLog) -> ServletClass {
        let log = Arc::clone(log);
        ServletClass::new("EchoServlet", move || {
            Ok(Box::new(EchoServlet {
                log: Some(Arc::clone(&log)),
            }) as Box<dyn Servlet>)
        })
    }
}

#[async_trait]
impl Servlet for EchoServlet {
    async fn service(&self, request: ServletRequest) -> Response {
        format!(
            "context={} servlet={} info={} auth={}",
            request.context_path(),
            request.servlet_path(),
            request.path_info().unwrap_or("-"),
            request.attribute("auth").unwrap_or("-"),
        )
        .into_response()
    }

    fn destroy(&self) {
        if let Some(log) = &self.log {
            record(log, "servlet:destroy".to_string());
        }
    }
}

/// Requires a `mode` init parameter and reports it with every response
#[derive(Default)]
pub struct ModeServlet {
    mode: String,
}

#[async_trait]
impl Servlet for ModeServlet {
    fn init(&mut self, config: &ServletConfig) -> Result<(), ServletError> {
        self.mode = config
            .init_parameter("mode")
            .ok_or_else(|| ServletError::MissingParameter {
                name: "mode".to_string(),
            })?
            .to_string();
        Ok(())
    }

    async fn service(&self, request: ServletRequest) -> Response {
        format!(
            "mode={} info={} auth={} config={}",
            self.mode,
            request.path_info().unwrap_or("-"),
            request.attribute("auth").unwrap_or("-"),
            request
                .servlet_context()
                .init_parameter("config")
                .unwrap_or("-"),
        )
        .into_response()
    }
}

/// Counts visits in the session
#[derive(Default)]
pub struct VisitServlet;

#[async_trait]
impl Servlet for VisitServlet {
    async fn service(&self, request: ServletRequest) -> Response {
        let Some(session) = request.session(true) else {
            return (StatusCode::INTERNAL_SERVER_ERROR, "no session support").into_response();
        };
        let visits = session
            .attribute("visits")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
            + 1;
        session.set_attribute("visits", visits.to_string());
        format!("visits={}", visits).into_response()
    }
}

/// Tags requests with its own name; rejects requests carrying `x-deny`
#[derive(Default)]
pub struct AuthFilter {
    name: String,
    log: Option<EventLog>,
}

impl AuthFilter {
    /// Class whose instances record `<name>:destroy` in `log`
    pub fn class(log: &EventLog) -> FilterClass {
        let log = Arc::clone(log);
        FilterClass::new("AuthFilter", move || {
            Ok(Box::new(AuthFilter {
                name: String::new(),
                log: Some(Arc::clone(&log)),
            }) as Box<dyn Filter>)
        })
    }
}

#[async_trait]
impl Filter for AuthFilter {
    fn init(&mut self, config: &FilterConfig) -> Result<(), ServletError> {
        self.name = config.filter_name().to_string();
        Ok(())
    }

    async fn do_filter(&self, mut request: ServletRequest, chain: FilterChain) -> Response {
        if request.header("x-deny").is_some() {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        request.set_attribute("auth", self.name.clone());

        let mut response = chain.proceed(request).await;
        if let Ok(value) = self.name.parse() {
            response.headers_mut().append("x-filter", value);
        }
        response
    }

    fn destroy(&self) {
        if let Some(log) = &self.log {
            record(log, format!("{}:destroy", self.name));
        }
    }
}

/// Echoes its `level` init parameter in an `x-level` response header
#[derive(Default)]
pub struct LevelFilter {
    level: String,
}

#[async_trait]
impl Filter for LevelFilter {
    fn init(&mut self, config: &FilterConfig) -> Result<(), ServletError> {
        let level = config
            .init_parameter("level")
            .ok_or_else(|| ServletError::MissingParameter {
                name: "level".to_string(),
            })?;
        if !matches!(level, "low" | "high") {
            return Err(ServletError::InvalidParameter {
                name: "level".to_string(),
                reason: format!("expected low or high, got '{}'", level),
            });
        }
        self.level = level.to_string();
        Ok(())
    }

    async fn do_filter(&self, request: ServletRequest, chain: FilterChain) -> Response {
        let mut response = chain.proceed(request).await;
        if let Ok(value) = self.level.parse() {
            response.headers_mut().insert("x-level", value);
        }
        response
    }
}

/// Shared, ordered record of listener callbacks
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub struct RecordingListener {
    tag: &'static str,
    log: EventLog,
}

impl RecordingListener {
    /// Class whose instances append `<tag>:<event>` to `log`
    pub fn class(tag: &'static str, log: &EventLog) -> ListenerClass {
        let log = Arc::clone(log);
        ListenerClass::new(format!("RecordingListener[{}]", tag), move || {
            Ok(Box::new(RecordingListener {
                tag,
                log: Arc::clone(&log),
            }) as Box<dyn EventListener>)
        })
    }

    fn record(&self, event: &str) {
        record(&self.log, format!("{}:{}", self.tag, event));
    }
}

impl EventListener for RecordingListener {
    fn context_initialized(&self, _context: &ServletContext) {
        self.record("context-initialized");
    }

    fn context_destroyed(&self, _context: &ServletContext) {
        self.record("context-destroyed");
    }

    fn request_initialized(&self, event: &RequestEvent<'_>) {
        self.record(&format!("request-initialized {}", event.uri.path()));
    }

    fn request_destroyed(&self, event: &RequestEvent<'_>) {
        self.record(&format!("request-destroyed {}", event.uri.path()));
    }

    fn session_created(&self, _session: &Session) {
        self.record("session-created");
    }

    fn session_destroyed(&self, _session: &Session) {
        self.record("session-destroyed");
    }
}

fn record(log: &EventLog, entry: String) {
    log.lock().unwrap().push(entry);
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
