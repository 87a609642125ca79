//! Serve command implementation
//!
//! This module implements the `testbed serve` command, which deploys a demo
//! echo application into the embedded container and keeps it running until
//! the process is interrupted.

use anyhow::{Context, Result};
use axum::response::{IntoResponse, Response};
use testbed_container::{
    EmbeddedContainerFactory, HarnessConfig, TestContainer, TestContainerFactory,
};
use testbed_descriptor::{
    async_trait, EventListener, Filter, FilterChain, FilterClass, FilterConfig, ListenerClass,
    RequestEvent, Servlet, ServletClass, ServletConfig, ServletContext, ServletError,
    ServletRequest, Session, WebAppDescriptor,
};
use tokio::signal;
use tracing::info;

/// Arguments for the serve command
pub struct ServeArgs {
    /// Host used in the base URI
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Context path of the application
    pub context_path: String,
    /// Servlet path below the context
    pub servlet_path: String,
    /// Context parameters as key=value
    pub params: Vec<String>,
    /// Servlet init parameters as key=value
    pub init_params: Vec<String>,
    /// Names of logging filters to install
    pub filters: Vec<String>,
}

/// Execute the serve command
pub async fn execute_serve_command(args: ServeArgs) -> Result<()> {
    let mut config = HarnessConfig::from_env().context("Invalid harness configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut builder = WebAppDescriptor::builder(ServletClass::of::<EchoServlet>())
        .context_path(args.context_path)
        .servlet_path(args.servlet_path)
        .listener(ListenerClass::of::<LoggingListener>());

    for param in &args.params {
        let (key, value) = parse_key_value(param)?;
        builder = builder.context_param(key, value);
    }
    for param in &args.init_params {
        let (key, value) = parse_key_value(param)?;
        builder = builder.init_param(key, value);
    }
    for name in &args.filters {
        builder = builder.filter(FilterClass::of::<LoggingFilter>(), name.clone());
    }

    let base_uri = config.base_uri()?;
    let mut container = EmbeddedContainerFactory
        .create(&base_uri, builder.build().into())
        .context("Failed to create test container")?;

    container
        .start()
        .await
        .context("Failed to start test container")?;

    println!("✅ Serving at {}", container.base_uri());
    println!("🔄 Press Ctrl+C to stop");
    wait_for_shutdown().await?;

    println!("\n🛑 Stopping...");
    container
        .stop()
        .await
        .context("Failed to stop test container")?;
    println!("✅ Stopped");
    Ok(())
}

/// Split a `key=value` argument
pub fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Invalid parameter '{}'. Expected format: key=value", raw))?;

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid parameter '{}': empty key", raw);
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Wait for Ctrl+C or, on unix, SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install signal handler")?;

        tokio::select! {
            result = signal::ctrl_c() => result.context("Failed to install Ctrl+C handler")?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;

    Ok(())
}

/// Reports what it saw of the request as JSON
#[derive(Default)]
struct EchoServlet {
    init_params: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl Servlet for EchoServlet {
    fn init(&mut self, config: &ServletConfig) -> Result<(), ServletError> {
        self.init_params = config
            .init_parameters()
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        Ok(())
    }

    async fn service(&self, request: ServletRequest) -> Response {
        let session = request.session(true).map(|s| s.id().to_string());
        let body = serde_json::json!({
            "method": request.method().as_str(),
            "path": request.path(),
            "context_path": request.context_path(),
            "servlet_path": request.servlet_path(),
            "path_info": request.path_info(),
            "filters": request.attribute("filters"),
            "session": session,
            "context_params": request.servlet_context().init_parameters(),
            "init_params": self.init_params,
        });
        axum::Json(body).into_response()
    }
}

/// Logs each request passing through it
#[derive(Default)]
struct LoggingFilter {
    name: String,
}

#[async_trait]
impl Filter for LoggingFilter {
    fn init(&mut self, config: &FilterConfig) -> Result<(), ServletError> {
        self.name = config.filter_name().to_string();
        Ok(())
    }

    async fn do_filter(&self, mut request: ServletRequest, chain: FilterChain) -> Response {
        info!("[{}] {} {}", self.name, request.method(), request.path());
        let trail = match request.attribute("filters") {
            Some(previous) => format!("{},{}", previous, self.name),
            None => self.name.clone(),
        };
        request.set_attribute("filters", trail);
        chain.proceed(request).await
    }
}

#[derive(Default)]
struct LoggingListener;

impl EventListener for LoggingListener {
    fn context_initialized(&self, context: &ServletContext) {
        info!("context '{}' initialized", context.context_path());
    }

    fn context_destroyed(&self, context: &ServletContext) {
        info!("context '{}' destroyed", context.context_path());
    }

    fn request_initialized(&self, event: &RequestEvent<'_>) {
        info!("request {} {}", event.method, event.uri);
    }

    fn session_created(&self, session: &Session) {
        info!("session {} created", session.id());
    }
}
