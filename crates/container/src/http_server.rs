//! Embedded HTTP server
//!
//! Binds a port on start, serves the attached context handler from a
//! background task and shuts down gracefully on stop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{ActiveContext, ServletContextHandler};
use crate::errors::ContainerError;

/// Address the embedded server listens on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, all interfaces by default
    pub host: IpAddr,
    /// Port to bind; 0 picks a free port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Listen on `port` on all interfaces
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    active: Option<Arc<ActiveContext>>,
}

/// An embedded HTTP server with at most one context handler
pub struct HttpServer {
    config: ServerConfig,
    handler: Option<ServletContextHandler>,
    running: Option<RunningServer>,
}

impl HttpServer {
    /// Creates a new [`HttpServer`] instance from the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            handler: None,
            running: None,
        }
    }

    /// Access the configuration associated with this server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn set_handler(&mut self, handler: ServletContextHandler) {
        self.handler = Some(handler);
    }

    pub fn handler(&self) -> Option<&ServletContextHandler> {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut ServletContextHandler> {
        self.handler.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address actually bound while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Bind the port and start serving. Starting a running server does nothing.
    pub async fn start(&mut self) -> Result<(), ContainerError> {
        if self.running.is_some() {
            warn!("Server already running, ignoring start");
            return Ok(());
        }

        let addr = SocketAddr::new(self.config.host, self.config.port);
        debug!("binding {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ContainerError::lifecycle("start", e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ContainerError::lifecycle("start", e))?;

        let (router, active) = match self.handler.as_mut() {
            Some(handler) => {
                let active = handler.start()?;
                (active.router(), Some(active))
            }
            None => (Router::new(), None),
        };

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!("Server listening on {}", local_addr);
        self.running = Some(RunningServer {
            local_addr,
            shutdown,
            task,
            active,
        });
        Ok(())
    }

    /// Stop serving and release the port. Stopping a server that is not
    /// running does nothing.
    pub async fn stop(&mut self) -> Result<(), ContainerError> {
        let Some(running) = self.running.take() else {
            warn!("Server not running, ignoring stop");
            return Ok(());
        };

        // The receiver is gone if the serve task already ended
        let _ = running.shutdown.send(());
        let outcome = running.task.await;

        if let Some(active) = running.active {
            active.shutdown();
        }
        info!("Server on {} stopped", running.local_addr);

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ContainerError::lifecycle("stop", e)),
            Err(e) => Err(ContainerError::lifecycle("stop", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::ServletHolder;
    use crate::test_support::{free_port, EchoServlet, ModeServlet};
    use testbed_descriptor::ServletClass;

    fn echo_handler() -> ServletContextHandler {
        let mut handler = ServletContextHandler::new();
        handler
            .add_servlet(ServletHolder::new(ServletClass::of::<EchoServlet>()).unwrap(), "/*")
            .unwrap();
        handler
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.host.is_unspecified());
        assert_eq!(ServerConfig::with_port(9998).port, 9998);
    }

    #[tokio::test]
    async fn test_start_serve_stop() {
        let port = free_port();
        let mut server = HttpServer::new(ServerConfig::with_port(port));
        server.set_handler(echo_handler());

        server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.config().port, port);
        assert_eq!(server.local_addr().unwrap().port(), port);

        let url = format!("http://127.0.0.1:{}/hello", port);
        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "context= servlet= info=/hello auth=-");

        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert!(reqwest::get(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_handler_reconfigured_before_start() {
        let mut server = HttpServer::new(ServerConfig::with_port(0));
        assert!(server.handler().is_none());
        server.set_handler(echo_handler());
        server.handler_mut().unwrap().set_context_path("/ctx");
        assert_eq!(server.handler().unwrap().context_path(), "/ctx");

        server.start().await.unwrap();
        let port = server.local_addr().unwrap().port();
        let body = reqwest::get(format!("http://127.0.0.1:{}/ctx/hello", port))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "context=/ctx servlet= info=/hello auth=-");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_twice_and_stop_twice_are_noops() {
        let mut server = HttpServer::new(ServerConfig::with_port(0));
        server.set_handler(echo_handler());

        server.stop().await.unwrap();
        server.start().await.unwrap();
        let addr = server.local_addr().unwrap();
        server.start().await.unwrap();
        assert_eq!(server.local_addr(), Some(addr));

        server.stop().await.unwrap();
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let port = free_port();
        let mut server = HttpServer::new(ServerConfig::with_port(port));
        server.set_handler(echo_handler());

        server.start().await.unwrap();
        server.stop().await.unwrap();
        server.start().await.unwrap();

        let url = format!("http://127.0.0.1:{}/again", port);
        assert!(reqwest::get(&url).await.unwrap().status().is_success());
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_port_in_use_fails_start() {
        let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut server = HttpServer::new(ServerConfig::with_port(port));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ContainerError::Lifecycle { operation: "start", .. }));
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_servlet_init_failure_fails_start() {
        let mut handler = ServletContextHandler::new();
        handler
            .add_servlet(ServletHolder::new(ServletClass::of::<ModeServlet>()).unwrap(), "/*")
            .unwrap();

        let mut server = HttpServer::new(ServerConfig::with_port(0));
        server.set_handler(handler);

        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("Missing init parameter: mode"));
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_without_handler_everything_is_not_found() {
        let mut server = HttpServer::new(ServerConfig::with_port(0));
        server.start().await.unwrap();
        let port = server.local_addr().unwrap().port();

        let response = reqwest::get(format!("http://127.0.0.1:{}/", port)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        server.stop().await.unwrap();
    }
}
