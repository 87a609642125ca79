//! Test container factory
//!
//! [`EmbeddedContainerFactory`] deploys a [`WebAppDescriptor`] into an
//! embedded server. Unlike a container that only hosts a servlet or only a
//! filter, it configures the servlet, every filter and every listener of
//! the descriptor in one context.

use async_trait::async_trait;
use testbed_descriptor::{AppDescriptor, DescriptorKind, DispatcherType, WebAppDescriptor};
use tracing::debug;
use url::Url;

use crate::context::ServletContextHandler;
use crate::errors::ContainerError;
use crate::holder::{FilterHolder, ServletHolder};
use crate::http_server::{HttpServer, ServerConfig};
use crate::mapping::{append_path, normalize_servlet_pattern};

/// A deployed application a test talks to
#[async_trait]
pub trait TestContainer: Send {
    /// Client preconfigured for this container, if it provides one
    fn client(&self) -> Option<reqwest::Client>;

    /// URI under which the application is reachable
    fn base_uri(&self) -> &Url;

    async fn start(&mut self) -> Result<(), ContainerError>;

    async fn stop(&mut self) -> Result<(), ContainerError>;
}

/// Creates test containers for one kind of descriptor
pub trait TestContainerFactory: Send + Sync {
    /// Descriptor kind this factory accepts
    fn supports(&self) -> DescriptorKind;

    fn create(
        &self,
        base_uri: &Url,
        descriptor: AppDescriptor,
    ) -> Result<Box<dyn TestContainer>, ContainerError>;
}

/// Factory for [`EmbeddedTestContainer`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedContainerFactory;

impl TestContainerFactory for EmbeddedContainerFactory {
    fn supports(&self) -> DescriptorKind {
        DescriptorKind::Web
    }

    fn create(
        &self,
        base_uri: &Url,
        descriptor: AppDescriptor,
    ) -> Result<Box<dyn TestContainer>, ContainerError> {
        let AppDescriptor::Web(descriptor) = descriptor else {
            return Err(ContainerError::invalid(
                "The application descriptor must be a web application descriptor",
            ));
        };

        Ok(Box::new(EmbeddedTestContainer::new(base_uri, &descriptor)?))
    }
}

/// Web application deployed in an embedded server
pub struct EmbeddedTestContainer {
    base_uri: Url,
    server: HttpServer,
}

impl EmbeddedTestContainer {
    pub fn new(base_uri: &Url, descriptor: &WebAppDescriptor) -> Result<Self, ContainerError> {
        let port = base_uri.port_or_known_default().ok_or_else(|| {
            ContainerError::invalid(format!("no port in base URI '{}'", base_uri))
        })?;

        let uri = append_path(
            &append_path(base_uri, descriptor.context_path()),
            descriptor.servlet_path(),
        );

        debug!("server port = {}", port);
        let mut server = HttpServer::new(ServerConfig::with_port(port));

        let mut context = ServletContextHandler::with_sessions();
        debug!("context path = {}", descriptor.context_path());
        context.set_context_path(descriptor.context_path());

        for (name, value) in descriptor.context_params() {
            debug!("context param = ({},{})", name, value);
            context.init_params_mut().insert(name.clone(), value.clone());
        }

        for listener in descriptor.listeners() {
            debug!("context listener = {}", listener.name());
            let instance = listener
                .instantiate()
                .map_err(|e| ContainerError::instantiation(listener.name(), e))?;
            context.add_event_listener(instance);
        }

        debug!("servlet class = {}", descriptor.servlet_class().name());
        let mut servlet = ServletHolder::new(descriptor.servlet_class().clone())?;
        for (name, value) in descriptor.init_params() {
            debug!("servlet init param = ({},{})", name, value);
            servlet.set_init_parameter(name.clone(), value.clone());
        }

        debug!("servlet path = {}", descriptor.servlet_path());
        context.add_servlet(servlet, &normalize_servlet_pattern(descriptor.servlet_path()))?;

        for filter in descriptor.filters() {
            debug!("filter = {} ({})", filter.filter_name(), filter.filter_class().name());
            let mut holder = FilterHolder::new(filter.filter_class().clone())?;
            holder.set_name(filter.filter_name());
            for (name, value) in filter.init_params() {
                holder.set_init_parameter(name.clone(), value.clone());
            }
            context.add_filter(holder, "/*", &[DispatcherType::Request])?;
        }

        server.set_handler(context);

        Ok(Self {
            base_uri: uri,
            server,
        })
    }

    /// Address the server is bound to while running
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.local_addr()
    }
}

#[async_trait]
impl TestContainer for EmbeddedTestContainer {
    fn client(&self) -> Option<reqwest::Client> {
        None
    }

    fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    async fn start(&mut self) -> Result<(), ContainerError> {
        self.server.start().await
    }

    async fn stop(&mut self) -> Result<(), ContainerError> {
        self.server.stop().await
    }
}
