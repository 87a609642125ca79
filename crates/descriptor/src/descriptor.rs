//! Application descriptors
//!
//! A descriptor tells a test container what application to deploy. The
//! low-level form is a plain handler router; the web form describes a
//! servlet context with its servlet, filters, listeners and parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::{FilterClass, ListenerClass, ServletClass};

/// Which descriptor shape a container factory accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    LowLevel,
    Web,
}

/// Phase in which a request reaches the filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatcherType {
    /// A request arriving from a client
    Request,
    Forward,
    Include,
    Error,
    Async,
}

/// Application deployed by a test container
#[derive(Debug, Clone)]
pub enum AppDescriptor {
    LowLevel(LowLevelAppDescriptor),
    Web(WebAppDescriptor),
}

impl AppDescriptor {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            AppDescriptor::LowLevel(_) => DescriptorKind::LowLevel,
            AppDescriptor::Web(_) => DescriptorKind::Web,
        }
    }
}

impl From<LowLevelAppDescriptor> for AppDescriptor {
    fn from(descriptor: LowLevelAppDescriptor) -> Self {
        AppDescriptor::LowLevel(descriptor)
    }
}

impl From<WebAppDescriptor> for AppDescriptor {
    fn from(descriptor: WebAppDescriptor) -> Self {
        AppDescriptor::Web(descriptor)
    }
}

/// Application given directly as a router, with no servlet configuration
#[derive(Clone)]
pub struct LowLevelAppDescriptor {
    router: axum::Router,
}

impl LowLevelAppDescriptor {
    pub fn new(router: axum::Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &axum::Router {
        &self.router
    }

    pub fn into_router(self) -> axum::Router {
        self.router
    }
}

impl fmt::Debug for LowLevelAppDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LowLevelAppDescriptor").finish_non_exhaustive()
    }
}

/// A filter registered with a web application
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    filter_class: FilterClass,
    filter_name: String,
    init_params: BTreeMap<String, String>,
}

impl FilterDescriptor {
    pub fn new(filter_class: FilterClass, filter_name: impl Into<String>) -> Self {
        Self {
            filter_class,
            filter_name: filter_name.into(),
            init_params: BTreeMap::new(),
        }
    }

    pub fn with_init_params(mut self, init_params: BTreeMap<String, String>) -> Self {
        self.init_params = init_params;
        self
    }

    pub fn filter_class(&self) -> &FilterClass {
        &self.filter_class
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn init_params(&self) -> &BTreeMap<String, String> {
        &self.init_params
    }
}

/// Servlet-based web application
#[derive(Debug, Clone)]
pub struct WebAppDescriptor {
    context_path: String,
    servlet_path: String,
    servlet_class: ServletClass,
    init_params: BTreeMap<String, String>,
    context_params: BTreeMap<String, String>,
    listeners: Vec<ListenerClass>,
    filters: Vec<FilterDescriptor>,
}

impl WebAppDescriptor {
    /// Start describing an application served by `servlet_class`
    pub fn builder(servlet_class: ServletClass) -> WebAppDescriptorBuilder {
        WebAppDescriptorBuilder {
            descriptor: WebAppDescriptor {
                context_path: String::new(),
                servlet_path: String::new(),
                servlet_class,
                init_params: BTreeMap::new(),
                context_params: BTreeMap::new(),
                listeners: Vec::new(),
                filters: Vec::new(),
            },
        }
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    pub fn servlet_class(&self) -> &ServletClass {
        &self.servlet_class
    }

    /// Servlet init parameters
    pub fn init_params(&self) -> &BTreeMap<String, String> {
        &self.init_params
    }

    pub fn context_params(&self) -> &BTreeMap<String, String> {
        &self.context_params
    }

    pub fn listeners(&self) -> &[ListenerClass] {
        &self.listeners
    }

    pub fn filters(&self) -> &[FilterDescriptor] {
        &self.filters
    }
}

/// Builder for [`WebAppDescriptor`]
#[derive(Debug, Clone)]
pub struct WebAppDescriptorBuilder {
    descriptor: WebAppDescriptor,
}

impl WebAppDescriptorBuilder {
    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        self.descriptor.context_path = context_path.into();
        self
    }

    pub fn servlet_path(mut self, servlet_path: impl Into<String>) -> Self {
        self.descriptor.servlet_path = servlet_path.into();
        self
    }

    pub fn servlet_class(mut self, servlet_class: ServletClass) -> Self {
        self.descriptor.servlet_class = servlet_class;
        self
    }

    /// Add a servlet init parameter
    pub fn init_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.init_params.insert(name.into(), value.into());
        self
    }

    pub fn init_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.descriptor
            .init_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a context parameter
    pub fn context_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor
            .context_params
            .insert(name.into(), value.into());
        self
    }

    pub fn context_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.descriptor
            .context_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Register a listener; listeners are notified in registration order
    pub fn listener(mut self, listener: ListenerClass) -> Self {
        self.descriptor.listeners.push(listener);
        self
    }

    /// Register a filter in front of the servlet
    pub fn filter(mut self, filter_class: FilterClass, filter_name: impl Into<String>) -> Self {
        self.descriptor
            .filters
            .push(FilterDescriptor::new(filter_class, filter_name));
        self
    }

    pub fn filter_with_params(
        mut self,
        filter_class: FilterClass,
        filter_name: impl Into<String>,
        init_params: BTreeMap<String, String>,
    ) -> Self {
        self.descriptor.filters.push(
            FilterDescriptor::new(filter_class, filter_name).with_init_params(init_params),
        );
        self
    }

    pub fn build(self) -> WebAppDescriptor {
        self.descriptor
    }
}
