//! Servlet and filter holders
//!
//! A holder keeps a component's class, name and init parameters. The first
//! instance is built when the holder is created so construction failures
//! surface while the container is being configured; after a stop the next
//! start builds a fresh instance from the class.

use std::collections::BTreeMap;
use std::sync::Arc;

use testbed_descriptor::{
    DispatcherType, Filter, FilterClass, FilterConfig, Servlet, ServletClass, ServletConfig,
    ServletContext,
};
use tracing::debug;

use crate::errors::ContainerError;
use crate::mapping::PathPattern;

pub struct ServletHolder {
    class: ServletClass,
    name: String,
    init_params: BTreeMap<String, String>,
    pending: Option<Box<dyn Servlet>>,
}

impl ServletHolder {
    /// Instantiate `class`; the holder is named after it
    pub fn new(class: ServletClass) -> Result<Self, ContainerError> {
        let instance = class
            .instantiate()
            .map_err(|e| ContainerError::instantiation(class.name(), e))?;

        Ok(Self {
            name: class.name().to_string(),
            class,
            init_params: BTreeMap::new(),
            pending: Some(instance),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_init_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.init_params.insert(name.into(), value.into());
    }

    pub fn init_parameters(&self) -> &BTreeMap<String, String> {
        &self.init_params
    }

    /// Initialise an instance for a server start
    pub(crate) fn start(
        &mut self,
        context: &Arc<ServletContext>,
    ) -> Result<Arc<dyn Servlet>, ContainerError> {
        let mut servlet = match self.pending.take() {
            Some(servlet) => servlet,
            None => self
                .class
                .instantiate()
                .map_err(|e| ContainerError::instantiation(self.class.name(), e))?,
        };

        let config = ServletConfig::new(&self.name, self.init_params.clone(), Arc::clone(context));
        servlet
            .init(&config)
            .map_err(|e| ContainerError::lifecycle("start", e))?;

        debug!("servlet initialised = {}", self.name);
        Ok(Arc::from(servlet))
    }
}

pub struct FilterHolder {
    class: FilterClass,
    name: String,
    init_params: BTreeMap<String, String>,
    pending: Option<Box<dyn Filter>>,
}

impl FilterHolder {
    pub fn new(class: FilterClass) -> Result<Self, ContainerError> {
        let instance = class
            .instantiate()
            .map_err(|e| ContainerError::instantiation(class.name(), e))?;

        Ok(Self {
            name: class.name().to_string(),
            class,
            init_params: BTreeMap::new(),
            pending: Some(instance),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_init_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.init_params.insert(name.into(), value.into());
    }

    pub(crate) fn start(
        &mut self,
        context: &Arc<ServletContext>,
    ) -> Result<Arc<dyn Filter>, ContainerError> {
        let mut filter = match self.pending.take() {
            Some(filter) => filter,
            None => self
                .class
                .instantiate()
                .map_err(|e| ContainerError::instantiation(self.class.name(), e))?,
        };

        let config = FilterConfig::new(&self.name, self.init_params.clone(), Arc::clone(context));
        filter
            .init(&config)
            .map_err(|e| ContainerError::lifecycle("start", e))?;

        debug!("filter initialised = {}", self.name);
        Ok(Arc::from(filter))
    }
}

/// Where and when a filter applies
#[derive(Debug, Clone)]
pub struct FilterMapping {
    pattern: PathPattern,
    dispatches: Vec<DispatcherType>,
}

impl FilterMapping {
    pub fn new(pattern: PathPattern, dispatches: &[DispatcherType]) -> Self {
        Self {
            pattern,
            dispatches: dispatches.to_vec(),
        }
    }

    pub fn applies_to(&self, path: &str, dispatcher_type: DispatcherType) -> bool {
        self.dispatches.contains(&dispatcher_type) && self.pattern.matches(path).is_some()
    }
}
