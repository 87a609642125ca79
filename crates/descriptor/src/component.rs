//! Component classes
//!
//! A component class is a named constructor. Descriptors carry classes
//! rather than instances so the container decides when components are
//! built, and can build them again when a stopped server is restarted.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::errors::InstantiationError;
use crate::filter::Filter;
use crate::listener::EventListener;
use crate::servlet::Servlet;

type Factory<T> = dyn Fn() -> Result<Box<T>, InstantiationError> + Send + Sync;

/// A named factory for components of type `T`
pub struct ComponentClass<T: ?Sized> {
    name: String,
    factory: Arc<Factory<T>>,
}

/// Class reference for the servlet of a web application
pub type ServletClass = ComponentClass<dyn Servlet>;
/// Class reference for a request filter
pub type FilterClass = ComponentClass<dyn Filter>;
/// Class reference for a context, request or session listener
pub type ListenerClass = ComponentClass<dyn EventListener>;

impl<T: ?Sized> ComponentClass<T> {
    /// Create a class from a name and a fallible constructor
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<T>, InstantiationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Name used in logs and error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a fresh instance
    pub fn instantiate(&self) -> Result<Box<T>, InstantiationError> {
        (self.factory)()
    }
}

impl ComponentClass<dyn Servlet> {
    /// Class for a servlet with a zero-argument constructor
    pub fn of<C: Servlet + Default>() -> Self {
        Self::new(type_name::<C>(), || Ok(Box::new(C::default()) as Box<dyn Servlet>))
    }
}

impl ComponentClass<dyn Filter> {
    /// Class for a filter with a zero-argument constructor
    pub fn of<C: Filter + Default>() -> Self {
        Self::new(type_name::<C>(), || Ok(Box::new(C::default()) as Box<dyn Filter>))
    }
}

impl ComponentClass<dyn EventListener> {
    /// Class for a listener with a zero-argument constructor
    pub fn of<C: EventListener + Default>() -> Self {
        Self::new(type_name::<C>(), || {
            Ok(Box::new(C::default()) as Box<dyn EventListener>)
        })
    }
}

impl<T: ?Sized> Clone for ComponentClass<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ComponentClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
