//! Container errors

use testbed_descriptor::InstantiationError;
use thiserror::Error;

/// Boxed cause of a lifecycle failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while creating, starting or stopping a test container
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Failed to instantiate {component}: {source}")]
    Instantiation {
        component: String,
        source: InstantiationError,
    },

    #[error("Failed to {operation} server: {source}")]
    Lifecycle {
        operation: &'static str,
        source: BoxError,
    },
}

impl ContainerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ContainerError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn instantiation(component: &str, source: InstantiationError) -> Self {
        ContainerError::Instantiation {
            component: component.to_string(),
            source,
        }
    }

    pub(crate) fn lifecycle(operation: &'static str, source: impl Into<BoxError>) -> Self {
        ContainerError::Lifecycle {
            operation,
            source: source.into(),
        }
    }
}
