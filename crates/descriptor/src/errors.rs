//! Descriptor and component errors

use thiserror::Error;

/// Failure to construct a component from its class
#[derive(Error, Debug)]
pub enum InstantiationError {
    #[error("No accessible zero-argument constructor for {component}")]
    NoConstructor { component: String },

    #[error("Access to {component} denied: {reason}")]
    AccessDenied { component: String, reason: String },

    #[error("Construction of {component} failed: {reason}")]
    Failed { component: String, reason: String },
}

/// Errors raised by servlets and filters while initialising
#[derive(Error, Debug)]
pub enum ServletError {
    #[error("Missing init parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid init parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Errors raised while reading a request body
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("Failed to read request body: {reason}")]
    ReadFailed { reason: String },
}

impl From<axum::Error> for BodyError {
    fn from(err: axum::Error) -> Self {
        BodyError::ReadFailed {
            reason: err.to_string(),
        }
    }
}
