//! Embedded servlet-style test container
//!
//! This crate deploys a [`WebAppDescriptor`](testbed_descriptor::WebAppDescriptor)
//! into an embedded HTTP server for the duration of a test: one routing
//! context with session support, the descriptor's servlet under its
//! servlet path, its filters in front of every request and its listeners
//! notified of context, request and session events.

pub mod config;
pub mod context;
pub mod errors;
pub mod factory;
pub mod harness;
pub mod holder;
pub mod http_server;
pub mod mapping;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::HarnessConfig;
pub use context::{ActiveContext, ServletContextHandler};
pub use errors::ContainerError;
pub use factory::{EmbeddedContainerFactory, EmbeddedTestContainer, TestContainer, TestContainerFactory};
pub use harness::TestHarness;
pub use holder::{FilterHolder, FilterMapping, ServletHolder};
pub use http_server::{HttpServer, ServerConfig};
pub use mapping::{append_path, normalize_servlet_pattern, PathPattern};
pub use session::{SessionManager, SESSION_COOKIE};

/// Result type for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;
