//! Web application descriptors for the testbed container
//!
//! This crate defines what a test deploys: the descriptor types, the
//! component traits implemented by servlets, filters and listeners, and
//! the request, context and session types those components work with.

pub mod component;
pub mod descriptor;
pub mod errors;
pub mod filter;
pub mod listener;
pub mod servlet;
pub mod session;

pub use component::{ComponentClass, FilterClass, ListenerClass, ServletClass};
pub use descriptor::{
    AppDescriptor, DescriptorKind, DispatcherType, FilterDescriptor, LowLevelAppDescriptor,
    WebAppDescriptor, WebAppDescriptorBuilder,
};
pub use errors::{BodyError, InstantiationError, ServletError};
pub use filter::{Filter, FilterChain, FilterConfig};
pub use listener::{EventListener, RequestEvent};
pub use servlet::{Servlet, ServletConfig, ServletContext, ServletRequest};
pub use session::{Session, SessionBinding, SessionStore};

// Component implementors need these to write `#[async_trait]` impls
pub use async_trait::async_trait;
