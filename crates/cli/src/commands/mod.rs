//! CLI command modules

pub mod serve;
pub mod uri;

pub use serve::{execute_serve_command, parse_key_value, ServeArgs};
pub use uri::{execute_uri_command, UriArgs};
