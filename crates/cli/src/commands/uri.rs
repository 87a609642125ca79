//! Uri command implementation
//!
//! Prints the base URI a test container would be reachable at, without
//! starting anything.

use anyhow::{Context, Result};
use testbed_container::{append_path, normalize_servlet_pattern, HarnessConfig};
use url::Url;

/// Arguments for the uri command
pub struct UriArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub context_path: String,
    pub servlet_path: String,
}

/// Base URI and servlet mapping for the given arguments
pub fn resolve_base_uri(args: &UriArgs) -> Result<(Url, String)> {
    let mut config = HarnessConfig::from_env().context("Invalid harness configuration")?;
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let base = config.base_uri()?;
    let uri = append_path(&append_path(&base, &args.context_path), &args.servlet_path);
    Ok((uri, normalize_servlet_pattern(&args.servlet_path)))
}

/// Execute the uri command
pub fn execute_uri_command(args: UriArgs) -> Result<()> {
    let (uri, pattern) = resolve_base_uri(&args)?;
    println!("🔗 Base URI: {}", uri);
    println!("🧭 Servlet mapping: {}", pattern);
    Ok(())
}
