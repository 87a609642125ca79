//! Path handling: base URI construction, context paths and path patterns

use url::Url;

use crate::errors::ContainerError;

/// Append a path segment the way a URI builder does: exactly one separator
/// between the existing path and the segment, empty segments ignored.
pub fn append_path(base: &Url, segment: &str) -> Url {
    if segment.is_empty() {
        return base.clone();
    }

    let current = base.path().trim_end_matches('/');
    let next = segment.trim_start_matches('/');
    let joined = format!("{}/{}", current, next);

    let mut url = base.clone();
    url.set_path(&joined);
    url
}

/// Servlet mapping pattern for a configured servlet path; the result always
/// ends in the `/*` wildcard.
pub fn normalize_servlet_pattern(servlet_path: &str) -> String {
    if servlet_path.ends_with('*') {
        servlet_path.to_string()
    } else if servlet_path.ends_with('/') {
        format!("{}*", servlet_path)
    } else {
        format!("{}/*", servlet_path)
    }
}

/// Canonical context path: empty for the root context, otherwise a leading
/// `/` and no trailing `/`.
pub fn normalize_context_path(context_path: &str) -> String {
    let trimmed = context_path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Path of a request relative to its context, or `None` when the request
/// lies outside the context.
pub fn strip_context<'a>(context_path: &str, path: &'a str) -> Option<&'a str> {
    if context_path.is_empty() {
        return Some(if path.is_empty() { "/" } else { path });
    }

    let rest = path.strip_prefix(context_path)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// A servlet or filter mapping pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `/prefix/*`; the root wildcard `/*` has an empty prefix
    Prefix(String),
    /// `*.ext`
    Extension(String),
    /// Any other path, matched exactly
    Exact(String),
}

/// Servlet path and path info of a matched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub servlet_path: String,
    pub path_info: Option<String>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, ContainerError> {
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid_pattern(pattern));
            }
            return Ok(PathPattern::Prefix(prefix.to_string()));
        }

        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.is_empty() || extension.contains(['*', '/']) {
                return Err(invalid_pattern(pattern));
            }
            return Ok(PathPattern::Extension(extension.to_string()));
        }

        if pattern.contains('*') || !pattern.starts_with('/') {
            return Err(invalid_pattern(pattern));
        }
        Ok(PathPattern::Exact(pattern.to_string()))
    }

    /// Match a context-relative path
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        match self {
            PathPattern::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                if !rest.is_empty() && !rest.starts_with('/') {
                    return None;
                }
                Some(PathMatch {
                    servlet_path: prefix.clone(),
                    path_info: (!rest.is_empty()).then(|| rest.to_string()),
                })
            }
            PathPattern::Extension(extension) => {
                let last = path.rsplit('/').next().unwrap_or(path);
                let (_, ext) = last.rsplit_once('.')?;
                (ext == extension).then(|| PathMatch {
                    servlet_path: path.to_string(),
                    path_info: None,
                })
            }
            PathPattern::Exact(exact) => (exact == path).then(|| PathMatch {
                servlet_path: path.to_string(),
                path_info: None,
            }),
        }
    }

    /// Ordering key when several servlet patterns match: exact beats the
    /// longest prefix, which beats an extension match.
    pub fn precedence(&self) -> (u8, usize) {
        match self {
            PathPattern::Exact(path) => (2, path.len()),
            PathPattern::Prefix(prefix) => (1, prefix.len()),
            PathPattern::Extension(_) => (0, 0),
        }
    }
}

fn invalid_pattern(pattern: &str) -> ContainerError {
    ContainerError::invalid(format!("invalid path pattern '{}'", pattern))
}
