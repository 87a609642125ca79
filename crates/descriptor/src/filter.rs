//! Filter API
//!
//! Filters wrap the servlet. Each filter receives the request together with
//! the rest of the chain and decides whether to pass the request on with
//! [`FilterChain::proceed`] or to answer it itself.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::errors::ServletError;
use crate::servlet::{Servlet, ServletContext, ServletRequest};

/// Request interceptor chained in front of the servlet
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    fn init(&mut self, _config: &FilterConfig) -> Result<(), ServletError> {
        Ok(())
    }

    async fn do_filter(&self, request: ServletRequest, chain: FilterChain) -> Response;

    fn destroy(&self) {}
}

/// Configuration handed to a filter's `init`
#[derive(Debug, Clone)]
pub struct FilterConfig {
    filter_name: String,
    init_params: BTreeMap<String, String>,
    context: Arc<ServletContext>,
}

impl FilterConfig {
    pub fn new(
        filter_name: impl Into<String>,
        init_params: BTreeMap<String, String>,
        context: Arc<ServletContext>,
    ) -> Self {
        Self {
            filter_name: filter_name.into(),
            init_params,
            context,
        }
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    pub fn servlet_context(&self) -> &Arc<ServletContext> {
        &self.context
    }
}

/// The remaining filters of a request, ending at the target servlet
#[derive(Clone)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
    target: Arc<dyn Servlet>,
    position: usize,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>, target: Arc<dyn Servlet>) -> Self {
        Self {
            filters: filters.into(),
            target,
            position: 0,
        }
    }

    /// Filters not yet invoked
    pub fn remaining(&self) -> usize {
        self.filters.len() - self.position
    }

    /// Invoke the next filter, or the servlet once all filters have run
    pub async fn proceed(mut self, request: ServletRequest) -> Response {
        match self.filters.get(self.position).cloned() {
            Some(filter) => {
                self.position += 1;
                filter.do_filter(request, self).await
            }
            None => self.target.service(request).await,
        }
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::response::IntoResponse;
    use http::StatusCode;

    struct Tag(&'static str);

    #[async_trait]
    impl Filter for Tag {
        async fn do_filter(&self, mut request: ServletRequest, chain: FilterChain) -> Response {
            let trail = request.attribute("trail").unwrap_or_default().to_string();
            request.set_attribute("trail", format!("{}{}>", trail, self.0));
            chain.proceed(request).await
        }
    }

    struct Deny;

    #[async_trait]
    impl Filter for Deny {
        async fn do_filter(&self, _request: ServletRequest, _chain: FilterChain) -> Response {
            StatusCode::FORBIDDEN.into_response()
        }
    }

    struct Trail;

    #[async_trait]
    impl Servlet for Trail {
        async fn service(&self, request: ServletRequest) -> Response {
            request.attribute("trail").unwrap_or_default().to_string().into_response()
        }
    }

    fn request() -> ServletRequest {
        let raw = Request::builder().uri("/").body(Body::empty()).unwrap();
        ServletRequest::new(raw, Arc::new(ServletContext::new("", BTreeMap::new())))
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_filters_run_in_order_before_servlet() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(Tag("a")), Arc::new(Tag("b"))];
        let chain = FilterChain::new(filters, Arc::new(Trail));
        assert_eq!(chain.remaining(), 2);

        let response = chain.proceed(request()).await;
        assert_eq!(text(response).await, "a>b>");
    }

    #[tokio::test]
    async fn test_filter_can_short_circuit() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(Deny), Arc::new(Tag("a"))];
        let chain = FilterChain::new(filters, Arc::new(Trail));

        let response = chain.proceed(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_chain_reaches_servlet() {
        let chain = FilterChain::new(Vec::new(), Arc::new(Trail));
        let response = chain.proceed(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
