//! Per-request options for the fetcher.

use reqwest::Method;
use serde_json::Value;

// == Request Options ==
/// Method, query, extra headers and JSON body for one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Only body-less GETs are served from the response cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET && self.body.is_none()
    }

    /// Cache key for `endpoint` with these options: the endpoint followed by
    /// the form-encoded query pairs in sorted order, so parameter order
    /// doesn't matter but names and values can't bleed into each other.
    pub fn cache_key(&self, endpoint: &str) -> String {
        if self.query.is_empty() {
            return endpoint.to_string();
        }

        let mut pairs: Vec<&(String, String)> = self.query.iter().collect();
        pairs.sort();

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        format!("{}?{}", endpoint, query)
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}
