//! Per-request context.
//!
//! # Responsibilities
//! - Carry everything a handler may read about one request
//!   (method, path, query string, headers, body, protocol)
//! - Parse query strings and urlencoded form bodies on demand
//! - Expose request cookies, optionally de-obscured with a secret
//!
//! # Design Decisions
//! - Built by the transport per request and dropped after the response;
//!   nothing request-scoped is stored on the application
//! - Parsing is lazy and not cached: contexts are immutable values
//! - Multipart bodies are not parsed

use std::net::SocketAddr;

use bytes::Bytes;

use crate::http::cookies;
use crate::http::response::{header_get, Header};

/// Ordered multi-valued mapping, as produced by query and form parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDict {
    items: Vec<(String, String)>,
}

impl MultiDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair without replacing earlier values for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.push((key.into(), value.into()));
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in order. Empty when absent.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The only value for `key`; `None` when absent or repeated.
    pub fn get_one(&self, key: &str) -> Option<&str> {
        match self.get_all(key).as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    pub fn extend(&mut self, other: MultiDict) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse `application/x-www-form-urlencoded` text. Blank values are kept.
    pub fn parse_urlencoded(source: &[u8]) -> Self {
        url::form_urlencoded::parse(source)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

impl FromIterator<(String, String)> for MultiDict {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Everything the core knows about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: String,
    path: String,
    query_string: String,
    headers: Vec<Header>,
    body: Bytes,
    protocol: String,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    /// A bodiless HTTP/1.1 request.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query_string: String::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            protocol: "HTTP/1.1".to_string(),
            remote_addr: None,
        }
    }

    pub fn with_query(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<Header>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header named `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// e.g. `HTTP/1.1`
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Peer address, when the transport knows it.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Whether the client asked for a `.json` resource.
    pub fn is_json(&self) -> bool {
        self.path.ends_with(".json")
    }

    /// Parsed query string.
    pub fn query(&self) -> MultiDict {
        MultiDict::parse_urlencoded(self.query_string.as_bytes())
    }

    /// Urlencoded form fields from the body. Other content types yield
    /// an empty dict.
    pub fn form(&self) -> MultiDict {
        let content_type = self
            .header("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match content_type.as_str() {
            "" | "application/x-www-form-urlencoded" => MultiDict::parse_urlencoded(&self.body),
            _ => MultiDict::new(),
        }
    }

    /// Form fields followed by query variables.
    pub fn form_with_query(&self) -> MultiDict {
        let mut vars = self.form();
        vars.extend(self.query());
        vars
    }

    /// Cookies sent with the request, in header order.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.header("cookie")
            .map(cookies::parse_cookie_header)
            .unwrap_or_default()
    }

    /// Value of cookie `name`. With a secret the stored value is
    /// de-obscured first; values that fail to de-obscure yield `None`.
    pub fn cookie(&self, name: &str, secret: Option<&str>) -> Option<String> {
        let (_, raw) = self.cookies().into_iter().find(|(n, _)| n == name)?;
        match secret {
            Some(secret) => cookies::reveal_value(secret, &raw),
            None => Some(raw),
        }
    }
}
