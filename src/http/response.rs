//! Response normalization.
//!
//! # Responsibilities
//! - Turn whatever a handler returns into one canonical response
//!   (body chunks, status, headers)
//! - Compute default headers (Content-Type, Content-Length)
//! - Encode text with the configured charset and structured values as JSON
//! - Map status codes to reason phrases
//!
//! # Design Decisions
//! - Handler results are a closed enum, not runtime type sniffing
//! - Explicit headers win over computed defaults, except Content-Length,
//!   which is always recomputed from the final body and appended last
//! - Exactly one Content-Type per response; later duplicates are dropped
//! - Normalizing an already canonical [`Response`] returns it unchanged
//! - Shapes that cannot be normalized become a 400 response, never a panic

use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::http::fault::RequestFault;

/// A `(name, value)` header pair.
pub type Header = (String, String);

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Reason phrase for an HTTP status code, `UNKNOWN` when unrecognized.
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("UNKNOWN")
}

/// `"<code> <reason>"`, e.g. `"404 Not Found"`.
pub fn status_line(code: u16) -> String {
    format!("{} {}", code, reason_phrase(code))
}

/// Case-insensitive header lookup; first match wins.
pub fn header_get<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Charsets text bodies can be encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Charset {
    /// Label used in `Content-Type` parameters.
    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Encode `text`; characters the charset cannot represent are dropped.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let limit = match self {
            Charset::Utf8 => return text.as_bytes().to_vec(),
            Charset::Latin1 => 0xFF,
            Charset::Ascii => 0x7F,
        };
        text.chars()
            .filter(|c| (*c as u32) <= limit)
            .map(|c| c as u32 as u8)
            .collect()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for charset names we cannot encode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported charset: {0}")]
pub struct UnsupportedCharset(pub String);

impl FromStr for Charset {
    type Err = UnsupportedCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Charset::Latin1),
            "us-ascii" | "ascii" => Ok(Charset::Ascii),
            _ => Err(UnsupportedCharset(s.to_string())),
        }
    }
}

/// A status given either as a number or as a status string like
/// `"404 Not Found"`. Strings are reduced to their leading number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSpec {
    Code(u16),
    Line(String),
}

impl StatusSpec {
    /// Numeric code, or `None` when a status string has no leading number.
    pub fn code(&self) -> Option<u16> {
        match self {
            StatusSpec::Code(code) => Some(*code),
            StatusSpec::Line(line) => line.split_whitespace().next()?.parse().ok(),
        }
    }
}

impl From<u16> for StatusSpec {
    fn from(code: u16) -> Self {
        StatusSpec::Code(code)
    }
}

impl From<&str> for StatusSpec {
    fn from(line: &str) -> Self {
        StatusSpec::Line(line.to_string())
    }
}

impl From<String> for StatusSpec {
    fn from(line: String) -> Self {
        StatusSpec::Line(line)
    }
}

impl From<StatusCode> for StatusSpec {
    fn from(code: StatusCode) -> Self {
        StatusSpec::Code(code.as_u16())
    }
}

/// What a handler may return.
#[derive(Debug, Clone)]
pub enum HandlerResult {
    /// Text body, status 200, `text/html`.
    Text(String),
    /// JSON body, status 200, `application/json`.
    Json(serde_json::Value),
    /// Raw bytes, passed through as the body.
    Bytes(Bytes),
    /// A body with an explicit status.
    Status {
        body: Box<HandlerResult>,
        status: StatusSpec,
    },
    /// A body with an explicit status and headers.
    Full {
        body: Box<HandlerResult>,
        status: StatusSpec,
        headers: Vec<Header>,
    },
    /// An already normalized response.
    Response(Response),
    /// Nothing usable; answered with 400.
    Empty,
}

impl HandlerResult {
    pub fn text(body: impl Into<String>) -> Self {
        HandlerResult::Text(body.into())
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        HandlerResult::Bytes(body.into())
    }

    /// Serialize `value` to JSON. Values serde cannot represent as JSON
    /// (e.g. maps with non-string keys) become [`HandlerResult::Empty`].
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => HandlerResult::Json(value),
            Err(e) => {
                tracing::warn!(error = %e, "Value cannot be encoded as JSON");
                HandlerResult::Empty
            }
        }
    }

    pub fn with_status(self, status: impl Into<StatusSpec>) -> Self {
        HandlerResult::Status {
            body: Box::new(self),
            status: status.into(),
        }
    }

    pub fn with_headers<K, V>(self, status: impl Into<StatusSpec>, headers: Vec<(K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        HandlerResult::Full {
            body: Box::new(self),
            status: status.into(),
            headers: headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Shorthand for headers consisting of a single Content-Type.
    pub fn with_content_type(self, status: impl Into<StatusSpec>, content_type: &str) -> Self {
        self.with_headers(status, vec![(CONTENT_TYPE, content_type)])
    }
}

impl From<&str> for HandlerResult {
    fn from(body: &str) -> Self {
        HandlerResult::Text(body.to_string())
    }
}

impl From<String> for HandlerResult {
    fn from(body: String) -> Self {
        HandlerResult::Text(body)
    }
}

impl From<serde_json::Value> for HandlerResult {
    fn from(value: serde_json::Value) -> Self {
        HandlerResult::Json(value)
    }
}

impl From<Vec<u8>> for HandlerResult {
    fn from(body: Vec<u8>) -> Self {
        HandlerResult::Bytes(body.into())
    }
}

impl From<Bytes> for HandlerResult {
    fn from(body: Bytes) -> Self {
        HandlerResult::Bytes(body)
    }
}

impl From<Response> for HandlerResult {
    fn from(response: Response) -> Self {
        HandlerResult::Response(response)
    }
}

impl<T: Into<HandlerResult>> From<Option<T>> for HandlerResult {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(HandlerResult::Empty)
    }
}

impl<B, S> From<(B, S)> for HandlerResult
where
    B: Into<HandlerResult>,
    S: Into<StatusSpec>,
{
    fn from((body, status): (B, S)) -> Self {
        body.into().with_status(status)
    }
}

impl<B, S, K, V> From<(B, S, Vec<(K, V)>)> for HandlerResult
where
    B: Into<HandlerResult>,
    S: Into<StatusSpec>,
    K: Into<String>,
    V: Into<String>,
{
    fn from((body, status, headers): (B, S, Vec<(K, V)>)) -> Self {
        body.into().with_headers(status, headers)
    }
}

impl<'a, B, S> From<(B, S, &'a str)> for HandlerResult
where
    B: Into<HandlerResult>,
    S: Into<StatusSpec>,
{
    fn from((body, status, content_type): (B, S, &'a str)) -> Self {
        body.into().with_content_type(status, content_type)
    }
}

/// The canonical response: body chunks, status and ordered headers.
///
/// Only [`ResponseModel`] builds these, so the header invariants always hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    body: Vec<Bytes>,
    status: u16,
    headers: Vec<Header>,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_line(&self) -> String {
        status_line(self.status)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header named `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    pub fn body_chunks(&self) -> &[Bytes] {
        &self.body
    }

    /// Body chunks joined into one buffer.
    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [single] => single.clone(),
            chunks => {
                let mut buf = BytesMut::with_capacity(self.content_length());
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }

    pub fn content_length(&self) -> usize {
        self.body.iter().map(Bytes::len).sum()
    }

    /// `(body, status_line, headers)`, the shape a gateway server expects.
    pub fn into_triple(self) -> (Vec<Bytes>, String, Vec<Header>) {
        let line = self.status_line();
        (self.body, line, self.headers)
    }
}

/// A body resolved to bytes, before headers are finalized.
struct Encoded {
    chunks: Vec<Bytes>,
    status: Option<u16>,
    default_content_type: String,
    headers: Vec<Header>,
}

/// Normalizes handler results into [`Response`]s for one charset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseModel {
    charset: Charset,
}

impl ResponseModel {
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// `text/html;charset=<charset>`
    pub fn html_content_type(&self) -> String {
        format!("text/html;charset={}", self.charset)
    }

    /// `application/json;charset=<charset>`
    pub fn json_content_type(&self) -> String {
        format!("application/json;charset={}", self.charset)
    }

    /// Normalize `raw`. Unusable shapes become a 400 diagnostic response.
    pub fn normalize(&self, raw: impl Into<HandlerResult>) -> Response {
        self.try_normalize(raw.into())
            .unwrap_or_else(|fault| self.incompatible(None, &fault))
    }

    /// Normalize `raw`, reporting unusable shapes as a fault.
    pub fn try_normalize(&self, raw: HandlerResult) -> Result<Response, RequestFault> {
        if let HandlerResult::Response(response) = raw {
            return Ok(response);
        }
        let encoded = self.encode(raw)?;
        Ok(self.finish(encoded))
    }

    /// An HTML response with default headers.
    pub fn html(&self, status: u16, body: impl Into<String>) -> Response {
        self.finish(Encoded {
            chunks: vec![Bytes::from(self.charset.encode(&body.into()))],
            status: Some(status),
            default_content_type: self.html_content_type(),
            headers: Vec::new(),
        })
    }

    /// The 400 response for a handler result that could not be normalized.
    pub fn incompatible(&self, path: Option<&str>, fault: &RequestFault) -> Response {
        let subject = path.unwrap_or("handler");
        self.html(
            fault.status(),
            format!("<h1>{subject} produced incompatible response.</h1>\n<p>{fault}</p>"),
        )
    }

    fn encode(&self, raw: HandlerResult) -> Result<Encoded, RequestFault> {
        let encoded = match raw {
            HandlerResult::Text(text) => Encoded {
                chunks: vec![Bytes::from(self.charset.encode(&text))],
                status: None,
                default_content_type: self.html_content_type(),
                headers: Vec::new(),
            },
            HandlerResult::Json(value) => {
                let body = serde_json::to_vec(&value).map_err(|e| {
                    RequestFault::UnrecognizedHandlerResult { reason: e.to_string() }
                })?;
                Encoded {
                    chunks: vec![Bytes::from(body)],
                    status: None,
                    default_content_type: self.json_content_type(),
                    headers: Vec::new(),
                }
            }
            HandlerResult::Bytes(body) => Encoded {
                chunks: vec![body],
                status: None,
                default_content_type: self.html_content_type(),
                headers: Vec::new(),
            },
            HandlerResult::Status { body, status } => {
                let mut inner = self.encode(*body)?;
                inner.status = Some(resolve_status(&status)?);
                inner
            }
            HandlerResult::Full {
                body,
                status,
                mut headers,
            } => {
                let mut inner = self.encode(*body)?;
                inner.status = Some(resolve_status(&status)?);
                headers.append(&mut inner.headers);
                inner.headers = headers;
                inner
            }
            HandlerResult::Response(response) => Encoded {
                chunks: response.body,
                status: Some(response.status),
                default_content_type: self.html_content_type(),
                headers: response.headers,
            },
            HandlerResult::Empty => {
                return Err(RequestFault::UnrecognizedHandlerResult {
                    reason: "handler returned no value".to_string(),
                })
            }
        };
        Ok(encoded)
    }

    fn finish(&self, encoded: Encoded) -> Response {
        let mut headers = Vec::with_capacity(encoded.headers.len() + 2);
        let mut has_content_type = false;
        for (name, value) in encoded.headers {
            if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                continue;
            }
            if name.eq_ignore_ascii_case(CONTENT_TYPE) {
                if has_content_type {
                    continue;
                }
                has_content_type = true;
            }
            headers.push((name, value));
        }
        if !has_content_type {
            headers.insert(0, (CONTENT_TYPE.to_string(), encoded.default_content_type));
        }

        let length: usize = encoded.chunks.iter().map(Bytes::len).sum();
        headers.push((CONTENT_LENGTH.to_string(), length.to_string()));

        Response {
            body: encoded.chunks,
            status: encoded.status.unwrap_or(200),
            headers,
        }
    }
}

fn resolve_status(status: &StatusSpec) -> Result<u16, RequestFault> {
    // the wire only carries three-digit codes
    status
        .code()
        .filter(|code| (100..=999).contains(code))
        .ok_or_else(|| RequestFault::UnrecognizedHandlerResult {
            reason: format!("unusable status {status:?}"),
        })
}

/// `message` (or `<h1>{code} {reason}</h1>`) with status `code`.
pub fn abort(code: u16, message: Option<&str>) -> HandlerResult {
    let body = match message {
        Some(message) => message.to_string(),
        None => format!("<h1>{}</h1>", status_line(code)),
    };
    HandlerResult::Text(body).with_status(code)
}

/// Empty body with a `Location` header. Defaults to 303 for HTTP/1.1
/// requests and 302 otherwise.
pub fn redirect(url: &str, code: Option<u16>, protocol: &str) -> HandlerResult {
    let code = code.unwrap_or(if protocol == "HTTP/1.1" { 303 } else { 302 });
    HandlerResult::text("").with_headers(code, vec![("Location", url)])
}

/// Serialize `value` as a JSON result.
pub fn jsonify<T: Serialize>(value: &T) -> HandlerResult {
    HandlerResult::json(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ResponseModel {
        ResponseModel::default()
    }

    #[test]
    fn test_text_defaults() {
        let r = model().normalize("hi");
        assert_eq!(r.status(), 200);
        assert_eq!(r.status_line(), "200 OK");
        assert_eq!(r.body_bytes(), Bytes::from_static(b"hi"));
        assert_eq!(
            r.headers(),
            &[
                ("Content-Type".to_string(), "text/html;charset=UTF-8".to_string()),
                ("Content-Length".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_mapping() {
        let r = model().normalize(json!({"a": 1}));
        assert_eq!(r.status(), 200);
        assert_eq!(r.header("content-type"), Some("application/json;charset=UTF-8"));
        let parsed: serde_json::Value = serde_json::from_slice(&r.body_bytes()).unwrap();
        assert_eq!(parsed, json!({"a": 1}));
        assert_eq!(r.header("Content-Length"), Some(r.content_length().to_string().as_str()));
    }

    #[test]
    fn test_status_tuple() {
        let r = model().normalize(("err", 404u16));
        assert_eq!(r.status(), 404);
        assert_eq!(r.status_line(), "404 Not Found");
        assert_eq!(r.body_bytes(), Bytes::from_static(b"err"));
    }

    #[test]
    fn test_status_string_is_reduced_to_code() {
        let r = model().normalize(("gone", "404 ERROR"));
        assert_eq!(r.status(), 404);
        assert_eq!(r.status_line(), "404 Not Found");

        let r = model().normalize(("x", "not a status"));
        assert_eq!(r.status(), 400);
    }

    #[test]
    fn test_full_tuple_headers_win_but_length_is_recomputed() {
        let r = model().normalize((
            "body{}",
            200u16,
            vec![
                ("Content-Type", "text/css"),
                ("Content-Length", "9999"),
                ("X-Extra", "1"),
            ],
        ));
        assert_eq!(
            r.headers(),
            &[
                ("Content-Type".to_string(), "text/css".to_string()),
                ("X-Extra".to_string(), "1".to_string()),
                ("Content-Length".to_string(), "6".to_string()),
            ]
        );
    }

    #[test]
    fn test_full_tuple_without_content_type_gets_default() {
        let r = model().normalize(("", 303u16, vec![("Location", "/home")]));
        assert_eq!(r.headers()[0].0, "Content-Type");
        assert_eq!(r.header("Location"), Some("/home"));
        assert_eq!(r.header("Content-Length"), Some("0"));
    }

    #[test]
    fn test_exactly_one_content_type() {
        let r = model().normalize((
            json!([1, 2]),
            201u16,
            vec![("content-type", "application/vnd.api+json"), ("Content-Type", "text/plain")],
        ));
        let count = r
            .headers()
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .count();
        assert_eq!(count, 1);
        assert_eq!(r.header("Content-Type"), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_content_type_shorthand() {
        let r = model().normalize(("a {}", 200u16, "text/css"));
        assert_eq!(r.header("Content-Type"), Some("text/css"));
    }

    #[test]
    fn test_bytes_pass_through() {
        let raw = vec![0u8, 159, 146, 150];
        let r = model().normalize(raw.clone());
        assert_eq!(r.body_bytes().as_ref(), raw.as_slice());
        assert_eq!(r.header("Content-Length"), Some("4"));
    }

    #[test]
    fn test_empty_is_bad_request() {
        let r = model().normalize(HandlerResult::Empty);
        assert_eq!(r.status(), 400);
        assert!(String::from_utf8_lossy(&r.body_bytes()).contains("incompatible response"));

        let nothing: Option<String> = None;
        assert_eq!(model().normalize(nothing).status(), 400);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = model().normalize(("err", 404u16, vec![("X-A", "b")]));
        let second = model().normalize(first.clone());
        assert_eq!(first, second);
        let third = model().normalize(second.clone());
        assert_eq!(second, third);
    }

    #[test]
    fn test_unknown_status_reason() {
        let r = model().normalize(("odd", 799u16));
        assert_eq!(r.status_line(), "799 UNKNOWN");
        assert_eq!(reason_phrase(42), "UNKNOWN");
    }

    #[test]
    fn test_status_outside_wire_range_is_bad_request() {
        for code in [0u16, 42, 1000] {
            let r = model().normalize(("x", code));
            assert_eq!(r.status(), 400, "status {code}");
            assert_eq!(r.status_line(), "400 Bad Request");
        }
        assert_eq!(model().normalize(("x", "0 UNKNOWN")).status(), 400);
        assert_eq!(model().normalize(("x", 999u16)).status(), 999);
    }

    #[test]
    fn test_charset_encoding() {
        let latin = ResponseModel::new(Charset::Latin1);
        let r = latin.normalize("café ☃");
        assert_eq!(r.body_bytes().as_ref(), b"caf\xe9 ");
        assert_eq!(r.header("Content-Type"), Some("text/html;charset=ISO-8859-1"));

        let ascii = ResponseModel::new(Charset::Ascii);
        assert_eq!(ascii.normalize("café").body_bytes().as_ref(), b"caf");

        assert_eq!("latin-1".parse::<Charset>().unwrap(), Charset::Latin1);
        assert!("koi8-r".parse::<Charset>().is_err());
    }

    #[test]
    fn test_abort_and_redirect() {
        let r = model().normalize(abort(503, None));
        assert_eq!(r.status(), 503);
        assert_eq!(
            r.body_bytes(),
            Bytes::from_static(b"<h1>503 Service Unavailable</h1>")
        );

        let r = model().normalize(redirect("/login", None, "HTTP/1.1"));
        assert_eq!(r.status(), 303);
        assert_eq!(r.header("Location"), Some("/login"));

        let r = model().normalize(redirect("/login", None, "HTTP/1.0"));
        assert_eq!(r.status(), 302);
    }

    #[test]
    fn test_jsonify_struct() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }
        let r = model().normalize(jsonify(&User { name: "Ada" }));
        assert_eq!(r.body_bytes(), Bytes::from_static(br#"{"name":"Ada"}"#));
    }

    #[test]
    fn test_into_triple() {
        let (body, line, headers) = model().normalize(("x", 201u16)).into_triple();
        assert_eq!(body, vec![Bytes::from_static(b"x")]);
        assert_eq!(line, "201 Created");
        assert_eq!(headers.last().unwrap().1, "1");
    }
}
