//! HTTP plumbing for the SODA API.
//!
//! [`SodaClient`] owns the base URI, credentials and batch queue. Network I/O
//! goes through the [`Transport`] trait so the workflow can be driven against
//! scripted responses in tests; [`UreqTransport`] is the production
//! implementation.

pub mod client;
pub mod multipart;
pub mod transport;

use std::fmt;

use serde_json::Value;

use crate::error::LoaderError;

pub use client::{Reply, SodaClient};
pub use multipart::{FormPart, MultipartForm};
pub use transport::UreqTransport;

/// HTTP verbs used against the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request handed to a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw response as returned by a [`Transport`], before status validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Reason phrase, e.g. `Not Found`.
    pub message: String,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            message: reason_phrase(status).to_string(),
            body: body.into(),
        }
    }
}

/// Executes HTTP requests.
///
/// Implementations must return every HTTP status as a [`RawResponse`];
/// only failures below HTTP (DNS, TLS, timeouts) become errors.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, LoaderError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, LoaderError> {
        (**self).execute(request)
    }
}

/// A validated API response (status 200 or 202).
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    /// The body parsed as JSON, when it is JSON.
    pub json: Option<Value>,
}

impl ApiResponse {
    pub fn from_raw(raw: RawResponse) -> Self {
        let json = serde_json::from_str(&raw.body).ok();
        Self {
            status: raw.status,
            body: raw.body,
            json,
        }
    }

    /// 202: the server accepted the request but is still working on it.
    pub fn is_accepted(&self) -> bool {
        self.status == 202
    }

    /// Returns a top-level string field, treating empty strings as absent.
    ///
    /// Numeric values are rendered as strings.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.json.as_ref()?.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Canonical reason phrase for the statuses the API is known to return.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
