//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and decodes `HttpResponse` values; a caller-supplied `Transport`
//! moves the bytes. Streaming responses expose their body as a pull-based
//! iterator of byte chunks so the consumer controls backpressure.

use strum::{Display, EnumString};

use crate::error::TransportError;

/// Header carrying the encoded registry credential.
pub const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

pub const CONTENT_TYPE_HEADER: &str = "content-type";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// An HTTP request described as plain data.
///
/// `url` is absolute (base URL, version prefix, endpoint path, and query).
/// `body` is `None` for body-less endpoints; such requests carry no
/// content-type header either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response whose headers have arrived but whose body is still open.
#[derive(Debug)]
pub struct StreamingResponse<C> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub chunks: C,
}

/// The "send HTTP request, receive HTTP response" capability.
///
/// Implementations own sockets, TLS, pooling, and proxying. The core never
/// retries through a transport; a failed call is reported once.
pub trait Transport {
    /// Body chunks of a streaming response, pulled one at a time.
    type Chunks: Iterator<Item = Result<Vec<u8>, TransportError>>;

    /// Performs the exchange and buffers the whole response body.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Performs the exchange and returns as soon as the response headers
    /// arrive. The body is read lazily through `StreamingResponse::chunks`.
    fn open(
        &self,
        request: &HttpRequest,
    ) -> Result<StreamingResponse<Self::Chunks>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Chunks = T::Chunks;

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }

    fn open(
        &self,
        request: &HttpRequest,
    ) -> Result<StreamingResponse<Self::Chunks>, TransportError> {
        (**self).open(request)
    }
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
