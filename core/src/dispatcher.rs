//! Turns endpoint values into HTTP exchanges and typed results.
//!
//! # Design
//! `Dispatcher` holds a `Connection` and a caller-supplied `Transport` and
//! carries no mutable state between calls. Request building and response
//! parsing are exposed separately (`build_request`, `parse_response`) so a
//! host that performs its own I/O can use the same code path the dispatcher
//! uses. Simple endpoints are all-or-nothing; pipeline endpoints return a
//! lazy `Pipeline` whose elements surface errors individually.

use serde::de::DeserializeOwned;
use tracing::{debug, field, instrument, Span};

use crate::auth::RegistryAuthenticator;
use crate::codec;
use crate::connection::Connection;
use crate::endpoint::{Endpoint, PipelineEndpoint};
use crate::error::ApiError;
use crate::http::{
    is_success, HttpRequest, HttpResponse, Transport, CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE,
    REGISTRY_AUTH_HEADER,
};
use crate::pipeline::Pipeline;
use crate::types::ErrorResponse;

/// Executes endpoints over a transport.
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    connection: Connection,
    transport: T,
}

impl<T> Dispatcher<T> {
    pub fn new(connection: Connection, transport: T) -> Self {
        Self { connection, transport }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds the request for `endpoint` without sending it.
    ///
    /// A present body is JSON-encoded with a JSON content-type; an absent or
    /// empty body yields `body: None` and no content-type. `registry_auth` is
    /// an already-encoded token placed in `X-Registry-Auth`.
    pub fn build_request<E: Endpoint>(
        &self,
        endpoint: &E,
        registry_auth: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.connection.url_for(&endpoint.path(), &endpoint.query());
        let mut headers = Vec::new();

        let body = match endpoint.body() {
            Some(body) => Some(codec::encode(body)?).filter(|bytes| !bytes.is_empty()),
            None => None,
        };
        if body.is_some() {
            headers.push((CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        if let Some(token) = registry_auth {
            headers.push((REGISTRY_AUTH_HEADER.to_string(), token));
        }

        Ok(HttpRequest {
            method: endpoint.method(),
            url,
            headers,
            body,
        })
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Sends `endpoint` and decodes its full response.
    pub fn dispatch<E: Endpoint>(&self, endpoint: &E) -> Result<E::Response, ApiError> {
        let request = self.build_request(endpoint, None)?;
        self.execute(request)
    }

    /// Like `dispatch`, with the authenticator's token in `X-Registry-Auth`.
    pub fn dispatch_with_auth<E, A>(&self, endpoint: &E, auth: &A) -> Result<E::Response, ApiError>
    where
        E: Endpoint,
        A: RegistryAuthenticator,
    {
        let request = self.build_request(endpoint, Some(auth.encoded_token()?))?;
        self.execute(request)
    }

    /// Returns the lazy response stream of a pipeline endpoint. Nothing is
    /// sent until the first element is pulled.
    pub fn stream<E: PipelineEndpoint>(&self, endpoint: E) -> Result<Pipeline<'_, E, T>, ApiError> {
        let request = self.build_request(&endpoint, None)?;
        Ok(Pipeline::new(endpoint, &self.transport, request))
    }

    pub fn stream_with_auth<E, A>(
        &self,
        endpoint: E,
        auth: &A,
    ) -> Result<Pipeline<'_, E, T>, ApiError>
    where
        E: PipelineEndpoint,
        A: RegistryAuthenticator,
    {
        let request = self.build_request(&endpoint, Some(auth.encoded_token()?))?;
        Ok(Pipeline::new(endpoint, &self.transport, request))
    }

    #[instrument(
        name = "engine_request",
        skip_all,
        fields(
            http.method = %request.method,
            http.url = %request.url,
            http.status_code = field::Empty,
            otel.kind = "client",
        )
    )]
    fn execute<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let response = self.transport.send(&request)?;
        Span::current().record("http.status_code", response.status);
        debug!(bytes = response.body.len(), "engine response");
        parse_response(&response)
    }
}

/// Checks the status of a buffered response and decodes its body.
///
/// Non-2xx responses fail with `HttpStatus` before the body is decoded.
pub fn parse_response<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    if !response.is_success() {
        return Err(status_error(response.status, &response.body));
    }
    codec::decode(&response.body)
}

/// Builds the `HttpStatus` error for a non-2xx response, preferring the
/// engine's `{"message": ...}` payload over the raw body.
pub(crate) fn status_error(status: u16, body: &[u8]) -> ApiError {
    debug_assert!(!is_success(status));
    let message = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(payload) => Some(payload.message),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    };
    ApiError::HttpStatus { status, message }
}
