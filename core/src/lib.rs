//! Typed client core for a container-engine HTTP API.
//!
//! # Overview
//! Callers describe an API operation as an endpoint value (path, method,
//! optional typed body, declared response type) and hand it to a
//! `Dispatcher`, which builds the HTTP request, runs it over a caller-supplied
//! `Transport`, and returns the decoded response. Streamed operations return
//! a lazy `Pipeline` that maps newline-delimited JSON frames as they arrive.
//!
//! # Design
//! - The core performs no socket I/O (host-does-IO pattern): `Transport`
//!   implementations own connections, TLS, and pooling.
//! - Endpoint, authenticator, and body values are immutable and reusable;
//!   each dispatch builds its own request.
//! - Nothing retries internally. Every failure reaches the caller as an
//!   `ApiError` with its kind and status.

pub mod auth;
pub mod codec;
pub mod connection;
pub mod containers;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::{
    AnonymousCredential, NoAuthenticator, PasswordAuthenticator, PasswordCredential,
    RegistryAuthenticator,
};
pub use codec::NoBody;
pub use connection::{Connection, DEFAULT_API_VERSION};
pub use containers::{CreateContainerEndpoint, WaitContainerEndpoint};
pub use dispatcher::{parse_response, Dispatcher};
pub use endpoint::{Endpoint, PipelineEndpoint};
pub use error::{ApiError, TransportError};
pub use http::{
    HttpMethod, HttpRequest, HttpResponse, StreamingResponse, Transport, REGISTRY_AUTH_HEADER,
};
pub use pipeline::{CancelHandle, Pipeline, PipelineState};
pub use types::{
    CreateContainerBody, CreateContainerResponse, ErrorResponse, ExitCondition, HostConfig,
    WaitError, WaitResponse,
};
