//! Registry authentication for the `X-Registry-Auth` header.
//!
//! A credential is never transmitted as-is: it is serialized to its fixed
//! JSON field layout and then base64-encoded with the URL-safe alphabet and
//! no padding. Base64 is an encoding, not secrecy; the transport must already
//! be confidential (TLS or a trusted local socket).

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Produces the encoded token sent in the `X-Registry-Auth` header.
pub trait RegistryAuthenticator {
    /// The structure serialized into the token.
    type Credential: Serialize;

    fn credential(&self) -> &Self::Credential;

    /// JSON-serializes the credential and base64url-encodes it without padding.
    fn encoded_token(&self) -> Result<String, ApiError> {
        let json = serde_json::to_vec(self.credential())
            .map_err(|e| ApiError::Encoding(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

/// Username/password credential in the engine's wire layout.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    #[serde(rename = "username")]
    pub username: String,
    #[serde(rename = "password")]
    pub password: String,
    #[serde(rename = "email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Registry address without a protocol prefix.
    #[serde(rename = "serveraddress")]
    pub server_address: String,
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("server_address", &self.server_address)
            .finish()
    }
}

/// Authenticates with a username and password directly.
///
/// Use only when no stronger mechanism (identity tokens, credential helpers)
/// is available for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordAuthenticator {
    credential: PasswordCredential,
}

impl PasswordAuthenticator {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server_address: impl Into<String>,
    ) -> Self {
        Self {
            credential: PasswordCredential {
                username: username.into(),
                password: password.into(),
                email: None,
                server_address: server_address.into(),
            },
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.credential.email = Some(email.into());
        self
    }
}

impl RegistryAuthenticator for PasswordAuthenticator {
    type Credential = PasswordCredential;

    fn credential(&self) -> &PasswordCredential {
        &self.credential
    }
}

/// The empty credential, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousCredential {}

/// Explicit "no authentication". Its token is the encoding of `{}`, so call
/// sites attach a header uniformly whether or not a login was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoAuthenticator {
    credential: AnonymousCredential,
}

impl NoAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryAuthenticator for NoAuthenticator {
    type Credential = AnonymousCredential;

    fn credential(&self) -> &AnonymousCredential {
        &self.credential
    }
}
