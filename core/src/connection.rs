//! Connection settings: where the engine lives and which API version to speak.
//!
//! A `Connection` owns no socket. It only resolves endpoint paths into
//! absolute URLs of the form `<base>/v<version>/<path>?<query>`.

use url::Url;

use crate::error::ApiError;

/// API version used when the caller does not pick one.
pub const DEFAULT_API_VERSION: &str = "1.41";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    base_url: Url,
    api_version: String,
}

impl Connection {
    /// Parses and validates `base_url`. A path prefix on the base URL is kept.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base_url}: cannot be used as a base URL")));
        }
        Ok(Self {
            base_url,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Overrides the API version. Accepts `1.43` as well as `v1.43`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.api_version = version.strip_prefix('v').unwrap_or(&version).to_string();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Resolves an endpoint path and query into an absolute URL.
    pub fn url_for(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!(
            "{prefix}/v{}/{}",
            self.api_version,
            path.trim_start_matches('/')
        ));
        url.set_query(None);
        url.set_fragment(None);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url.into()
    }
}
