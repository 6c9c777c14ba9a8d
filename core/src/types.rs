//! Wire DTOs for the container endpoints.
//!
//! Field names on the wire are the engine's PascalCase identifiers; the
//! rename table is the serde attribute set on each type. Tests pin the exact
//! key set so a rename drift fails loudly.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Request payload for container creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainerBody {
    /// Image used as the container's base.
    pub image: String,
    /// Overrides the image's default command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostConfig>,
}

/// Host-side settings for a new container. Only bind mounts are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// Bind mounts in `host_path:container_path[:options]` form.
    pub binds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainerResponse {
    pub id: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Status reported once a waited-on container reaches its condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitResponse {
    pub status_code: i64,
    /// Present only when the engine reports a failure while waiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WaitError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitError {
    pub message: String,
}

/// The state a wait call blocks for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExitCondition {
    /// The container is no longer running.
    #[default]
    NotRunning,
    /// The container's next exit.
    NextExit,
    /// The container has been removed.
    Removed,
}

/// The engine's error payload for non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
