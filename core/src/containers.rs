//! Container endpoints.

use crate::codec::NoBody;
use crate::endpoint::{Endpoint, PipelineEndpoint};
use crate::http::HttpMethod;
use crate::types::{
    CreateContainerBody, CreateContainerResponse, ExitCondition, HostConfig, WaitResponse,
};

/// `POST /containers/create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainerEndpoint {
    body: CreateContainerBody,
    name: Option<String>,
}

impl CreateContainerEndpoint {
    pub fn new(
        image: impl Into<String>,
        cmd: Option<Vec<String>>,
        host_config: Option<HostConfig>,
    ) -> Self {
        Self {
            body: CreateContainerBody {
                image: image.into(),
                cmd,
                host_config,
            },
            name: None,
        }
    }

    /// Assigns a name to the container instead of letting the engine pick one.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Endpoint for CreateContainerEndpoint {
    type Body = CreateContainerBody;
    type Response = CreateContainerResponse;

    fn path(&self) -> String {
        "containers/create".to_string()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn body(&self) -> Option<&CreateContainerBody> {
        Some(&self.body)
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        self.name.iter().map(|name| ("name", name.clone())).collect()
    }
}

/// `POST /containers/{id}/wait`
///
/// Blocks server-side until the container reaches `condition`, then reports
/// a single status. Dispatch it as a pipeline to observe the status as soon
/// as it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitContainerEndpoint {
    id: String,
    condition: ExitCondition,
}

impl WaitContainerEndpoint {
    /// Waits for the container to stop running.
    pub fn new(container_id: impl Into<String>) -> Self {
        Self::with_condition(container_id, ExitCondition::default())
    }

    pub fn with_condition(container_id: impl Into<String>, condition: ExitCondition) -> Self {
        Self {
            id: container_id.into(),
            condition,
        }
    }

    pub fn condition(&self) -> ExitCondition {
        self.condition
    }
}

impl Endpoint for WaitContainerEndpoint {
    type Body = NoBody;
    type Response = WaitResponse;

    fn path(&self) -> String {
        format!("containers/{}/wait", self.id)
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("condition", self.condition.to_string())]
    }
}

impl PipelineEndpoint for WaitContainerEndpoint {
    // The engine reports exactly one status per wait.
    fn is_terminal(&self, _response: &WaitResponse) -> bool {
        true
    }
}
