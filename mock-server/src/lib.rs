use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Version prefix every route is served under.
pub const API_PREFIX: &str = "/v1.41";

const WAIT_CONDITIONS: [&str; 3] = ["not-running", "next-exit", "removed"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: Option<String>,
    pub image: String,
    pub cmd: Option<Vec<String>>,
    pub binds: Vec<String>,
}

impl Container {
    /// Exit code the container reports when waited on.
    fn exit_code(&self) -> i64 {
        match self.cmd.as_deref() {
            Some([first, ..]) if first == "false" => 1,
            _ => 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainer {
    pub image: String,
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    #[serde(default)]
    pub host_config: Option<HostConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    #[serde(default)]
    pub binds: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreated {
    pub id: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitStatus {
    pub status_code: i64,
}

/// Engine-style error payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Deserialize)]
pub struct CreateParams {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct WaitParams {
    pub condition: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Container>>>;

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    let api = Router::new()
        .route("/containers/create", post(create_container))
        .route("/containers/{id}/wait", post(wait_container))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Accepts a base64url (unpadded) JSON object, as sent in `X-Registry-Auth`.
fn registry_auth_is_valid(value: &[u8]) -> bool {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|json| {
            serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&json).ok()
        })
        .is_some()
}

async fn create_container(
    State(db): State<Db>,
    Query(params): Query<CreateParams>,
    headers: HeaderMap,
    Json(input): Json<CreateContainer>,
) -> Result<(StatusCode, Json<ContainerCreated>), Failure> {
    if let Some(auth) = headers.get("x-registry-auth") {
        if !registry_auth_is_valid(auth.as_bytes()) {
            return Err(failure(StatusCode::BAD_REQUEST, "invalid X-Registry-Auth header"));
        }
    }

    let mut containers = db.write().await;
    if let Some(name) = &params.name {
        if containers.values().any(|c| c.name.as_ref() == Some(name)) {
            return Err(failure(
                StatusCode::CONFLICT,
                format!("Conflict. The container name \"/{name}\" is already in use"),
            ));
        }
    }

    let container = Container {
        id: Uuid::new_v4().simple().to_string(),
        name: params.name,
        image: input.image,
        cmd: input.cmd,
        binds: input.host_config.map(|h| h.binds).unwrap_or_default(),
    };
    info!(id = %container.id, image = %container.image, "container created");
    let created = ContainerCreated {
        id: container.id.clone(),
        warnings: Vec::new(),
    };
    containers.insert(container.id.clone(), container);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn wait_container(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<WaitParams>,
) -> Result<impl IntoResponse, Failure> {
    let condition = params.condition.as_deref().unwrap_or("not-running");
    if !WAIT_CONDITIONS.contains(&condition) {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("invalid condition: \"{condition}\""),
        ));
    }

    let containers = db.read().await;
    let container = containers
        .get(&id)
        .or_else(|| containers.values().find(|c| c.name.as_deref() == Some(id.as_str())))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("No such container: {id}")))?;
    debug!(id = %container.id, condition, "container wait");

    let status = WaitStatus {
        status_code: container.exit_code(),
    };
    let mut body = serde_json::to_vec(&status)
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    body.push(b'\n');
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
