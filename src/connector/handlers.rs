use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connector::auth::Session;
use crate::connector::ConnectorState;
use crate::management::{ManagementError, ObjectName};
use crate::observability::metrics::ACCESS_DENIED_TOTAL;
use crate::security::access_control::Operation;

/// Error body returned by the connector.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    pub fn unauthorized(message: impl ToString) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl ToString) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl From<ManagementError> for ApiError {
    fn from(e: ManagementError) -> Self {
        let status = match e {
            ManagementError::MalformedName(_) => StatusCode::BAD_REQUEST,
            ManagementError::NotFound(_) => StatusCode::NOT_FOUND,
            ManagementError::AlreadyExists(_) => StatusCode::CONFLICT,
        };
        Self::new(status, e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
}

#[derive(Deserialize)]
pub struct CreateEntry {
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

fn authorize(state: &ConnectorState, session: &Session, operation: Operation) -> Result<(), ApiError> {
    let Some(access) = state.access.as_ref() else {
        return Ok(());
    };
    let identity = session.subject.as_ref().map(|s| s.principal()).unwrap_or_default();
    access.check(identity, operation).map_err(|e| {
        metrics::counter!(ACCESS_DENIED_TOTAL).increment(1);
        tracing::debug!(identity, ?operation, "Access denied");
        ApiError::forbidden(e)
    })
}

pub async fn get_connection(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ConnectionInfo>, ApiError> {
    authorize(&state, &session, Operation::Read)?;
    let principal = session.subject.as_ref().map(|s| s.principal()).unwrap_or_default();
    Ok(Json(ConnectionInfo {
        connection_id: format!(
            "{}://{} {} {}",
            state.protocol,
            state.address.advertised_host(),
            principal,
            session.id
        ),
    }))
}

pub async fn get_domains(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(&state, &session, Operation::Read)?;
    Ok(Json(state.server.domains()))
}

pub async fn get_entries(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ObjectName>>, ApiError> {
    authorize(&state, &session, Operation::Read)?;
    Ok(Json(state.server.names()))
}

pub async fn get_entry(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    authorize(&state, &session, Operation::Read)?;
    let name: ObjectName = name.parse()?;
    Ok(Json(state.server.attributes(&name)?))
}

pub async fn create_entry(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateEntry>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &session, Operation::Write)?;
    let name: ObjectName = body.name.parse()?;
    state.server.register(name, body.attributes)?;
    Ok(StatusCode::CREATED)
}

pub async fn delete_entry(
    State(state): State<ConnectorState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &session, Operation::Write)?;
    let name: ObjectName = name.parse()?;
    state.server.unregister(&name)?;
    Ok(StatusCode::NO_CONTENT)
}
