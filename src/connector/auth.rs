use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::connector::handlers::ApiError;
use crate::connector::ConnectorState;
use crate::observability::metrics::{AUTH_FAILURES_TOTAL, REQUESTS_TOTAL};
use crate::security::auth::{Credentials, Subject};

/// Per-request session attached by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub subject: Option<Subject>,
}

pub async fn authenticate(
    State(state): State<ConnectorState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    metrics::counter!(REQUESTS_TOTAL).increment(1);

    let subject = match &state.authenticator {
        Some(authenticator) => {
            let credentials = credentials(request.headers());
            match authenticator.authenticate(credentials) {
                Ok(subject) => Some(subject),
                Err(e) => {
                    metrics::counter!(AUTH_FAILURES_TOTAL).increment(1);
                    tracing::warn!(error = %e, "Connection rejected");
                    return Err(ApiError::unauthorized(e));
                }
            }
        }
        None => None,
    };

    request.extensions_mut().insert(Session {
        id: Uuid::new_v4(),
        subject,
    });
    Ok(next.run(request).await)
}

/// Credentials carried by a Basic `Authorization` header.
///
/// A missing header yields no credentials; an undecodable one an empty
/// array, which every credential-checking authenticator rejects.
pub fn credentials(headers: &HeaderMap) -> Credentials {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Credentials::none();
    };
    let encoded = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Basic "))
        .map(str::trim);
    let decoded = encoded
        .and_then(|v| base64::engine::general_purpose::STANDARD.decode(v).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(Zeroizing::new);

    match decoded.as_deref().map(|d| d.split_once(':')) {
        Some(Some((login, secret))) => Credentials::login_secret(login, secret),
        Some(None) => Credentials::array(decoded.iter().map(|d| d.to_string()).collect()),
        None => Credentials::array(Vec::new()),
    }
}
