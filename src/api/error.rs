//! Mapping of library errors onto HTTP responses

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// HTTP status for an error. Upstream failures keep the upstream's status
/// when it is an error status.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::UpstreamUnavailable { status, .. } => status
            .and_then(error_status)
            .unwrap_or(StatusCode::BAD_GATEWAY),
        Error::AddressNotResolved { status, .. } => {
            error_status(*status).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_status(code: u16) -> Option<StatusCode> {
    StatusCode::from_u16(code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        match self {
            Error::Unauthorized => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
