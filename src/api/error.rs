use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub kind: &'static str,
    pub message: String,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InsufficientBalance { .. }
            | Self::InvalidRecipient => StatusCode::BAD_REQUEST,
            Self::UserNotFound { .. }
            | Self::ProductNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::TableNotFound { .. }
            | Self::GiftNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotCancellable { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidOrExpiredLink => StatusCode::CONFLICT,
            Self::CancellationWindowExpired { .. } => StatusCode::GONE,
            Self::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::EnvVar(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Don't leak storage details to clients
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            kind: self.kind(),
            message,
        });

        (status, body).into_response()
    }
}
