//! Response envelope and error mapping.
//!
//! Every response body is `{ "success": true, "data": … }` or
//! `{ "success": false, "error": { "code", "message", "details"? } }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use cadence_core::{ActivityError, ErrorKind};
use cadence_shared::AppError;

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct Failure<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Wraps `data` in a success envelope.
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Success {
            success: true,
            data,
        }),
    )
        .into_response()
}

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A failure from the activity ledger.
    Activity(ActivityError),
    /// A transport or token failure.
    App(AppError),
}

impl ApiError {
    /// Missing or malformed request parameters.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::App(AppError::BadRequest(message.into()))
    }

    /// Missing, invalid or expired bearer token.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::App(AppError::Unauthorized(message.into()))
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Activity(e) => e.status_code(),
            Self::App(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ActivityError> for ApiError {
    fn from(err: ActivityError) -> Self {
        Self::Activity(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Activity(e) => {
                if e.kind() == ErrorKind::Internal {
                    error!(code = e.error_code(), error = %e, "request failed");
                }
                let details = match e {
                    ActivityError::InvalidPayload(failure) => {
                        serde_json::to_value(&failure.violations).ok()
                    }
                    _ => None,
                };
                ErrorBody {
                    code: e.error_code(),
                    message: e.public_message(),
                    details,
                }
            }
            Self::App(e) => {
                let message = match e {
                    AppError::Config(_) | AppError::Internal(_) => {
                        error!(error = %e, "request failed");
                        "Internal server error".to_string()
                    }
                    _ => {
                        warn!(code = e.error_code(), error = %e, "request rejected");
                        e.to_string()
                    }
                };
                ErrorBody {
                    code: e.error_code(),
                    message,
                    details: None,
                }
            }
        };

        (
            status,
            Json(Failure {
                success: false,
                error: body,
            }),
        )
            .into_response()
    }
}
