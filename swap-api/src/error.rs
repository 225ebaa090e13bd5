//! The HTTP-facing error taxonomy for the Quote/Swap API (F, §7): every
//! variant maps to exactly one of the HTTP codes the specification names
//! (400, 404, 500) and to the `{success:false, error, [supportedProtocols]}`
//! response shape from §6. Internal causes (builder failures, block-hash
//! lookups) are logged with detail and collapsed to a generic client
//! message, per §7 "HTTP 500 with a generic message, details logged."

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("mint {0} has no known price")]
    NotFound(String),

    #[error("program {program_id} has no registered builder")]
    UnsupportedProtocol {
        program_id: String,
        supported: Vec<String>,
    },

    #[error("builder failed to assemble instructions: {0}")]
    BuilderFailed(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(rename = "supportedProtocols", skip_serializing_if = "Option::is_none")]
    supported_protocols: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, supported_protocols) = match self {
            ApiError::Validation(reason) => (StatusCode::BAD_REQUEST, reason, None),
            ApiError::NotFound(reason) => (StatusCode::NOT_FOUND, reason, None),
            ApiError::UnsupportedProtocol {
                program_id,
                supported,
            } => (
                StatusCode::BAD_REQUEST,
                format!("unsupported protocol: {program_id}"),
                Some(supported),
            ),
            ApiError::BuilderFailed(detail) => {
                error!(detail, "builder failed to assemble swap instructions");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to assemble swap transaction".to_string(),
                    None,
                )
            }
            ApiError::Internal(detail) => {
                error!(detail, "internal error serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error,
                supported_protocols,
            }),
        )
            .into_response()
    }
}
