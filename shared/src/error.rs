use lambda_http::{http::StatusCode, Body, Error, Response};
use thiserror::Error;

use crate::responses::{json_response, ErrorResponse};

/// Failures surfaced to API consumers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "InvalidRequest",
            ApiError::Authentication(_) => "AuthenticationRequired",
            ApiError::Authorization(_) => "AccessDenied",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Internal(_) => "InternalError",
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let error = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        json_response(self.status(), &error)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", e))
    }
}

/// Collapse a handler outcome into the lambda response type
pub fn respond(result: Result<Response<Body>, ApiError>) -> Result<Response<Body>, Error> {
    match result {
        Ok(resp) => Ok(resp),
        Err(e) => {
            tracing::info!("Request rejected ({}): {}", e.status(), e);
            e.into_response()
        }
    }
}
