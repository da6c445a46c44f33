//! JSON error bodies.
//!
//! Domain and identity failures render as [`ErrorEnvelope`]; validation
//! failures render as [`ValidationErrorBody`] with status 422.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VotingError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub detail: String,
    pub error_code: String,
    pub timestamp: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    pub detail: String,
    pub errors: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug)]
enum Failure {
    Voting(VotingError),
    /// Rejected caller identity. Not a domain error, so it carries its own status.
    Identity {
        status: StatusCode,
        detail: &'static str,
    },
}

/// A failed request: what went wrong and the path it went wrong on.
#[derive(Debug)]
pub struct ApiError {
    failure: Failure,
    path: String,
}

impl ApiError {
    pub fn new(error: VotingError, path: impl Into<String>) -> Self {
        Self {
            failure: Failure::Voting(error),
            path: path.into(),
        }
    }

    /// Adapter for `map_err` in handlers.
    pub fn at(uri: &Uri) -> impl Fn(VotingError) -> ApiError + '_ {
        move |error| ApiError::new(error, request_path(uri))
    }

    pub fn validation(errors: Vec<String>, path: impl Into<String>) -> Self {
        Self::new(VotingError::Validation(errors), path)
    }

    pub(crate) fn identity(status: StatusCode, detail: &'static str, path: impl Into<String>) -> Self {
        Self {
            failure: Failure::Identity { status, detail },
            path: path.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.failure {
            Failure::Voting(e) => e.status(),
            Failure::Identity { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (detail, error_code) = match self.failure {
            Failure::Voting(VotingError::Validation(errors)) => {
                tracing::warn!("Validation failed for {}: {:?}", self.path, errors);
                let body = ValidationErrorBody {
                    detail: "Validation failed".to_string(),
                    errors,
                    kind: "validation_error".to_string(),
                };
                return (status, Json(body)).into_response();
            }
            Failure::Voting(e @ VotingError::Storage(_)) => {
                // Full error stays in the log; clients get a generic message.
                tracing::error!("Internal error for {}: {}", self.path, e);
                ("Internal server error".to_string(), e.error_code().to_string())
            }
            Failure::Voting(e) => (e.to_string(), e.error_code().to_string()),
            Failure::Identity { status, detail } => {
                (detail.to_string(), format!("HTTP_{}", status.as_u16()))
            }
        };

        let body = ErrorEnvelope {
            detail,
            error_code,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            path: self.path,
        };
        (status, Json(body)).into_response()
    }
}

/// Path plus query string, as echoed in error bodies.
pub fn request_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
