use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::FlavorError;

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

impl FlavorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FlavorError::EntityNotFound(_) | FlavorError::RelationshipNotFound(_) => StatusCode::NOT_FOUND,
            FlavorError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            FlavorError::SearchLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlavorError::SearchTimedOut => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FlavorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            log::debug!("Request rejected ({}): {}", status, self);
            self.to_string()
        };

        let body = ErrorBody {
            error: self.kind().to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
