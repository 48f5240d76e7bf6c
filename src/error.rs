use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: String, to: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for DataSourceError {
    fn from(err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => DataSourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            },
            _ => DataSourceError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DataSourceError {
    fn from(err: serde_json::Error) -> Self {
        DataSourceError::MalformedResponse(err.to_string())
    }
}

impl DataSourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DataSourceError::InvalidTimeRange { .. } | DataSourceError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            DataSourceError::Transport(_)
            | DataSourceError::Status { .. }
            | DataSourceError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            DataSourceError::Config(_) | DataSourceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DataSourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DataSourceError>;
