use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use xrag::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Failed to parse spectrum: {0}")]
    Spectrum(#[from] PipelineError),

    #[error("Knowledge store error: {0}")]
    Knowledge(#[from] knowledge::KnowledgeError),

    #[error("Knowledge store unavailable: {0}")]
    StoreDisabled(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Spectrum(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Knowledge(_) => StatusCode::BAD_GATEWAY,
            ServerError::StoreDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Spectrum(err) if err.is_empty_input() => "EMPTY_SPECTRUM",
            ServerError::Spectrum(_) => "INVALID_SPECTRUM",
            ServerError::Knowledge(_) => "KNOWLEDGE_ERROR",
            ServerError::StoreDisabled(_) => "KNOWLEDGE_DISABLED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = %error_code, %message, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        ServerError::BadRequest(format!("invalid multipart body: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrag::SpectrumError;

    #[test]
    fn spectrum_errors_map_to_bad_request_codes() {
        let empty = ServerError::from(PipelineError::Parse(SpectrumError::EmptySpectrum));
        assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(empty.error_code(), "EMPTY_SPECTRUM");

        let invalid = ServerError::from(PipelineError::Parse(SpectrumError::MissingColumn {
            column: "energy".into(),
        }));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.error_code(), "INVALID_SPECTRUM");
        assert!(invalid.to_string().contains("energy"));
    }

    #[test]
    fn not_found_and_internal() {
        assert_eq!(ServerError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
