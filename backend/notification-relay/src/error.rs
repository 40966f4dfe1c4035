use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::ConnectionClosed(_) => 410,
            AppError::Config(_) | AppError::StartServer(_) => 500,
        }
    }

    /// Short machine-readable code, also used in socket `error` frames
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "INVALID_PAYLOAD",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::StartServer(_) => "START_FAILURE",
            AppError::ConnectionClosed(_) => "CONNECTION_CLOSED",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(json!({
            "success": false,
            "code": self.code(),
            "error": self.to_string(),
        }))
    }
}
