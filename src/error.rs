use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

/// Crate-wide error.
///
/// Every failure a handler can hit maps to one of these, and the HTTP status
/// is decided here so handlers can just use `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Rate limit hit. Please wait {wait_seconds} seconds before trying again.")]
    RateLimited { wait_seconds: u32 },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("login required: {0}")]
    LoginRequired(String),

    #[error("telegram error: {0}")]
    Platform(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::LoginRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::RateLimited { wait_seconds } => builder
                .insert_header((header::RETRY_AFTER, wait_seconds.to_string()))
                .json(json!({
                    "error": self.to_string(),
                    "retry_after": wait_seconds,
                })),
            _ => builder.json(json!({ "error": self.to_string() })),
        }
    }
}
