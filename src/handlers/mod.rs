pub mod auth;
pub mod files;
pub mod telegram;

use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::AppError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/", web::get().to(main))
        .route("/health", web::get().to(health_check))

        .route("/extract", web::post().to(telegram::extract))
        .route("/api/fetch-data", web::post().to(telegram::fetch_data))

        .route("/download_csv", web::post().to(files::download_csv))
        .route("/api/extract-data", web::post().to(files::extract_data))

        .route("/api/auth/check-session", web::post().to(auth::check_session))
        .route("/api/auth/request-code", web::post().to(auth::request_code))
        .route("/api/auth/verify", web::post().to(auth::verify))
        .route("/api/auth/logout", web::post().to(auth::logout));
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InvalidRequest(format!("Invalid JSON body: {err}")).into()
}

pub async fn main() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "endpoints": [
            "POST /extract",
            "POST /download_csv",
            "POST /api/fetch-data",
            "POST /api/extract-data",
            "POST /api/auth/check-session",
            "POST /api/auth/request-code",
            "POST /api/auth/verify",
            "POST /api/auth/logout",
        ]
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
