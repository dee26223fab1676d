use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::Credentials;
use crate::services::messaging::{CodeRequest, SignInOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default, alias = "validationCode")]
    pub code: String,
    #[serde(default, alias = "twoFactorPassword")]
    pub password: Option<String>,
}

pub async fn check_session(
    data: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let credentials = data.into_inner();
    credentials.validate()?;

    let _guard = state.session_locks.acquire(&credentials.session_key()?).await;
    let has_session = state.connector.has_session(&credentials).await?;

    Ok(HttpResponse::Ok().json(json!({ "hasSession": has_session })))
}

pub async fn request_code(
    data: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let credentials = data.into_inner();
    credentials.validate()?;

    let _guard = state.session_locks.acquire(&credentials.session_key()?).await;
    let body = match state.connector.request_code(&credentials).await? {
        CodeRequest::CodeSent => json!({
            "success": true,
            "requiresValidation": true,
            "message": "Validation code sent"
        }),
        CodeRequest::AlreadyAuthorized => json!({
            "success": true,
            "requiresValidation": false,
            "message": "Session already authorized. You can extract data."
        }),
    };

    Ok(HttpResponse::Ok().json(body))
}

pub async fn verify(
    data: web::Json<VerifyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = data.into_inner();
    req.credentials.validate()?;

    let password = req.password.as_deref().filter(|p| !p.is_empty());
    if req.code.trim().is_empty() && password.is_none() {
        return Err(AppError::InvalidRequest(
            "A verification code or 2FA password is required".to_string(),
        ));
    }

    let _guard = state
        .session_locks
        .acquire(&req.credentials.session_key()?)
        .await;
    let outcome = state
        .connector
        .sign_in(&req.credentials, &req.code, password)
        .await?;

    Ok(match outcome {
        SignInOutcome::Authorized => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Authentication successful. You can now extract data."
        })),
        SignInOutcome::PasswordRequired => HttpResponse::Ok().json(json!({
            "success": false,
            "requires2FA": true,
            "message": "Please enter your 2FA password."
        })),
    })
}

pub async fn logout(
    data: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let credentials = data.into_inner();
    credentials.validate()?;

    let _guard = state.session_locks.acquire(&credentials.session_key()?).await;
    state.connector.log_out(&credentials).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out successfully."
    })))
}
