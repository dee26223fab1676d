use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppError;
use crate::models::ExtractionRequest;
use crate::services::extraction::Extraction;
use crate::state::AppState;

/// Lists groups or contacts and returns them as a bare JSON array.
pub async fn extract(
    data: web::Json<ExtractionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = data.into_inner();
    let mode = req.validated_mode()?;

    let extraction = state.extractor().extract(&req.credentials, mode).await?;
    Ok(HttpResponse::Ok().json(extraction))
}

/// Same listing, wrapped in `{data}`, with every record mirrored when Supabase is configured.
pub async fn fetch_data(
    data: web::Json<ExtractionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = data.into_inner();
    let mode = req.validated_mode()?;

    let extraction = state.extractor().extract(&req.credentials, mode).await?;
    let mirror = state.mirror();
    let mirror = match &extraction {
        Extraction::Groups(groups) => mirror.mirror_groups(groups).await,
        Extraction::Contacts(contacts) => mirror.mirror_contacts(contacts).await,
    };

    Ok(HttpResponse::Ok().json(json!({
        "data": extraction,
        "mirror": mirror,
    })))
}
