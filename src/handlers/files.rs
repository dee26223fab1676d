use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::{ExtractionRequest, SelectedItem};
use crate::services::export::{render_csv, ExportArtifact};
use crate::state::AppState;

const SELECTION_FILENAME: &str = "data.csv";

#[derive(Debug, Deserialize)]
pub struct DownloadCsvRequest {
    #[serde(default, alias = "selectedItems")]
    pub selected_items: Vec<SelectedItem>,
}

fn attachment(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .append_header(("Content-Type", "text/csv; charset=utf-8"))
        .append_header(("Content-Disposition", format!("attachment; filename=\"{}\"", filename)))
        .body(bytes)
}

/// Writes the picked rows to `<export_dir>/data.csv` and returns it as an attachment.
pub async fn download_csv(
    data: web::Json<DownloadCsvRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let items = data.into_inner().selected_items;
    let bytes = render_csv(&items)?;

    let path = state.exporter().write_local(SELECTION_FILENAME, &bytes).await?;
    tracing::info!(rows = items.len(), path = %path.display(), "selection exported");

    Ok(attachment(SELECTION_FILENAME, bytes))
}

/// Expands membership of the selected groups, mirrors the rows and exports them.
pub async fn extract_data(
    data: web::Json<ExtractionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = data.into_inner();
    let mode = req.validated_mode()?;

    let rows = state
        .extractor()
        .expand_members(&req.credentials, &req.selected_groups)
        .await?;
    let mirror = state.mirror().mirror_memberships(&rows).await;

    let filename = format!("telegram_{mode}.csv");
    let exporter = state.exporter();
    match exporter.export(&filename, &rows).await? {
        ExportArtifact::Inline { filename, bytes } => Ok(attachment(&filename, bytes)),
        artifact => Ok(HttpResponse::Ok().json(json!({
            "downloadUrl": artifact.location(),
            "rowCount": rows.len(),
            "delivery": exporter.delivery().to_string(),
            "mirror": mirror,
        }))),
    }
}
