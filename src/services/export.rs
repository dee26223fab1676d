use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Delivery;
use crate::error::{AppError, Result};
use crate::models::{ContactRecord, GroupRecord, MembershipRecord, SelectedItem};
use crate::services::supabase::ObjectStore;

pub const CSV_MIME: &str = "text/csv";

/// A record with a fixed CSV column layout.
pub trait CsvRow {
    const HEADER: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

impl CsvRow for GroupRecord {
    const HEADER: &'static [&'static str] = &["Name", "ID", "Member Count", "Invite Link"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.id.to_string(),
            self.member_count.to_string(),
            self.invite_link.as_str().to_string(),
        ]
    }
}

impl CsvRow for ContactRecord {
    const HEADER: &'static [&'static str] = &["Name", "ID", "Username", "Phone", "Status"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.id.to_string(),
            self.username.clone(),
            self.phone.clone(),
            self.status.clone(),
        ]
    }
}

impl CsvRow for MembershipRecord {
    const HEADER: &'static [&'static str] =
        &["Group Name", "Group ID", "Member Name", "Username", "User ID"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.group_name.clone(),
            self.group_id.to_string(),
            self.user_name.clone(),
            self.username.clone().unwrap_or_default(),
            self.user_id.to_string(),
        ]
    }
}

impl CsvRow for SelectedItem {
    const HEADER: &'static [&'static str] =
        &["Name", "ID", "Member Count/Phone", "Invite Link/Username"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.id_text(),
            self.count_or_phone(),
            self.link_or_username(),
        ]
    }
}

/// Header row, then one row per record, in order.
pub fn render_csv<R: CsvRow>(records: &[R]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(R::HEADER)?;
    for record in records {
        writer.write_record(record.fields())?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

/// Where an export ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    Inline { filename: String, bytes: Vec<u8> },
    Local { path: PathBuf },
    Remote { url: String },
}

impl ExportArtifact {
    /// Path or URL the caller can fetch the file from; `None` for inline.
    pub fn location(&self) -> Option<String> {
        match self {
            ExportArtifact::Inline { .. } => None,
            ExportArtifact::Local { path } => Some(path.display().to_string()),
            ExportArtifact::Remote { url } => Some(url.clone()),
        }
    }
}

pub struct CsvExporter {
    delivery: Delivery,
    export_dir: PathBuf,
    objects: Option<Arc<dyn ObjectStore>>,
    bucket: String,
}

impl CsvExporter {
    pub fn new(
        delivery: Delivery,
        export_dir: impl Into<PathBuf>,
        objects: Option<Arc<dyn ObjectStore>>,
        bucket: impl Into<String>,
    ) -> Self {
        CsvExporter {
            delivery,
            export_dir: export_dir.into(),
            objects,
            bucket: bucket.into(),
        }
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Renders `records` and hands them off with the configured delivery.
    pub async fn export<R: CsvRow>(&self, filename: &str, records: &[R]) -> Result<ExportArtifact> {
        let bytes = render_csv(records)?;
        let artifact = self.deliver(self.delivery, filename, bytes).await?;
        info!(
            filename,
            rows = records.len(),
            delivery = %self.delivery,
            "exported csv"
        );
        Ok(artifact)
    }

    pub async fn deliver(
        &self,
        delivery: Delivery,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ExportArtifact> {
        match delivery {
            Delivery::Inline => Ok(ExportArtifact::Inline {
                filename: filename.to_string(),
                bytes,
            }),
            Delivery::Local => {
                let path = self.write_local(filename, &bytes).await?;
                Ok(ExportArtifact::Local { path })
            }
            Delivery::Remote => {
                let objects = self.objects.as_ref().ok_or_else(|| {
                    AppError::Config("remote delivery needs a configured object store".to_string())
                })?;
                let url = objects
                    .upload(&self.bucket, filename, bytes, CSV_MIME)
                    .await?;
                Ok(ExportArtifact::Remote { url })
            }
        }
    }

    /// Overwrites `<export_dir>/<filename>`.
    pub async fn write_local(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let path = self.export_dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
