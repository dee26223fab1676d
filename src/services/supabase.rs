use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::SupabaseConfig;
use crate::error::{AppError, Result};

/// Row-level writes into a hosted table.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<()>;
    async fn insert(&self, table: &str, row: Value) -> Result<()>;
}

/// File uploads with public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads (overwriting) `key` in `bucket` and returns its public URL.
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String>;
}

/// Supabase over its REST surfaces: PostgREST for tables, Storage for files.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(SupabaseClient {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key)
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, key)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<()> {
        let res = self.authorized(req).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("{what} failed: {status} - {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<()> {
        let req = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.send(req, &format!("upsert into {table}")).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        let req = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(req, &format!("insert into {table}")).await
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let size = bytes.len();
        let req = self
            .client
            .post(self.object_url(bucket, key))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send(req, &format!("upload of {bucket}/{key}")).await?;

        debug!(bucket, key, size, "uploaded object");
        Ok(self.public_url(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: "https://proj.supabase.co/".into(),
            key: "anon".into(),
            bucket: "my-bucket".into(),
            groups_table: "groups".into(),
            members_table: "extracted_data".into(),
            contacts_table: "contacts".into(),
        })
        .unwrap()
    }

    #[test]
    fn builds_rest_urls() {
        let sb = client();
        assert_eq!(sb.table_url("groups"), "https://proj.supabase.co/rest/v1/groups");
        assert_eq!(
            sb.object_url("my-bucket", "telegram_groups.csv"),
            "https://proj.supabase.co/storage/v1/object/my-bucket/telegram_groups.csv"
        );
        assert_eq!(
            sb.public_url("my-bucket", "telegram_groups.csv"),
            "https://proj.supabase.co/storage/v1/object/public/my-bucket/telegram_groups.csv"
        );
    }
}
