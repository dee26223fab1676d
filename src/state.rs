use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::Config;
use crate::error::Result;
use crate::services::export::CsvExporter;
use crate::services::extraction::Extractor;
use crate::services::messaging::SessionConnector;
use crate::services::mirror::{MetadataMirror, MirrorTables};
use crate::services::supabase::{ObjectStore, SupabaseClient, TableStore};
use crate::services::telegram::TelegramConnector;

pub type SessionKey = String;

/// One async mutex per phone number, so two requests never drive the same
/// session file at once.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connector: Arc<dyn SessionConnector>,
    pub tables: Option<Arc<dyn TableStore>>,
    pub objects: Option<Arc<dyn ObjectStore>>,
    pub session_locks: SessionLocks,
}

impl AppState {
    pub fn new(
        config: Config,
        connector: Arc<dyn SessionConnector>,
        tables: Option<Arc<dyn TableStore>>,
        objects: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            tables,
            objects,
            session_locks: SessionLocks::default(),
        }
    }

    /// Production wiring: grammers-backed sessions plus Supabase when configured.
    pub fn from_config(config: Config) -> Result<Self> {
        let connector: Arc<dyn SessionConnector> = Arc::new(TelegramConnector::new(
            config.session_dir.clone(),
            config.flood_sleep_threshold,
        ));

        let (tables, objects) = match &config.supabase {
            Some(sb) => {
                let client = Arc::new(SupabaseClient::new(sb)?);
                let tables: Arc<dyn TableStore> = client.clone();
                let objects: Arc<dyn ObjectStore> = client;
                (Some(tables), Some(objects))
            }
            None => (None, None),
        };

        Ok(Self::new(config, connector, tables, objects))
    }

    pub fn extractor(&self) -> Extractor<'_> {
        Extractor::new(
            self.connector.as_ref(),
            &self.session_locks,
            self.config.throttle,
        )
    }

    pub fn exporter(&self) -> CsvExporter {
        let bucket = self
            .config
            .supabase
            .as_ref()
            .map(|sb| sb.bucket.clone())
            .unwrap_or_default();
        CsvExporter::new(
            self.config.delivery,
            self.config.export_dir.clone(),
            self.objects.clone(),
            bucket,
        )
    }

    pub fn mirror(&self) -> MetadataMirror {
        let names = match &self.config.supabase {
            Some(sb) => MirrorTables {
                groups: sb.groups_table.clone(),
                members: sb.members_table.clone(),
                contacts: sb.contacts_table.clone(),
            },
            None => MirrorTables::default(),
        };
        MetadataMirror::new(self.tables.clone(), names)
    }
}
