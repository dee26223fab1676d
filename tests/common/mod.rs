#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use telegram_extractor_backend::config::{Config, Delivery, SupabaseConfig};
use telegram_extractor_backend::error::{AppError, Result};
use telegram_extractor_backend::models::Credentials;
use telegram_extractor_backend::services::messaging::{
    CodeRequest, Contact, Dialog, DialogKind, Member, MessagingSession, SessionConnector,
    SignInOutcome,
};
use telegram_extractor_backend::services::supabase::{ObjectStore, TableStore};
use telegram_extractor_backend::AppState;

/// Scripted failure; `AppError` itself is not `Clone`.
#[derive(Debug, Clone)]
pub enum Failure {
    Flood(u32),
    Platform(&'static str),
}

impl Failure {
    fn to_error(&self) -> AppError {
        match self {
            Failure::Flood(secs) => AppError::RateLimited { wait_seconds: *secs },
            Failure::Platform(msg) => AppError::Platform(msg.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub dialogs: Vec<Dialog>,
    pub dialogs_failure: Option<Failure>,
    pub contacts: Vec<Contact>,
    pub contacts_failure: Option<Failure>,
    pub invite_links: HashMap<i64, std::result::Result<String, Failure>>,
    pub participants: HashMap<i64, Vec<Member>>,
    pub participants_failure: Option<Failure>,
    pub sign_in: Option<SignInOutcome>,
    /// The stored session is already signed in.
    pub authorized: bool,
}

impl Script {
    pub fn dialog(mut self, id: i64, name: &str, kind: DialogKind, count: Option<i32>) -> Self {
        self.dialogs.push(Dialog {
            id,
            name: name.to_string(),
            kind,
            participants_count: count,
        });
        self
    }

    pub fn invite(mut self, id: i64, link: std::result::Result<&str, Failure>) -> Self {
        self.invite_links.insert(id, link.map(str::to_string));
        self
    }

    pub fn members(mut self, id: i64, members: &[(i64, &str, Option<&str>)]) -> Self {
        self.participants.insert(
            id,
            members
                .iter()
                .map(|(user_id, name, username)| Member {
                    user_id: *user_id,
                    name: name.to_string(),
                    username: username.map(str::to_string),
                })
                .collect(),
        );
        self
    }
}

#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub events: Mutex<Vec<String>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct FakeConnector {
    pub script: Script,
    pub counters: Arc<Counters>,
}

impl FakeConnector {
    pub fn new(script: Script) -> Self {
        FakeConnector {
            script,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn MessagingSession>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.log(format!("open {}", credentials.phone_number));
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            counters: self.counters.clone(),
        }))
    }

    async fn has_session(&self, _credentials: &Credentials) -> Result<bool> {
        Ok(self.script.authorized)
    }

    async fn request_code(&self, credentials: &Credentials) -> Result<CodeRequest> {
        self.counters.log(format!("request_code {}", credentials.phone_number));
        if self.script.authorized {
            Ok(CodeRequest::AlreadyAuthorized)
        } else {
            Ok(CodeRequest::CodeSent)
        }
    }

    async fn sign_in(
        &self,
        _credentials: &Credentials,
        code: &str,
        password: Option<&str>,
    ) -> Result<SignInOutcome> {
        self.counters
            .log(format!("sign_in code={code} password={}", password.is_some()));
        match (self.script.sign_in, password) {
            (Some(SignInOutcome::PasswordRequired), Some(_)) => Ok(SignInOutcome::Authorized),
            (Some(outcome), _) => Ok(outcome),
            (None, _) => Err(AppError::LoginRequired("no pending login".to_string())),
        }
    }

    async fn log_out(&self, credentials: &Credentials) -> Result<()> {
        self.counters.log(format!("log_out {}", credentials.phone_number));
        Ok(())
    }
}

pub struct FakeSession {
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl MessagingSession for FakeSession {
    async fn list_dialogs(&mut self) -> Result<Vec<Dialog>> {
        self.counters.log("list_dialogs".to_string());
        match &self.script.dialogs_failure {
            Some(f) => Err(f.to_error()),
            None => Ok(self.script.dialogs.clone()),
        }
    }

    async fn export_invite_link(&mut self, dialog_id: i64) -> Result<String> {
        self.counters.log(format!("invite {dialog_id}"));
        match self.script.invite_links.get(&dialog_id) {
            Some(Ok(link)) => Ok(link.clone()),
            Some(Err(f)) => Err(f.to_error()),
            None => Err(AppError::Platform("CHAT_ADMIN_REQUIRED".to_string())),
        }
    }

    async fn list_contacts(&mut self) -> Result<Vec<Contact>> {
        self.counters.log("list_contacts".to_string());
        match &self.script.contacts_failure {
            Some(f) => Err(f.to_error()),
            None => Ok(self.script.contacts.clone()),
        }
    }

    async fn list_participants(&mut self, dialog_id: i64) -> Result<Vec<Member>> {
        self.counters.log(format!("participants {dialog_id}"));
        if let Some(f) = &self.script.participants_failure {
            return Err(f.to_error());
        }
        Ok(self
            .script
            .participants
            .get(&dialog_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.log("close".to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub rows: Mutex<Vec<(String, Value)>>,
    pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
}

impl RecordingStore {
    pub fn rows(&self) -> Vec<(String, Value)> {
        self.rows.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableStore for RecordingStore {
    async fn upsert(&self, table: &str, row: Value, _on_conflict: &str) -> Result<()> {
        self.rows.lock().unwrap().push((table.to_string(), row));
        Ok(())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        self.rows.lock().unwrap().push((table.to_string(), row));
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), bytes));
        Ok(format!("https://storage.test/{bucket}/{key}"))
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        api_id: "12345".to_string(),
        api_hash: "0123456789abcdef".to_string(),
        phone_number: "+1 555 0100".to_string(),
    }
}

pub fn request_body(extract_type: &str) -> Value {
    serde_json::json!({
        "api_id": 12345,
        "api_hash": "0123456789abcdef",
        "phone_number": "+1 555 0100",
        "extract_type": extract_type,
    })
}

pub fn test_config(dir: &Path, delivery: Delivery) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        session_dir: dir.join("sessions"),
        export_dir: dir.join("exports"),
        delivery,
        supabase: None,
        throttle: None,
        flood_sleep_threshold: 0,
    }
}

/// State without a throttle or a mirror.
pub fn test_state(dir: &Path, delivery: Delivery, connector: Arc<FakeConnector>) -> AppState {
    AppState::new(test_config(dir, delivery), connector, None, None)
}

/// State whose tables and bucket both record into `store`.
pub fn mirrored_state(
    dir: &Path,
    delivery: Delivery,
    connector: Arc<FakeConnector>,
    store: Arc<RecordingStore>,
) -> AppState {
    let tables: Arc<dyn TableStore> = store.clone();
    let objects: Arc<dyn ObjectStore> = store;
    let mut config = test_config(dir, delivery);
    config.supabase = Some(SupabaseConfig {
        url: "http://localhost:54321".to_string(),
        key: "service-role".to_string(),
        bucket: "my-bucket".to_string(),
        groups_table: "groups".to_string(),
        members_table: "extracted_data".to_string(),
        contacts_table: "contacts".to_string(),
    });
    AppState::new(config, connector, Some(tables), Some(objects))
}
