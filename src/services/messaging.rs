//! Port to the messaging platform's client API.
//!
//! The orchestrator only talks to these traits. The production implementation
//! lives in `services::telegram`; integration tests plug in fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    User,
    Group,
    Channel,
}

/// A conversation entry as listed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub id: i64,
    pub name: String,
    pub kind: DialogKind,
    pub participants_count: Option<i32>,
}

impl Dialog {
    pub fn is_group_or_channel(&self) -> bool {
        matches!(self.kind, DialogKind::Group | DialogKind::Channel)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contact {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub user_id: i64,
    pub name: String,
    pub username: Option<String>,
}

/// Result of asking for a login code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRequest {
    CodeSent,
    /// The stored session is already signed in; no code was sent.
    AlreadyAuthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    Authorized,
    PasswordRequired,
}

/// An open, authorized session.
///
/// `export_invite_link` and `list_participants` take ids previously returned
/// by `list_dialogs` on the same session.
#[async_trait]
pub trait MessagingSession: Send {
    async fn list_dialogs(&mut self) -> Result<Vec<Dialog>>;
    async fn export_invite_link(&mut self, dialog_id: i64) -> Result<String>;
    async fn list_contacts(&mut self) -> Result<Vec<Contact>>;
    async fn list_participants(&mut self, dialog_id: i64) -> Result<Vec<Member>>;

    /// Persists session state and drops the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Resumes the stored session; fails with `LoginRequired` if it is not authorized.
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn MessagingSession>>;

    async fn has_session(&self, credentials: &Credentials) -> Result<bool>;
    async fn request_code(&self, credentials: &Credentials) -> Result<CodeRequest>;
    async fn sign_in(
        &self,
        credentials: &Credentials,
        code: &str,
        password: Option<&str>,
    ) -> Result<SignInOutcome>;
    async fn log_out(&self, credentials: &Credentials) -> Result<()>;
}
