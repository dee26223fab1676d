use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use grammers_client::types::{Chat, LoginToken, PasswordToken};
use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_mtsender::{AuthorizationError, InvocationError};
use grammers_session::Session;
use grammers_tl_types as tl;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::Credentials;
use crate::services::messaging::{
    CodeRequest, Contact, Dialog, DialogKind, Member, MessagingSession, SessionConnector,
    SignInOutcome,
};

/// Login codes stop being accepted well before this.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);

/// Login started by `request_code` and not finished yet.
enum PendingLogin {
    Code {
        client: Client,
        token: LoginToken,
        path: PathBuf,
    },
    Password {
        client: Client,
        token: PasswordToken,
        path: PathBuf,
    },
}

/// Logins waiting for a code or password, keyed by phone digits.
///
/// Every access first drops entries older than `ttl`, which disconnects the
/// clients they hold.
struct PendingLogins<T> {
    ttl: Duration,
    entries: HashMap<String, (Instant, T)>,
}

impl<T> PendingLogins<T> {
    fn new(ttl: Duration) -> Self {
        PendingLogins {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, key: String, login: T) {
        let now = Instant::now();
        self.evict_stale(now);
        self.entries.insert(key, (now, login));
    }

    fn take(&mut self, key: &str) -> Option<T> {
        self.evict_stale(Instant::now());
        self.entries.remove(key).map(|(_, login)| login)
    }

    fn evict_stale(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (started, _)| now.saturating_duration_since(*started) < ttl);

        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "dropped stale pending logins");
        }
        evicted
    }
}

/// Opens Telegram user sessions backed by one session file per phone number.
pub struct TelegramConnector {
    session_dir: PathBuf,
    flood_sleep_threshold: u32,
    pending: Mutex<PendingLogins<PendingLogin>>,
}

impl TelegramConnector {
    pub fn new(session_dir: impl Into<PathBuf>, flood_sleep_threshold: u32) -> Self {
        TelegramConnector {
            session_dir: session_dir.into(),
            flood_sleep_threshold,
            pending: Mutex::new(PendingLogins::new(PENDING_LOGIN_TTL)),
        }
    }

    fn session_path(&self, credentials: &Credentials) -> Result<PathBuf> {
        Ok(session_file(&self.session_dir, &credentials.session_key()?))
    }

    async fn connect(&self, credentials: &Credentials) -> Result<(Client, PathBuf)> {
        let api_id = credentials.api_id.trim().parse::<i32>().map_err(|_| {
            AppError::InvalidRequest(format!("api_id must be numeric (got {})", credentials.api_id))
        })?;
        let path = self.session_path(credentials)?;
        tokio::fs::create_dir_all(&self.session_dir).await?;

        let session = Session::load_file_or_create(&path)?;
        let client = Client::connect(ClientConfig {
            session,
            api_id,
            api_hash: credentials.api_hash.trim().to_string(),
            params: InitParams {
                catch_up: false,
                flood_sleep_threshold: self.flood_sleep_threshold,
                ..Default::default()
            },
        })
        .await
        .map_err(|e| AppError::Platform(format!("failed to connect: {e}")))?;

        debug!(session = %path.display(), "connected to telegram");
        Ok((client, path))
    }

    async fn finish_with_password(
        &self,
        key: String,
        client: Client,
        token: PasswordToken,
        password: &str,
        path: PathBuf,
    ) -> Result<SignInOutcome> {
        match client.check_password(token, password.trim()).await {
            Ok(_) => {
                save_session(&client, &path)?;
                info!(session = %path.display(), "signed in with 2FA password");
                Ok(SignInOutcome::Authorized)
            }
            Err(SignInError::InvalidPassword) => {
                debug!(%key, "invalid 2FA password, pending login dropped");
                Err(AppError::InvalidRequest(
                    "Invalid 2FA password. Request a new code and try again.".to_string(),
                ))
            }
            Err(e) => Err(map_sign_in(e)),
        }
    }
}

#[async_trait]
impl SessionConnector for TelegramConnector {
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn MessagingSession>> {
        let (client, path) = self.connect(credentials).await?;
        if !client.is_authorized().await.map_err(map_invocation)? {
            return Err(AppError::LoginRequired(format!(
                "no authorized session for {}; request a login code first",
                credentials.phone_number
            )));
        }
        Ok(Box::new(TelegramSession {
            client,
            path,
            chats: HashMap::new(),
        }))
    }

    async fn has_session(&self, credentials: &Credentials) -> Result<bool> {
        if !self.session_path(credentials)?.exists() {
            return Ok(false);
        }
        let (client, _) = self.connect(credentials).await?;
        client.is_authorized().await.map_err(map_invocation)
    }

    async fn request_code(&self, credentials: &Credentials) -> Result<CodeRequest> {
        let key = credentials.session_key()?;
        let (client, path) = self.connect(credentials).await?;
        if client.is_authorized().await.map_err(map_invocation)? {
            info!(%key, "session already authorized, no code needed");
            return Ok(CodeRequest::AlreadyAuthorized);
        }

        let token = client
            .request_login_code(credentials.phone_number.trim())
            .await
            .map_err(map_authorization)?;
        save_session(&client, &path)?;

        self.pending
            .lock()
            .await
            .insert(key, PendingLogin::Code { client, token, path });
        Ok(CodeRequest::CodeSent)
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
        code: &str,
        password: Option<&str>,
    ) -> Result<SignInOutcome> {
        let key = credentials.session_key()?;
        let pending = self.pending.lock().await.take(&key).ok_or_else(|| {
            AppError::InvalidRequest(
                "No pending login for this phone number; request a code first".to_string(),
            )
        })?;

        match pending {
            PendingLogin::Code { client, token, path } => {
                match client.sign_in(&token, code.trim()).await {
                    Ok(_) => {
                        save_session(&client, &path)?;
                        info!(session = %path.display(), "signed in");
                        Ok(SignInOutcome::Authorized)
                    }
                    Err(SignInError::PasswordRequired(password_token)) => match password {
                        Some(pw) => {
                            self.finish_with_password(key, client, password_token, pw, path)
                                .await
                        }
                        None => {
                            self.pending.lock().await.insert(
                                key,
                                PendingLogin::Password {
                                    client,
                                    token: password_token,
                                    path,
                                },
                            );
                            Ok(SignInOutcome::PasswordRequired)
                        }
                    },
                    Err(SignInError::InvalidCode) => {
                        self.pending
                            .lock()
                            .await
                            .insert(key, PendingLogin::Code { client, token, path });
                        Err(AppError::InvalidRequest("Invalid verification code".to_string()))
                    }
                    Err(e) => Err(map_sign_in(e)),
                }
            }
            PendingLogin::Password { client, token, path } => match password {
                Some(pw) => self.finish_with_password(key, client, token, pw, path).await,
                None => {
                    self.pending
                        .lock()
                        .await
                        .insert(key, PendingLogin::Password { client, token, path });
                    Ok(SignInOutcome::PasswordRequired)
                }
            },
        }
    }

    async fn log_out(&self, credentials: &Credentials) -> Result<()> {
        let key = credentials.session_key()?;
        self.pending.lock().await.take(&key);

        let path = self.session_path(credentials)?;
        if !path.exists() {
            return Ok(());
        }

        let (client, _) = self.connect(credentials).await?;
        if client.is_authorized().await.map_err(map_invocation)? {
            if let Err(e) = client.sign_out().await {
                warn!(%key, error = %e, "sign out failed, removing session file anyway");
            }
        }
        drop(client);

        tokio::fs::remove_file(&path).await?;
        info!(session = %path.display(), "session removed");
        Ok(())
    }
}

struct TelegramSession {
    client: Client,
    path: PathBuf,
    chats: HashMap<i64, Chat>,
}

impl TelegramSession {
    fn chat(&self, dialog_id: i64) -> Result<&Chat> {
        self.chats.get(&dialog_id).ok_or_else(|| {
            AppError::InvalidRequest(format!("dialog {dialog_id} was not listed in this session"))
        })
    }
}

#[async_trait]
impl MessagingSession for TelegramSession {
    async fn list_dialogs(&mut self) -> Result<Vec<Dialog>> {
        let mut iter = self.client.iter_dialogs();
        let mut dialogs = Vec::new();

        while let Some(dialog) = iter.next().await.map_err(map_invocation)? {
            let chat = dialog.chat();
            let kind = match chat {
                Chat::User(_) => DialogKind::User,
                Chat::Group(_) => DialogKind::Group,
                Chat::Channel(_) => DialogKind::Channel,
            };
            dialogs.push(Dialog {
                id: chat.id(),
                name: chat.name().to_string(),
                kind,
                participants_count: participants_count(chat),
            });
            self.chats.insert(chat.id(), chat.clone());
        }

        Ok(dialogs)
    }

    async fn export_invite_link(&mut self, dialog_id: i64) -> Result<String> {
        let peer = self.chat(dialog_id)?.pack().to_input_peer();
        let exported = self
            .client
            .invoke(&tl::functions::messages::ExportChatInvite {
                legacy_revoke_permanent: false,
                request_needed: false,
                peer,
                expire_date: None,
                usage_limit: None,
                title: None,
                subscription_pricing: None,
            })
            .await
            .map_err(map_invocation)?;

        match exported {
            tl::enums::ExportedChatInvite::ChatInviteExported(invite) => Ok(invite.link),
            _ => Err(AppError::Platform(format!(
                "dialog {dialog_id} only exposes join requests"
            ))),
        }
    }

    async fn list_contacts(&mut self) -> Result<Vec<Contact>> {
        let result = self
            .client
            .invoke(&tl::functions::contacts::GetContacts { hash: 0 })
            .await
            .map_err(map_invocation)?;

        let users = match result {
            tl::enums::contacts::Contacts::Contacts(contacts) => contacts.users,
            tl::enums::contacts::Contacts::NotModified => Vec::new(),
        };

        Ok(users
            .into_iter()
            .filter_map(|user| match user {
                tl::enums::User::User(u) => Some(Contact {
                    id: u.id,
                    first_name: u.first_name,
                    last_name: u.last_name,
                    username: u.username,
                    phone: u.phone,
                    status: status_label(u.status.as_ref()).to_string(),
                }),
                tl::enums::User::Empty(_) => None,
            })
            .collect())
    }

    async fn list_participants(&mut self, dialog_id: i64) -> Result<Vec<Member>> {
        let packed = self.chat(dialog_id)?.pack();
        let mut iter = self.client.iter_participants(packed);
        let mut members = Vec::new();

        while let Some(participant) = iter.next().await.map_err(map_invocation)? {
            let user = participant.user;
            members.push(Member {
                user_id: user.id(),
                name: user.full_name(),
                username: user.username().map(str::to_string),
            });
        }

        Ok(members)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        save_session(&self.client, &self.path)?;
        debug!(session = %self.path.display(), "session closed");
        Ok(())
    }
}

fn session_file(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.session"))
}

fn save_session(client: &Client, path: &Path) -> Result<()> {
    client.session().save_to_file(path)?;
    Ok(())
}

fn participants_count(chat: &Chat) -> Option<i32> {
    match chat {
        Chat::Group(group) => match &group.raw {
            tl::enums::Chat::Chat(basic) => Some(basic.participants_count),
            tl::enums::Chat::Channel(mega) => mega.participants_count,
            _ => None,
        },
        Chat::Channel(channel) => channel.raw.participants_count,
        Chat::User(_) => None,
    }
}

fn status_label(status: Option<&tl::enums::UserStatus>) -> &'static str {
    match status {
        Some(tl::enums::UserStatus::Online(_)) => "online",
        Some(tl::enums::UserStatus::Offline(_)) => "offline",
        Some(tl::enums::UserStatus::Recently(_)) => "recently",
        Some(tl::enums::UserStatus::LastWeek(_)) => "last_week",
        Some(tl::enums::UserStatus::LastMonth(_)) => "last_month",
        Some(tl::enums::UserStatus::Empty) | None => "unknown",
    }
}

fn map_authorization(err: AuthorizationError) -> AppError {
    match err {
        AuthorizationError::Invoke(e) => map_invocation(e),
        other => AppError::Platform(format!("failed to request login code: {other}")),
    }
}

fn map_sign_in(err: SignInError) -> AppError {
    match err {
        SignInError::Other(e) => map_invocation(e),
        other => AppError::Platform(other.to_string()),
    }
}

/// Flood waits become `RateLimited`, an unregistered auth key becomes `LoginRequired`.
fn map_invocation(err: InvocationError) -> AppError {
    match err {
        InvocationError::Rpc(rpc) if rpc.name.starts_with("FLOOD_") && rpc.name.ends_with("WAIT") => {
            AppError::RateLimited {
                wait_seconds: rpc.value.unwrap_or(0),
            }
        }
        InvocationError::Rpc(rpc) if rpc.code == 401 => AppError::LoginRequired(rpc.name),
        other => AppError::Platform(other.to_string()),
    }
}
