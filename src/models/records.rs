use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Placeholder for optional contact fields the platform did not return.
pub const NOT_AVAILABLE: &str = "N/A";
/// Recorded when an invite link could not be minted.
pub const LINK_UNAVAILABLE: &str = "Private or No Link Available";

const UNKNOWN_COUNT: &str = "unknown";

/// Participant count of a group: a number, or `"unknown"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberCount {
    Known(u32),
    Unknown,
}

impl MemberCount {
    pub fn from_raw(raw: Option<i32>) -> Self {
        match raw.and_then(|n| u32::try_from(n).ok()) {
            Some(n) => MemberCount::Known(n),
            None => MemberCount::Unknown,
        }
    }
}

impl fmt::Display for MemberCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberCount::Known(n) => write!(f, "{n}"),
            MemberCount::Unknown => f.write_str(UNKNOWN_COUNT),
        }
    }
}

impl Serialize for MemberCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MemberCount::Known(n) => serializer.serialize_u32(*n),
            MemberCount::Unknown => serializer.serialize_str(UNKNOWN_COUNT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteLink {
    Link(String),
    Unavailable,
}

impl InviteLink {
    pub fn as_str(&self) -> &str {
        match self {
            InviteLink::Link(link) => link,
            InviteLink::Unavailable => LINK_UNAVAILABLE,
        }
    }
}

impl Serialize for InviteLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "members_count")]
    pub member_count: MemberCount,
    pub invite_link: InviteLink,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub phone: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipRecord {
    pub group_id: i64,
    pub group_name: String,
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
}

/// One row picked in the frontend for `/download_csv`.
///
/// The shape is loose on purpose: rows come back from either a groups or a
/// contacts listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectedItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, alias = "memberCount")]
    pub members_count: Option<Value>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl SelectedItem {
    pub fn id_text(&self) -> String {
        value_text(&self.id)
    }

    pub fn count_or_phone(&self) -> String {
        match (&self.members_count, &self.phone) {
            (Some(count), _) if !count.is_null() => value_text(count),
            (_, Some(phone)) => phone.clone(),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn link_or_username(&self) -> String {
        self.invite_link
            .as_ref()
            .or(self.username.as_ref())
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => NOT_AVAILABLE.to_string(),
        other => other.to_string(),
    }
}
