use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::ThrottleConfig;
use crate::error::Result;
use crate::models::{
    ContactRecord, Credentials, ExtractType, GroupRecord, InviteLink, MemberCount,
    MembershipRecord, NOT_AVAILABLE,
};
use crate::services::messaging::{Contact, MessagingSession, SessionConnector};
use crate::state::SessionLocks;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Groups(Vec<GroupRecord>),
    Contacts(Vec<ContactRecord>),
}

impl Extraction {
    pub fn len(&self) -> usize {
        match self {
            Extraction::Groups(g) => g.len(),
            Extraction::Contacts(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs listing operations inside a session that is always closed afterwards.
pub struct Extractor<'a> {
    connector: &'a dyn SessionConnector,
    locks: &'a SessionLocks,
    throttle: Option<ThrottleConfig>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        connector: &'a dyn SessionConnector,
        locks: &'a SessionLocks,
        throttle: Option<ThrottleConfig>,
    ) -> Self {
        Extractor {
            connector,
            locks,
            throttle,
        }
    }

    pub async fn extract(&self, credentials: &Credentials, mode: ExtractType) -> Result<Extraction> {
        let key = credentials.session_key()?;
        let _guard = self.locks.acquire(&key).await;

        let mut session = self.connector.open(credentials).await?;
        let result = match mode {
            ExtractType::Groups => list_groups(session.as_mut(), self.throttle)
                .await
                .map(Extraction::Groups),
            ExtractType::Contacts => list_contacts(session.as_mut())
                .await
                .map(Extraction::Contacts),
        };
        close(session, &key).await;

        match &result {
            Ok(extraction) => info!(%key, %mode, count = extraction.len(), "extraction finished"),
            Err(e) => warn!(%key, %mode, error = %e, "extraction failed"),
        }
        result
    }

    /// Flattens participant lists of the selected groups, in dialog listing order.
    pub async fn expand_members(
        &self,
        credentials: &Credentials,
        selected: &[i64],
    ) -> Result<Vec<MembershipRecord>> {
        let key = credentials.session_key()?;
        if selected.is_empty() {
            debug!(%key, "no groups selected, nothing to expand");
            return Ok(Vec::new());
        }

        let _guard = self.locks.acquire(&key).await;
        let mut session = self.connector.open(credentials).await?;
        let result = list_memberships(session.as_mut(), selected).await;
        close(session, &key).await;

        match &result {
            Ok(rows) => info!(%key, groups = selected.len(), rows = rows.len(), "membership expanded"),
            Err(e) => warn!(%key, error = %e, "membership expansion failed"),
        }
        result
    }
}

async fn close(session: Box<dyn MessagingSession>, key: &str) {
    if let Err(e) = session.close().await {
        warn!(%key, error = %e, "failed to close session");
    }
}

async fn list_groups(
    session: &mut dyn MessagingSession,
    throttle: Option<ThrottleConfig>,
) -> Result<Vec<GroupRecord>> {
    let dialogs = session.list_dialogs().await?;
    let mut groups = Vec::new();

    for dialog in dialogs.into_iter().filter(|d| d.is_group_or_channel()) {
        let invite_link = match session.export_invite_link(dialog.id).await {
            Ok(link) => InviteLink::Link(link),
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!(group_id = dialog.id, group = %dialog.name, error = %e, "invite link unavailable");
                InviteLink::Unavailable
            }
        };

        groups.push(GroupRecord {
            id: dialog.id,
            name: dialog.name,
            member_count: MemberCount::from_raw(dialog.participants_count),
            invite_link,
        });

        if let Some(throttle) = throttle {
            pause(throttle).await;
        }
    }

    Ok(groups)
}

async fn list_contacts(session: &mut dyn MessagingSession) -> Result<Vec<ContactRecord>> {
    let contacts = session.list_contacts().await?;
    Ok(contacts.into_iter().map(contact_record).collect())
}

async fn list_memberships(
    session: &mut dyn MessagingSession,
    selected: &[i64],
) -> Result<Vec<MembershipRecord>> {
    let wanted: HashSet<i64> = selected.iter().copied().collect();
    let dialogs = session.list_dialogs().await?;

    let mut rows = Vec::new();
    for dialog in dialogs.into_iter().filter(|d| wanted.contains(&d.id)) {
        let members = session.list_participants(dialog.id).await?;
        debug!(group_id = dialog.id, members = members.len(), "listed participants");
        rows.extend(members.into_iter().map(|m| MembershipRecord {
            group_id: dialog.id,
            group_name: dialog.name.clone(),
            user_id: m.user_id,
            user_name: m.name,
            username: m.username,
        }));
    }

    Ok(rows)
}

fn contact_record(contact: Contact) -> ContactRecord {
    let name = format!(
        "{} {}",
        contact.first_name.as_deref().unwrap_or_default(),
        contact.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string();

    ContactRecord {
        id: contact.id,
        name: non_empty_or_placeholder(Some(name)),
        username: non_empty_or_placeholder(contact.username),
        phone: non_empty_or_placeholder(contact.phone),
        status: contact.status,
    }
}

fn non_empty_or_placeholder(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

async fn pause(throttle: ThrottleConfig) {
    let wait = if throttle.max > throttle.min {
        rand::rng().random_range(throttle.min..=throttle.max)
    } else {
        throttle.min
    };
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_placeholders() {
        let rec = contact_record(Contact {
            id: 1,
            first_name: Some("Ann".into()),
            last_name: None,
            username: None,
            phone: Some(String::new()),
            status: "online".into(),
        });
        assert_eq!(rec.name, "Ann");
        assert_eq!(rec.username, NOT_AVAILABLE);
        assert_eq!(rec.phone, NOT_AVAILABLE);

        let rec = contact_record(Contact {
            id: 2,
            first_name: Some("Bo".into()),
            last_name: Some("Li".into()),
            username: Some("boli".into()),
            phone: Some("15550100".into()),
            status: "recently".into(),
        });
        assert_eq!(rec.name, "Bo Li");
        assert_eq!(rec.username, "boli");
        assert_eq!(rec.phone, "15550100");

        let rec = contact_record(Contact {
            id: 3,
            ..Default::default()
        });
        assert_eq!(rec.name, NOT_AVAILABLE);
    }

    #[actix_web::test]
    async fn zero_throttle_does_not_sleep() {
        let started = std::time::Instant::now();
        pause(ThrottleConfig {
            min: std::time::Duration::ZERO,
            max: std::time::Duration::ZERO,
        })
        .await;
        assert!(started.elapsed() < std::time::Duration::from_millis(50));
    }
}
