use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{ContactRecord, GroupRecord, MembershipRecord};
use crate::services::supabase::TableStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub attempted: usize,
    pub failed: usize,
}

/// Copies exported records into hosted tables.
///
/// One request per record. A failed row is logged and skipped; rows already
/// written stay written.
pub struct MetadataMirror {
    tables: Option<Arc<dyn TableStore>>,
    names: MirrorTables,
}

/// Destination table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTables {
    pub groups: String,
    pub members: String,
    pub contacts: String,
}

impl Default for MirrorTables {
    fn default() -> Self {
        MirrorTables {
            groups: "groups".to_string(),
            members: "extracted_data".to_string(),
            contacts: "contacts".to_string(),
        }
    }
}

impl MetadataMirror {
    pub fn new(tables: Option<Arc<dyn TableStore>>, names: MirrorTables) -> Self {
        MetadataMirror { tables, names }
    }

    pub fn is_enabled(&self) -> bool {
        self.tables.is_some()
    }

    pub async fn mirror_groups(&self, groups: &[GroupRecord]) -> MirrorReport {
        let Some(tables) = &self.tables else {
            return MirrorReport::default();
        };

        let mut report = MirrorReport::default();
        for group in groups {
            report.attempted += 1;
            let row = serde_json::json!({
                "id": group.id,
                "group_name": group.name,
                "members_count": group.member_count,
                "invite_link": group.invite_link,
            });
            if let Err(e) = tables.upsert(&self.names.groups, row, "id").await {
                report.failed += 1;
                warn!(table = %self.names.groups, group_id = group.id, error = %e, "group upsert failed");
            }
        }

        info!(table = %self.names.groups, attempted = report.attempted, failed = report.failed, "mirrored groups");
        report
    }

    /// Upserts contacts keyed by user id.
    pub async fn mirror_contacts(&self, contacts: &[ContactRecord]) -> MirrorReport {
        let Some(tables) = &self.tables else {
            return MirrorReport::default();
        };

        let mut report = MirrorReport::default();
        for contact in contacts {
            report.attempted += 1;
            let row = serde_json::json!({
                "id": contact.id,
                "name": contact.name,
                "username": contact.username,
                "phone_number": contact.phone,
                "status": contact.status,
            });
            if let Err(e) = tables.upsert(&self.names.contacts, row, "id").await {
                report.failed += 1;
                warn!(table = %self.names.contacts, contact_id = contact.id, error = %e, "contact upsert failed");
            }
        }

        info!(table = %self.names.contacts, attempted = report.attempted, failed = report.failed, "mirrored contacts");
        report
    }

    pub async fn mirror_memberships(&self, rows: &[MembershipRecord]) -> MirrorReport {
        let Some(tables) = &self.tables else {
            return MirrorReport::default();
        };

        let mut report = MirrorReport::default();
        for row in rows {
            report.attempted += 1;
            let value = serde_json::json!({
                "group_name": row.group_name,
                "group_id": row.group_id,
                "member_name": row.user_name,
                "username": row.username,
                "user_id": row.user_id,
            });
            if let Err(e) = tables.insert(&self.names.members, value).await {
                report.failed += 1;
                warn!(
                    table = %self.names.members,
                    group_id = row.group_id,
                    user_id = row.user_id,
                    error = %e,
                    "membership insert failed"
                );
            }
        }

        info!(table = %self.names.members, attempted = report.attempted, failed = report.failed, "mirrored memberships");
        report
    }
}
