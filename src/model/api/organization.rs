use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::user::{OrganizationId, UserId},
    db::organization::Organization,
};

/// Member and election counts for an organization's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCounts {
    pub active_members: u64,
    pub pending_members: u64,
    pub total_members: u64,
    pub upcoming_elections: u64,
    pub ongoing_elections: u64,
    pub completed_elections: u64,
    pub total_elections: u64,
}

/// An organization with its dashboard counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationOverview {
    pub id: OrganizationId,
    pub name: String,
    pub admin_id: UserId,
    pub created_at: DateTime<Utc>,
    pub counts: OrganizationCounts,
}

impl OrganizationOverview {
    pub fn new(organization: Organization, counts: OrganizationCounts) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            admin_id: organization.admin_id,
            created_at: organization.created_at,
            counts,
        }
    }
}
