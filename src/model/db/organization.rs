use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::model::common::user::{OrganizationId, UserId};

/// Length of a generated organization code.
pub const ORGANIZATION_ID_LENGTH: usize = 8;

/// An organization, the tenant boundary for users and elections.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: OrganizationId,
    pub name: String,
    /// The user who registered the organization.
    pub admin_id: UserId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Generate a fresh organization code: uppercase letters and digits.
    pub fn generate_id() -> OrganizationId {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ORGANIZATION_ID_LENGTH)
            .map(|byte| char::from(byte).to_ascii_uppercase())
            .collect()
    }
}
