use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::{
        election::{CandidateId, ElectionId, ElectionStatus},
        user::OrganizationId,
    },
    db::{candidate::NewCandidate, election::NewElection},
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Must be the submitting admin's own organization.
    pub organization_id: OrganizationId,
    /// Voting opens.
    pub start_date: DateTime<Utc>,
    /// Voting closes.
    pub end_date: DateTime<Utc>,
}

impl ElectionSpec {
    /// Convert this spec into an election ready for insertion, with the given initial status.
    pub fn into_election(self, status: ElectionStatus, now: DateTime<Utc>) -> NewElection {
        NewElection {
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            organization_id: self.organization_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            created_at: now,
        }
    }
}

/// A candidate specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
}

impl CandidateSpec {
    /// Convert this spec into a candidate for the given election.
    pub fn into_candidate(self, election_id: ElectionId, now: DateTime<Utc>) -> NewCandidate {
        NewCandidate {
            name: self.name.trim().to_string(),
            position: self.position.filter(|p| !p.trim().is_empty()),
            election_id,
            created_at: now,
        }
    }
}

/// A requested status change, with the status as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

impl StatusChange {
    pub fn status(&self) -> Result<ElectionStatus> {
        self.status.parse()
    }
}

/// A vote that a user wishes to cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSpec {
    pub candidate_id: CandidateId,
}
