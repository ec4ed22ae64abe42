use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        election::{CandidateId, ElectionId, ElectionStatus},
        user::OrganizationId,
    },
    db::{candidate::Candidate, election::Election},
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    pub organization_id: OrganizationId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ElectionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            title: election.election.title,
            description: election.election.description,
            organization_id: election.election.organization_id,
            start_date: election.election.start_date,
            end_date: election.election.end_date,
            status: election.election.status,
            created_at: election.election.created_at,
        }
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: CandidateId,
    pub name: String,
    pub position: Option<String>,
    pub election_id: ElectionId,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
            position: candidate.candidate.position,
            election_id: candidate.candidate.election_id,
            created_at: candidate.candidate.created_at,
        }
    }
}

/// A candidate together with its current vote count.
///
/// Derived on every read by counting vote records; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateWithVotes {
    #[serde(flatten)]
    pub candidate: CandidateDescription,
    pub votes: u64,
}

/// An election with its candidates and their counts, relative to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionWithCandidates {
    #[serde(flatten)]
    pub election: ElectionDescription,
    /// Candidates in listing order.
    pub candidates: Vec<CandidateWithVotes>,
    /// Whether the requesting user has voted in this election.
    pub user_voted: bool,
    /// Sum of all candidates' vote counts.
    pub vote_count: u64,
}
