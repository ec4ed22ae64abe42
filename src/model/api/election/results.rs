use serde::{Deserialize, Serialize};

use crate::model::common::election::{ElectionId, ElectionStatus};

use super::desc::CandidateWithVotes;

/// One row of an election's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    #[serde(flatten)]
    pub candidate: CandidateWithVotes,
    /// Share of the total vote, rounded half-up to a whole percent.
    pub percentage: u8,
}

/// Who won, as far as the election's status allows us to say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "candidate", rename_all = "snake_case")]
pub enum Winner {
    /// Voting has not started, or there was nobody to vote for.
    Undecided,
    /// Voting is open; a leader exists but nothing is committed.
    InProgress,
    /// Voting has closed.
    Decided(CandidateWithVotes),
}

/// Tallied results for one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub status: ElectionStatus,
    /// Ordered by votes, most first; ties keep candidate listing order.
    pub candidates: Vec<CandidateResult>,
    pub total_votes: u64,
    pub winner: Winner,
}
