//! Persistence behind the tally engine and the membership service.
//!
//! [`Store`] is the single seam between business rules and storage. Two
//! implementations exist: [`MongoStore`] for deployments and [`MemoryStore`]
//! for tests and local development. Both allocate positive `u32` IDs and
//! both enforce the one-vote-per-user-per-election rule atomically inside
//! [`Store::insert_vote`].

use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    common::{
        election::{CandidateId, ElectionId, ElectionStatus},
        user::{MemberStatus, UserId},
    },
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        organization::Organization,
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
};

mod memory;
mod mongodb;

pub use self::memory::MemoryStore;
pub use self::mongodb::MongoStore;

/// The store as held in Rocket's managed state.
pub type SharedStore = Arc<dyn Store>;

#[rocket::async_trait]
pub trait Store: Send + Sync {
    // Organizations

    /// Insert an organization. Fails with `Conflict` if the ID is taken.
    async fn insert_organization(&self, organization: Organization) -> Result<()>;

    async fn organization(&self, id: &str) -> Result<Option<Organization>>;

    // Users

    /// Insert a user, allocating its ID. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn user(&self, id: UserId) -> Result<Option<User>>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Users of an organization, optionally filtered by status, in ID order.
    async fn users(&self, organization_id: &str, status: Option<MemberStatus>)
        -> Result<Vec<User>>;

    /// Set a user's status. Fails with `NotFound` if there is no such user.
    async fn set_user_status(&self, id: UserId, status: MemberStatus) -> Result<()>;

    /// Remove a user. Removing a missing user is not an error.
    async fn delete_user(&self, id: UserId) -> Result<()>;

    // Elections

    /// Insert an election, allocating its ID.
    async fn insert_election(&self, election: NewElection) -> Result<Election>;

    async fn election(&self, id: ElectionId) -> Result<Option<Election>>;

    /// Elections of an organization, optionally filtered by status, in ID order.
    async fn elections(
        &self,
        organization_id: &str,
        status: Option<ElectionStatus>,
    ) -> Result<Vec<Election>>;

    /// Set an election's status. Fails with `NotFound` if there is no such election.
    async fn set_election_status(&self, id: ElectionId, status: ElectionStatus) -> Result<()>;

    // Candidates

    /// Insert a candidate, allocating its ID.
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    /// Candidates of an election, in listing (ID) order.
    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>>;

    // Votes

    /// Insert a vote unless the user already voted in that election.
    ///
    /// The check and the insert are a single atomic step: of any number of
    /// concurrent calls for the same `(user_id, election_id)`, exactly one
    /// succeeds and the rest fail with `Conflict`.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    async fn vote_by_user(&self, user_id: UserId, election_id: ElectionId)
        -> Result<Option<Vote>>;

    async fn count_votes_for_candidate(&self, candidate_id: CandidateId) -> Result<u64>;

    async fn count_votes_for_election(&self, election_id: ElectionId) -> Result<u64>;
}

pub(crate) const DUPLICATE_VOTE: &str = "You have already voted in this election";
pub(crate) const DUPLICATE_EMAIL: &str = "Email address already in use";
