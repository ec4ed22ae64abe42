//! The election tally engine.
//!
//! Owns election status transitions, vote admission, and aggregated vote
//! counts. Every call takes the acting [`Caller`] explicitly and checks the
//! election's organization against it before reading or writing anything
//! that belongs to the election.

use chrono::Utc;
use log::{debug, info};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::election::{
        CandidateDescription, CandidateSpec, CandidateWithVotes, ElectionDescription,
        ElectionResults, ElectionSpec, ElectionWithCandidates,
    },
    common::{
        caller::Caller,
        election::{CandidateId, ElectionId, ElectionStatus},
    },
    db::{election::Election, vote::NewVote},
};
use crate::store::SharedStore;

mod results;
mod status;

pub use results::{percentage, tally};
pub use status::{initial_status, TransitionPolicy};

/// A handle on the engine: the shared store plus the configured transition policy.
///
/// Holds no state of its own, so building one per request is free.
#[derive(Clone)]
pub struct TallyEngine {
    store: SharedStore,
    policy: TransitionPolicy,
}

impl TallyEngine {
    pub fn new(store: SharedStore, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    /// Fetch an election the caller's organization owns.
    async fn scoped_election(&self, caller: &Caller, election_id: ElectionId) -> Result<Election> {
        let election = self
            .store
            .election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        caller.require_organization(
            &election.organization_id,
            format!("election {election_id}"),
        )?;
        Ok(election)
    }

    /// Attach candidates, their counts, and the caller's voting state.
    async fn with_candidates(
        &self,
        caller: &Caller,
        election: Election,
    ) -> Result<ElectionWithCandidates> {
        let candidates = self.candidates_with_votes(election.id).await?;
        let vote_count = candidates.iter().map(|c| c.votes).sum();
        let user_voted = self
            .store
            .vote_by_user(caller.user_id, election.id)
            .await?
            .is_some();
        Ok(ElectionWithCandidates {
            election: election.into(),
            candidates,
            user_voted,
            vote_count,
        })
    }

    async fn candidates_with_votes(
        &self,
        election_id: ElectionId,
    ) -> Result<Vec<CandidateWithVotes>> {
        let candidates = self.store.candidates(election_id).await?;
        let mut counted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let votes = self.store.count_votes_for_candidate(candidate.id).await?;
            counted.push(CandidateWithVotes {
                candidate: candidate.into(),
                votes,
            });
        }
        Ok(counted)
    }

    /// Create an election in the caller's organization.
    ///
    /// The initial status follows from the dates: ongoing if today lies
    /// between them, upcoming if they lie ahead, completed if they have passed.
    pub async fn create_election(
        &self,
        caller: &Caller,
        spec: ElectionSpec,
    ) -> Result<ElectionDescription> {
        caller.require_admin()?;
        caller.require_organization(
            &spec.organization_id,
            format!("organization {}", spec.organization_id),
        )?;
        if spec.title.trim().is_empty() {
            return Err(Error::invalid_argument("Election title must not be empty"));
        }
        if spec.end_date < spec.start_date {
            return Err(Error::invalid_argument(
                "Election end date must not be before its start date",
            ));
        }

        let now = Utc::now();
        let status = initial_status(spec.start_date, spec.end_date, now);
        let election = self
            .store
            .insert_election(spec.into_election(status, now))
            .await?;
        info!(
            "User {} created election {} ({status}) in {}",
            caller.user_id, election.id, election.organization_id
        );
        Ok(election.into())
    }

    /// Add a candidate to an election. Allowed in any status.
    pub async fn add_candidate(
        &self,
        caller: &Caller,
        election_id: ElectionId,
        spec: CandidateSpec,
    ) -> Result<CandidateDescription> {
        caller.require_admin()?;
        let election = self.scoped_election(caller, election_id).await?;
        if spec.name.trim().is_empty() {
            return Err(Error::invalid_argument("Candidate name must not be empty"));
        }

        let candidate = self
            .store
            .insert_candidate(spec.into_candidate(election.id, Utc::now()))
            .await?;
        info!(
            "User {} added candidate {} to election {}",
            caller.user_id, candidate.id, election.id
        );
        Ok(candidate.into())
    }

    /// Move an election to the given status, subject to the transition policy.
    pub async fn set_election_status(
        &self,
        caller: &Caller,
        election_id: ElectionId,
        status: ElectionStatus,
    ) -> Result<ElectionDescription> {
        caller.require_admin()?;
        let mut election = self.scoped_election(caller, election_id).await?;
        self.policy.check(election.status, status)?;

        self.store.set_election_status(election.id, status).await?;
        info!(
            "User {} moved election {} from {} to {status}",
            caller.user_id, election.id, election.status
        );
        election.status = status;
        Ok(election.into())
    }

    /// Record the caller's vote for a candidate.
    ///
    /// Fails, in this order of precedence, with `NotFound` for an unknown
    /// election, `Forbidden` for another organization's election,
    /// `InvalidState` unless the election is ongoing, `Conflict` if the caller
    /// already voted in it, and `InvalidArgument` if the candidate isn't
    /// standing in it.
    pub async fn cast_vote(
        &self,
        caller: &Caller,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<()> {
        let election = self.scoped_election(caller, election_id).await?;
        if election.status != ElectionStatus::Ongoing {
            debug!(
                "Rejected vote by user {} in {} election {election_id}",
                caller.user_id, election.status
            );
            return Err(Error::invalid_state("Election is not currently active"));
        }
        if self
            .store
            .vote_by_user(caller.user_id, election_id)
            .await?
            .is_some()
        {
            debug!(
                "Rejected repeat vote by user {} in election {election_id}",
                caller.user_id
            );
            return Err(Error::conflict("You have already voted in this election"));
        }
        let standing = self
            .store
            .candidates(election_id)
            .await?
            .iter()
            .any(|candidate| candidate.id == candidate_id);
        if !standing {
            return Err(Error::invalid_argument(format!(
                "Candidate {candidate_id} is not standing in election {election_id}"
            )));
        }

        // A concurrent vote may have landed since the check above; the store settles it.
        let vote = self
            .store
            .insert_vote(NewVote::new(caller.user_id, election_id, candidate_id))
            .await?;
        info!(
            "Recorded vote {} by user {} in election {election_id}",
            vote.id, caller.user_id
        );
        Ok(())
    }

    /// One election with its candidates and counts.
    pub async fn election(
        &self,
        caller: &Caller,
        election_id: ElectionId,
    ) -> Result<ElectionWithCandidates> {
        let election = self.scoped_election(caller, election_id).await?;
        self.with_candidates(caller, election).await
    }

    /// Every election in the caller's organization.
    pub async fn elections(&self, caller: &Caller) -> Result<Vec<ElectionWithCandidates>> {
        self.list(caller, None).await
    }

    /// Elections in the caller's organization with the given status.
    pub async fn elections_by_status(
        &self,
        caller: &Caller,
        status: ElectionStatus,
    ) -> Result<Vec<ElectionWithCandidates>> {
        self.list(caller, Some(status)).await
    }

    async fn list(
        &self,
        caller: &Caller,
        status: Option<ElectionStatus>,
    ) -> Result<Vec<ElectionWithCandidates>> {
        let elections = self
            .store
            .elections(&caller.organization_id, status)
            .await?;
        let mut described = Vec::with_capacity(elections.len());
        for election in elections {
            described.push(self.with_candidates(caller, election).await?);
        }
        Ok(described)
    }

    /// Ranked results and, once the election is completed, its winner.
    pub async fn results(
        &self,
        caller: &Caller,
        election_id: ElectionId,
    ) -> Result<ElectionResults> {
        let election = self.scoped_election(caller, election_id).await?;
        let candidates = self.candidates_with_votes(election.id).await?;
        Ok(tally(election.id, election.status, candidates))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TallyEngine {
    type Error = ();

    /// Build the engine from the managed store and config.
    ///
    /// Panics iff either is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<SharedStore>>().await.unwrap();
        let config = req.guard::<&State<Config>>().await.unwrap();
        request::Outcome::Success(TallyEngine::new(
            store.inner().clone(),
            config.status_transitions(),
        ))
    }
}
