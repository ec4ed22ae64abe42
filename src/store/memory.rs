use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::{CandidateId, ElectionId, ElectionStatus},
        user::{MemberStatus, OrganizationId, UserId},
    },
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        organization::Organization,
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
};

use super::{Store, DUPLICATE_EMAIL, DUPLICATE_VOTE};

/// Rows keyed by a sequential ID.
struct Table<T> {
    rows: BTreeMap<u32, T>,
    last_id: u32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
struct Tables {
    organizations: BTreeMap<OrganizationId, Organization>,
    users: Table<User>,
    elections: Table<Election>,
    candidates: Table<Candidate>,
    votes: Table<Vote>,
}

/// A [`Store`] held entirely in process memory.
///
/// Clones share the same data. Every operation takes one lock for its whole
/// duration, so each is atomic with respect to the others.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // No operation can leave the tables half-written, so a poisoned lock is still usable.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_organization(&self, organization: Organization) -> Result<()> {
        let mut tables = self.lock();
        if tables.organizations.contains_key(&organization.id) {
            return Err(Error::conflict(format!(
                "Organization {} already exists",
                organization.id
            )));
        }
        tables
            .organizations
            .insert(organization.id.clone(), organization);
        Ok(())
    }

    async fn organization(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self.lock().organizations.get(id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.lock();
        if tables.users.rows.values().any(|u| u.email == user.email) {
            return Err(Error::conflict(DUPLICATE_EMAIL));
        }
        let user = User::new(tables.users.next_id(), user);
        tables.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.lock().users.rows.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .rows
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn users(
        &self,
        organization_id: &str,
        status: Option<MemberStatus>,
    ) -> Result<Vec<User>> {
        Ok(self
            .lock()
            .users
            .rows
            .values()
            .filter(|u| u.organization_id == organization_id)
            .filter(|u| status.map_or(true, |s| u.status == s))
            .cloned()
            .collect())
    }

    async fn set_user_status(&self, id: UserId, status: MemberStatus) -> Result<()> {
        let mut tables = self.lock();
        let user = tables
            .users
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("User {id}")))?;
        user.status = status;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        self.lock().users.rows.remove(&id);
        Ok(())
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let mut tables = self.lock();
        let election = Election::new(tables.elections.next_id(), election);
        tables.elections.rows.insert(election.id, election.clone());
        Ok(election)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self.lock().elections.rows.get(&id).cloned())
    }

    async fn elections(
        &self,
        organization_id: &str,
        status: Option<ElectionStatus>,
    ) -> Result<Vec<Election>> {
        Ok(self
            .lock()
            .elections
            .rows
            .values()
            .filter(|e| e.organization_id == organization_id)
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn set_election_status(&self, id: ElectionId, status: ElectionStatus) -> Result<()> {
        let mut tables = self.lock();
        let election = tables
            .elections
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
        election.status = status;
        Ok(())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut tables = self.lock();
        let candidate = Candidate::new(tables.candidates.next_id(), candidate);
        tables
            .candidates
            .rows
            .insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        Ok(self
            .lock()
            .candidates
            .rows
            .values()
            .filter(|c| c.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.lock();
        let exists = tables
            .votes
            .rows
            .values()
            .any(|v| v.user_id == vote.user_id && v.election_id == vote.election_id);
        if exists {
            return Err(Error::conflict(DUPLICATE_VOTE));
        }
        let vote = Vote::new(tables.votes.next_id(), vote);
        tables.votes.rows.insert(vote.id, vote.clone());
        Ok(vote)
    }

    async fn vote_by_user(
        &self,
        user_id: UserId,
        election_id: ElectionId,
    ) -> Result<Option<Vote>> {
        Ok(self
            .lock()
            .votes
            .rows
            .values()
            .find(|v| v.user_id == user_id && v.election_id == election_id)
            .cloned())
    }

    async fn count_votes_for_candidate(&self, candidate_id: CandidateId) -> Result<u64> {
        let count = self
            .lock()
            .votes
            .rows
            .values()
            .filter(|v| v.candidate_id == candidate_id)
            .count();
        Ok(count as u64)
    }

    async fn count_votes_for_election(&self, election_id: ElectionId) -> Result<u64> {
        let count = self
            .lock()
            .votes
            .rows
            .values()
            .filter(|v| v.election_id == election_id)
            .count();
        Ok(count as u64)
    }
}
