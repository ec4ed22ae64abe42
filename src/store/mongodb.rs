use log::info;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
    Client as MongoClient, Database,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
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
    mongodb::{
        ensure_indexes_exist, is_duplicate_key_error, u32_id_filter, Coll, Counter,
        MongoCollection,
    },
};

use super::{Store, DUPLICATE_EMAIL, DUPLICATE_VOTE};

/// A [`Store`] backed by a MongoDB database.
///
/// IDs come from per-collection counters; uniqueness of user emails and of
/// `(user_id, election_id)` votes is enforced by unique indexes.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Wrap an existing database handle. Indexes are assumed to exist.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect to the given database and ensure the required indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        info!("Connected to database {db_name}");
        Ok(Self::new(db))
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    async fn next_id<T: MongoCollection>(&self) -> Result<u32> {
        Counter::next(&self.coll(), T::NAME).await
    }

    async fn find_all<T>(&self, filter: Document) -> Result<Vec<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        Ok(self
            .coll::<T>()
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }
}

/// Add an optional status constraint to a filter.
fn with_status<S: Into<Bson>>(mut filter: Document, status: Option<S>) -> Document {
    if let Some(status) = status {
        filter.insert("status", status.into());
    }
    filter
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_organization(&self, organization: Organization) -> Result<()> {
        match self.coll::<Organization>().insert_one(&organization, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::conflict(format!(
                "Organization {} already exists",
                organization.id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn organization(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self
            .coll::<Organization>()
            .find_one(doc! {"_id": id}, None)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = User::new(self.next_id::<User>().await?, user);
        match self.coll::<User>().insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::conflict(DUPLICATE_EMAIL)),
            Err(e) => Err(e.into()),
        }
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.coll::<User>().find_one(u32_id_filter(id), None).await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .coll::<User>()
            .find_one(doc! {"email": email}, None)
            .await?)
    }

    async fn users(
        &self,
        organization_id: &str,
        status: Option<MemberStatus>,
    ) -> Result<Vec<User>> {
        let filter = with_status(doc! {"organization_id": organization_id}, status);
        self.find_all(filter).await
    }

    async fn set_user_status(&self, id: UserId, status: MemberStatus) -> Result<()> {
        let result = self
            .coll::<User>()
            .update_one(u32_id_filter(id), doc! {"$set": {"status": status}}, None)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("User {id}")));
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        self.coll::<User>().delete_one(u32_id_filter(id), None).await?;
        Ok(())
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let election = Election::new(self.next_id::<Election>().await?, election);
        self.coll::<Election>().insert_one(&election, None).await?;
        Ok(election)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self
            .coll::<Election>()
            .find_one(u32_id_filter(id), None)
            .await?)
    }

    async fn elections(
        &self,
        organization_id: &str,
        status: Option<ElectionStatus>,
    ) -> Result<Vec<Election>> {
        let filter = with_status(doc! {"organization_id": organization_id}, status);
        self.find_all(filter).await
    }

    async fn set_election_status(&self, id: ElectionId, status: ElectionStatus) -> Result<()> {
        let result = self
            .coll::<Election>()
            .update_one(u32_id_filter(id), doc! {"$set": {"status": status}}, None)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Election {id}")));
        }
        Ok(())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate::new(self.next_id::<Candidate>().await?, candidate);
        self.coll::<Candidate>().insert_one(&candidate, None).await?;
        Ok(candidate)
    }

    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        self.find_all(doc! {"election_id": i64::from(election_id)})
            .await
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let vote = Vote::new(self.next_id::<Vote>().await?, vote);
        match self.coll::<Vote>().insert_one(&vote, None).await {
            Ok(_) => Ok(vote),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::conflict(DUPLICATE_VOTE)),
            Err(e) => Err(e.into()),
        }
    }

    async fn vote_by_user(
        &self,
        user_id: UserId,
        election_id: ElectionId,
    ) -> Result<Option<Vote>> {
        let filter = doc! {
            "user_id": i64::from(user_id),
            "election_id": i64::from(election_id),
        };
        Ok(self.coll::<Vote>().find_one(filter, None).await?)
    }

    async fn count_votes_for_candidate(&self, candidate_id: CandidateId) -> Result<u64> {
        Ok(self
            .coll::<Vote>()
            .count_documents(doc! {"candidate_id": i64::from(candidate_id)}, None)
            .await?)
    }

    async fn count_votes_for_election(&self, election_id: ElectionId) -> Result<u64> {
        Ok(self
            .coll::<Vote>()
            .count_documents(doc! {"election_id": i64::from(election_id)}, None)
            .await?)
    }
}

/// These run against a real server and are skipped unless
/// `ELECTRAVOTE_TEST_DB_URI` is set. Each test works in its own database,
/// which is dropped afterwards.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use log::warn;
    use log4rs_test_utils::test_logging::init_logging_once_for;

    use crate::error::ErrorKind;
    use crate::model::{
        api::election::{CandidateSpec, ElectionSpec},
        common::caller::Caller,
        db::user::UserCore,
    };
    use crate::tally::{TallyEngine, TransitionPolicy};

    use super::*;

    const TEST_DB_URI: &str = "ELECTRAVOTE_TEST_DB_URI";

    async fn test_store() -> Option<MongoStore> {
        init_logging_once_for(["electravote_backend"], None, None);
        let Ok(uri) = std::env::var(TEST_DB_URI) else {
            warn!("{TEST_DB_URI} not set, skipping MongoDB test");
            return None;
        };
        let db_name = format!(
            "electravote_test_{}",
            Organization::generate_id().to_lowercase()
        );
        Some(MongoStore::connect(&uri, &db_name).await.unwrap())
    }

    /// An ongoing election with two candidates, straight into the store.
    async fn ongoing_election(store: &MongoStore) -> (Election, Candidate, Candidate) {
        let now = Utc::now();
        let election = store
            .insert_election(
                ElectionSpec::current_example().into_election(ElectionStatus::Ongoing, now),
            )
            .await
            .unwrap();
        let c1 = store
            .insert_candidate(CandidateSpec::example1().into_candidate(election.id, now))
            .await
            .unwrap();
        let c2 = store
            .insert_candidate(CandidateSpec::example2().into_candidate(election.id, now))
            .await
            .unwrap();
        (election, c1, c2)
    }

    #[rocket::async_test]
    async fn ids_come_from_counters() {
        let Some(store) = test_store().await else {
            return;
        };

        let (election, c1, c2) = ongoing_election(&store).await;
        assert_eq!(election.id, 1);
        assert_eq!((c1.id, c2.id), (1, 2));
        let next = store
            .insert_election(
                ElectionSpec::future_example().into_election(ElectionStatus::Upcoming, Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(next.id, 2);

        let upcoming = store
            .elections("ACME2024", Some(ElectionStatus::Upcoming))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].title, "Treasurer");
        let candidates = store.candidates(election.id).await.unwrap();
        assert_eq!(
            candidates.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![c1.id, c2.id]
        );

        store.db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn duplicate_email_conflicts() {
        let Some(store) = test_store().await else {
            return;
        };

        let admin = store.insert_user(UserCore::admin_example()).await.unwrap();
        let err = store
            .insert_user(UserCore::admin_example())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        store.delete_user(admin.id).await.unwrap();
        assert_eq!(store.user(admin.id).await.unwrap(), None);
        store.insert_user(UserCore::admin_example()).await.unwrap();

        store.db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn second_vote_in_election_conflicts() {
        let Some(store) = test_store().await else {
            return;
        };
        let (election, c1, c2) = ongoing_election(&store).await;

        store
            .insert_vote(NewVote::new(7, election.id, c1.id))
            .await
            .unwrap();
        let err = store
            .insert_vote(NewVote::new(7, election.id, c2.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), format!("Conflict: {DUPLICATE_VOTE}"));

        let vote = store.vote_by_user(7, election.id).await.unwrap().unwrap();
        assert_eq!(vote.candidate_id, c1.id);
        assert_eq!(store.count_votes_for_election(election.id).await.unwrap(), 1);

        store.db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn votes_are_counted_per_candidate_and_election() {
        let Some(store) = test_store().await else {
            return;
        };
        let (election, c1, c2) = ongoing_election(&store).await;
        let (other, other_candidate, _) = ongoing_election(&store).await;

        for (user_id, candidate_id) in [(1, c1.id), (2, c1.id), (3, c1.id), (4, c2.id)] {
            store
                .insert_vote(NewVote::new(user_id, election.id, candidate_id))
                .await
                .unwrap();
        }
        store
            .insert_vote(NewVote::new(1, other.id, other_candidate.id))
            .await
            .unwrap();

        assert_eq!(store.count_votes_for_candidate(c1.id).await.unwrap(), 3);
        assert_eq!(store.count_votes_for_candidate(c2.id).await.unwrap(), 1);
        assert_eq!(store.count_votes_for_election(election.id).await.unwrap(), 4);
        assert_eq!(store.count_votes_for_election(other.id).await.unwrap(), 1);

        store.db.drop(None).await.unwrap();
    }

    #[test]
    fn concurrent_identical_votes_admit_one() {
        let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let Some(store) = test_store().await else {
                return;
            };
            let engine = TallyEngine::new(Arc::new(store.clone()), TransitionPolicy::default());
            let admin = Caller::admin_example();
            let election = engine
                .create_election(&admin, ElectionSpec::current_example())
                .await
                .unwrap();
            let candidate_id = engine
                .add_candidate(&admin, election.id, CandidateSpec::example1())
                .await
                .unwrap()
                .id;
            let election_id = election.id;

            let attempts: Vec<_> = (0..16)
                .map(|_| {
                    let engine = engine.clone();
                    rocket::tokio::spawn(async move {
                        engine
                            .cast_vote(&Caller::member_example(), election_id, candidate_id)
                            .await
                    })
                })
                .collect();

            let mut admitted = 0;
            for attempt in attempts {
                match attempt.await.unwrap() {
                    Ok(()) => admitted += 1,
                    Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
                }
            }

            assert_eq!(admitted, 1);
            assert_eq!(store.count_votes_for_election(election_id).await.unwrap(), 1);

            store.db.drop(None).await.unwrap();
        });
    }
}
