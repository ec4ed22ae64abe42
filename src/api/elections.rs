use rocket::{http::Status, response::status::Created, serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{Admin, AuthToken, Member},
            election::{
                CandidateDescription, CandidateSpec, ElectionDescription, ElectionResults,
                ElectionSpec, ElectionWithCandidates, StatusChange, VoteSpec,
            },
        },
        common::election::{ElectionId, ElectionStatus},
    },
    tally::TallyEngine,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        get_elections_by_status,
        get_election,
        get_results,
        create_election,
        add_candidate,
        set_status,
        cast_vote,
    ]
}

/// Acknowledgement of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub message: String,
}

#[get("/elections")]
async fn get_elections(
    token: AuthToken<Member>,
    engine: TallyEngine,
) -> Result<Json<Vec<ElectionWithCandidates>>> {
    Ok(Json(engine.elections(&token.caller()).await?))
}

// Ranked ahead of `/elections/<id>/results`, which would otherwise collide.
#[get("/elections/status/<status>", rank = 1)]
async fn get_elections_by_status(
    token: AuthToken<Member>,
    status: &str,
    engine: TallyEngine,
) -> Result<Json<Vec<ElectionWithCandidates>>> {
    let status: ElectionStatus = status.parse()?;
    Ok(Json(
        engine
            .elections_by_status(&token.caller(), status)
            .await?,
    ))
}

#[get("/elections/<election_id>")]
async fn get_election(
    token: AuthToken<Member>,
    election_id: ElectionId,
    engine: TallyEngine,
) -> Result<Json<ElectionWithCandidates>> {
    Ok(Json(engine.election(&token.caller(), election_id).await?))
}

#[get("/elections/<election_id>/results", rank = 2)]
async fn get_results(
    token: AuthToken<Member>,
    election_id: ElectionId,
    engine: TallyEngine,
) -> Result<Json<ElectionResults>> {
    Ok(Json(engine.results(&token.caller(), election_id).await?))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    engine: TallyEngine,
) -> Result<Created<Json<ElectionDescription>>> {
    let election = engine.create_election(&token.caller(), spec.0).await?;
    let location = uri!(get_election(election.id)).to_string();
    Ok(Created::new(location).body(Json(election)))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    engine: TallyEngine,
) -> Result<Created<Json<CandidateDescription>>> {
    let candidate = engine
        .add_candidate(&token.caller(), election_id, spec.0)
        .await?;
    let location = uri!(get_election(election_id)).to_string();
    Ok(Created::new(location).body(Json(candidate)))
}

#[put("/elections/<election_id>/status", data = "<change>", format = "json")]
async fn set_status(
    token: AuthToken<Admin>,
    election_id: ElectionId,
    change: Json<StatusChange>,
    engine: TallyEngine,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(
        engine
            .set_election_status(&token.caller(), election_id, change.status()?)
            .await?,
    ))
}

#[post("/elections/<election_id>/vote", data = "<vote>", format = "json")]
async fn cast_vote(
    token: AuthToken<Member>,
    election_id: ElectionId,
    vote: Json<VoteSpec>,
    engine: TallyEngine,
) -> Result<(Status, Json<VoteReceipt>)> {
    engine
        .cast_vote(&token.caller(), election_id, vote.candidate_id)
        .await?;
    Ok((
        Status::Created,
        Json(VoteReceipt {
            message: "Vote recorded successfully".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::{
        api::election::Winner,
        common::election::CandidateId,
    };
    use crate::store::{MemoryStore, Store};

    use super::*;

    async fn create(client: &Client, spec: ElectionSpec) -> ElectionDescription {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        response.into_json().await.unwrap()
    }

    async fn add(client: &Client, election_id: ElectionId, spec: CandidateSpec) -> CandidateId {
        let response = client
            .post(uri!(add_candidate(election_id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let candidate: CandidateDescription = response.into_json().await.unwrap();
        candidate.id
    }

    async fn vote(client: &Client, election_id: ElectionId, candidate_id: CandidateId) -> Status {
        client
            .post(uri!(cast_vote(election_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidateId": candidate_id }).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn admin_runs_an_election(client: Client, store: MemoryStore) {
        let election = create(&client, ElectionSpec::future_example()).await;
        assert_eq!(election.status, ElectionStatus::Upcoming);
        let c1 = add(&client, election.id, CandidateSpec::example1()).await;
        add(&client, election.id, CandidateSpec::example2()).await;

        // Voting isn't open yet.
        assert_eq!(
            vote(&client, election.id, c1).await,
            Status::UnprocessableEntity
        );

        let response = client
            .put(uri!(set_status(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "ongoing" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        assert_eq!(vote(&client, election.id, c1).await, Status::Created);
        assert_eq!(vote(&client, election.id, c1).await, Status::Conflict);
        assert_eq!(store.count_votes_for_election(election.id).await.unwrap(), 1);

        client
            .put(uri!(set_status(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "completed" }).to_string())
            .dispatch()
            .await;

        let response = client.get(uri!(get_results(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.candidates[0].percentage, 100);
        match results.winner {
            Winner::Decided(winner) => assert_eq!(winner.candidate.id, c1),
            other => panic!("expected a decided winner, got {other:?}"),
        }
    }

    #[backend_test(admin)]
    async fn unknown_status_is_invalid_argument(client: Client, store: MemoryStore) {
        let election = create(&client, ElectionSpec::future_example()).await;

        let response = client
            .put(uri!(set_status(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "cancelled" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["kind"], "invalid_argument");
        assert_eq!(
            body["message"],
            "Invalid argument: Invalid election status 'cancelled'"
        );

        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Upcoming);
    }

    #[backend_test(admin)]
    async fn invalid_election_spec(client: Client) {
        let mut spec = ElectionSpec::current_example();
        std::mem::swap(&mut spec.start_date, &mut spec.end_date);

        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["kind"], "invalid_argument");
    }

    #[backend_test(member)]
    async fn members_cannot_administer(client: Client, store: MemoryStore) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::current_example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert!(store.elections("ACME2024", None).await.unwrap().is_empty());
    }

    #[backend_test(member)]
    async fn member_votes_and_sees_count(client: Client, store: MemoryStore) {
        let now = Utc::now();
        let election = store
            .insert_election(
                ElectionSpec::current_example().into_election(ElectionStatus::Ongoing, now),
            )
            .await
            .unwrap();
        let candidate = store
            .insert_candidate(CandidateSpec::example1().into_candidate(election.id, now))
            .await
            .unwrap();

        assert_eq!(vote(&client, election.id, candidate.id).await, Status::Created);
        assert_eq!(vote(&client, election.id, 999).await, Status::Conflict);

        let response = client.get(uri!(get_election(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let view: ElectionWithCandidates = response.into_json().await.unwrap();
        assert!(view.user_voted);
        assert_eq!(view.vote_count, 1);
        assert_eq!(view.candidates[0].votes, 1);

        let response = client.get(uri!(get_results(election.id))).dispatch().await;
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.winner, Winner::InProgress);
    }

    #[backend_test(member)]
    async fn list_by_status(client: Client, store: MemoryStore) {
        for (spec, status) in [
            (ElectionSpec::current_example(), ElectionStatus::Ongoing),
            (ElectionSpec::future_example(), ElectionStatus::Upcoming),
        ] {
            store
                .insert_election(spec.into_election(status, Utc::now()))
                .await
                .unwrap();
        }

        let response = client.get(uri!(get_elections)).dispatch().await;
        let all: Vec<ElectionWithCandidates> = response.into_json().await.unwrap();
        assert_eq!(all.len(), 2);

        let response = client
            .get(uri!(get_elections_by_status("upcoming")))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let upcoming: Vec<ElectionWithCandidates> = response.into_json().await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].election.title, "Treasurer");

        let response = client
            .get(uri!(get_elections_by_status("finished")))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(member)]
    async fn other_organizations_are_hidden(client: Client, store: MemoryStore) {
        let mut spec = ElectionSpec::current_example();
        spec.organization_id = "GLOBEX01".to_string();
        let election = store
            .insert_election(spec.into_election(ElectionStatus::Ongoing, Utc::now()))
            .await
            .unwrap();

        let response = client.get(uri!(get_election(election.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.get(uri!(get_election(404))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["kind"], "not_found");

        let response = client.get(uri!(get_elections)).dispatch().await;
        let all: Vec<ElectionWithCandidates> = response.into_json().await.unwrap();
        assert!(all.is_empty());
    }

    #[backend_test]
    async fn login_required(client: Client) {
        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
