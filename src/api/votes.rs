use mongodb::Client;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            vote::{BulkMarkRequest, BulkMarkResult, MarkRequest},
            voter::VoteMarkView,
        },
        common::{gate, EpicNumber},
        db::{
            reference::Election,
            vote_mark::{Turnout, VoteMark},
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![mark_vote, mark_votes, turnout]
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn ensure_election_exists(elections: &Coll<Election>, election_id: Id) -> Result<()> {
    match Election::find(elections, election_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::not_found(format!("Election {election_id}"))),
    }
}

/// Record whether one voter voted, replacing any earlier mark.
#[post("/api/votes", data = "<request>", format = "json")]
async fn mark_vote(
    permit: Permit<gate::Operator>,
    request: Json<MarkRequest>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    marks: Coll<VoteMark>,
) -> Reply<VoteMarkView> {
    let input = request.parse()?;
    let voter = Voter::find(&voters, &input.epic_number)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {}", input.epic_number)))?;
    ensure_election_exists(&elections, input.election_id).await?;

    let mark = VoteMark::upsert(
        &marks,
        &voter,
        input.election_id,
        input.has_voted,
        permit.user.id,
    )
    .await?;
    ok(mark.into())
}

/// Record many marks at once. Nothing is written unless every voter and
/// election exists.
#[post("/api/votes/bulk", data = "<request>", format = "json")]
async fn mark_votes(
    permit: Permit<gate::Operator>,
    request: Json<BulkMarkRequest>,
    db_client: &State<Client>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    marks: Coll<VoteMark>,
) -> Reply<BulkMarkResult> {
    let inputs = request.parse()?;

    let election_ids: Vec<Id> = inputs.iter().map(|m| m.election_id).collect();
    let missing = Election::missing(&elections, &election_ids).await?;
    if !missing.is_empty() {
        return Err(Error::not_found(format!("Elections {}", join(&missing))));
    }

    let epic_numbers: Vec<EpicNumber> = inputs.iter().map(|m| m.epic_number.clone()).collect();
    let found = Voter::find_many(&voters, &epic_numbers).await?;
    let mut missing: Vec<EpicNumber> = epic_numbers
        .into_iter()
        .filter(|epic| !found.iter().any(|v| &v.epic_number == epic))
        .collect();
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(Error::not_found(format!("Voters {}", join(&missing))));
    }

    let marked = VoteMark::upsert_many(db_client, &marks, &inputs, &found, permit.user.id).await?;
    info!("'{}' marked {marked} votes", permit.user.username);
    ok(BulkMarkResult { marked })
}

#[get("/api/elections/<election_id>/turnout?<part_no>")]
async fn turnout(
    _permit: Permit<gate::Voters>,
    election_id: Id,
    part_no: Option<u32>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    marks: Coll<VoteMark>,
) -> Reply<Turnout> {
    ensure_election_exists(&elections, election_id).await?;
    ok(VoteMark::turnout(&voters, &marks, election_id, part_no).await?)
}

#[cfg(test)]
mod tests {
    use mongodb::{bson::doc, Database};
    use rocket::{
        futures::TryStreamExt,
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::api::testing;

    use super::*;

    async fn seed(voters: &Coll<Voter>, elections: &Coll<Election>) -> Election {
        voters
            .insert_many([Voter::example(), Voter::example2(), Voter::example3()], None)
            .await
            .unwrap();
        let election = Election::example();
        elections.insert_one(&election, None).await.unwrap();
        election
    }

    async fn post_mark(client: &Client, body: serde_json::Value) -> Status {
        client
            .post(uri!(mark_vote))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(operator)]
    async fn remarking_replaces(
        client: Client,
        voters: Coll<Voter>,
        elections: Coll<Election>,
        marks: Coll<VoteMark>,
    ) {
        let election = seed(&voters, &elections).await;
        let mark = |has_voted| {
            json!({
                "epic_number": Voter::example().epic_number,
                "election_id": election.id.to_string(),
                "has_voted": has_voted,
            })
        };

        assert_eq!(Status::Ok, post_mark(&client, mark(true)).await);
        assert_eq!(Status::Ok, post_mark(&client, mark(false)).await);

        let rows: Vec<VoteMark> = marks.find(None, None).await.unwrap().try_collect().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].has_voted);
        assert_eq!(rows[0].part_no, 12);
    }

    #[backend_test(operator)]
    async fn unknown_voter_or_election(
        client: Client,
        voters: Coll<Voter>,
        elections: Coll<Election>,
        marks: Coll<VoteMark>,
    ) {
        let election = seed(&voters, &elections).await;
        let status = post_mark(
            &client,
            json!({ "epic_number": "ZZZ9999999", "election_id": election.id.to_string(), "has_voted": true }),
        )
        .await;
        assert_eq!(Status::NotFound, status);

        let status = post_mark(
            &client,
            json!({ "epic_number": Voter::example().epic_number, "election_id": Id::new().to_string(), "has_voted": true }),
        )
        .await;
        assert_eq!(Status::NotFound, status);

        let status = post_mark(
            &client,
            json!({ "epic_number": "", "election_id": election.id.to_string(), "has_voted": true }),
        )
        .await;
        assert_eq!(Status::BadRequest, status);

        assert_eq!(marks.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(operator)]
    async fn bulk_marks_and_turnout(
        client: Client,
        voters: Coll<Voter>,
        elections: Coll<Election>,
        marks: Coll<VoteMark>,
    ) {
        let election = seed(&voters, &elections).await;
        let id = election.id.to_string();
        let body = json!({
            "marks": [
                { "epic_number": Voter::example().epic_number, "election_id": id, "has_voted": false },
                { "epic_number": Voter::example2().epic_number, "election_id": id, "has_voted": true },
                { "epic_number": Voter::example().epic_number, "election_id": id, "has_voted": true },
            ]
        });
        let response = client
            .post(uri!(mark_votes))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        let result: BulkMarkResult = testing::data(response).await;
        assert_eq!(result.marked, 3);
        assert_eq!(marks.count_documents(None, None).await.unwrap(), 2);
        // The later entry for the same voter wins.
        let first = marks
            .find_one(doc! { "epic_number": Voter::example().epic_number }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(first.has_voted);

        let response = client
            .get(format!("/api/elections/{}/turnout", election.id))
            .dispatch()
            .await;
        let turnout: Turnout = testing::data(response).await;
        assert_eq!(turnout.total_voters, 3);
        assert_eq!(turnout.voted, 2);
        assert_eq!(turnout.percentage, 66.67);

        let response = client
            .get(format!("/api/elections/{}/turnout?part_no=14", election.id))
            .dispatch()
            .await;
        let turnout: Turnout = testing::data(response).await;
        assert_eq!(turnout, Turnout::new(1, 0));
    }

    #[backend_test(operator)]
    async fn bulk_is_all_or_nothing(
        client: Client,
        voters: Coll<Voter>,
        elections: Coll<Election>,
        marks: Coll<VoteMark>,
    ) {
        let election = seed(&voters, &elections).await;
        let id = election.id.to_string();
        let body = json!({
            "marks": [
                { "epic_number": Voter::example().epic_number, "election_id": id, "has_voted": true },
                { "epic_number": "ZZZ9999999", "election_id": id, "has_voted": true },
            ]
        });
        let response = client
            .post(uri!(mark_votes))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(testing::error(response).await, "Voters ZZZ9999999 not found");
        assert_eq!(marks.count_documents(None, None).await.unwrap(), 0);

        let response = client
            .post(uri!(mark_votes))
            .header(ContentType::JSON)
            .body(json!({ "marks": [] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(operator)]
    async fn failed_write_rolls_back_bulk(
        client: Client,
        db: Database,
        voters: Coll<Voter>,
        elections: Coll<Election>,
        marks: Coll<VoteMark>,
    ) {
        let election = seed(&voters, &elections).await;
        // The second write of the batch is refused by the collection itself.
        db.run_command(
            doc! {
                "collMod": "vote_marks",
                "validator": { "epic_number": { "$ne": Voter::example2().epic_number } },
            },
            None,
        )
        .await
        .unwrap();

        let id = election.id.to_string();
        let body = json!({
            "marks": [
                { "epic_number": Voter::example().epic_number, "election_id": id, "has_voted": true },
                { "epic_number": Voter::example2().epic_number, "election_id": id, "has_voted": true },
            ]
        });
        let response = client
            .post(uri!(mark_votes))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::InternalServerError, response.status());
        assert_eq!(marks.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(viewer)]
    async fn viewers_cannot_mark(client: Client) {
        let status = post_mark(
            &client,
            json!({ "epic_number": "ABC1234567", "election_id": Id::new().to_string(), "has_voted": true }),
        )
        .await;
        assert_eq!(Status::Forbidden, status);
    }
}
