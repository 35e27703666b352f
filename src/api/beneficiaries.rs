use mongodb::Client;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Permit,
            beneficiary::{
                BeneficiaryInput, BeneficiaryQuery, BeneficiaryView, NewBeneficiaryRequest,
                Recipients, StatusUpdate,
            },
            envelope::{ok, Reply},
            fields,
            pagination::{Paginated, PaginationRequest},
        },
        common::{gate, BeneficiaryStatus},
        db::{
            beneficiary::{Beneficiary, BeneficiaryCore, NewBeneficiary, Target},
            reference::Part,
            service::Service,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

type Beneficiaries = Permit<gate::Beneficiaries>;

pub fn routes() -> Vec<Route> {
    routes![
        create_beneficiaries,
        list_beneficiaries,
        get_beneficiary,
        update_status,
    ]
}

/// Fail with 400 naming any part numbers that do not exist.
async fn ensure_parts_exist(parts: &Coll<Part>, part_numbers: &[u32]) -> Result<()> {
    let missing = Part::missing(parts, part_numbers).await?;
    if missing.is_empty() {
        return Ok(());
    }
    let missing: Vec<String> = missing.iter().map(u32::to_string).collect();
    Err(Error::bad_request(format!(
        "Unknown part numbers: {}",
        missing.join(", ")
    )))
}

/// Record that a service is wanted, by one voter or by every listed part.
/// A request for several parts creates one row per part, all or nothing.
#[allow(clippy::too_many_arguments)]
#[post("/api/beneficiaries", data = "<request>", format = "json")]
async fn create_beneficiaries(
    permit: Beneficiaries,
    request: Json<NewBeneficiaryRequest>,
    db_client: &State<Client>,
    services: Coll<Service>,
    voters: Coll<Voter>,
    parts: Coll<Part>,
    new_beneficiaries: Coll<NewBeneficiary>,
) -> Reply<Vec<BeneficiaryView>> {
    let input = BeneficiaryInput::try_from(request.0)?;
    let service = Service::find(&services, input.service_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Service {}", input.service_id)))?;
    input.check_service_type(service.service_type)?;

    let BeneficiaryInput {
        service_id,
        recipients,
        description,
        priority,
        notes,
    } = input;
    let row = |target| {
        BeneficiaryCore::new(
            service_id,
            target,
            description.clone(),
            priority,
            notes.clone(),
            permit.user.id,
        )
    };

    let created = match recipients {
        Recipients::Voter(voter_id) => {
            if Voter::find(&voters, &voter_id).await?.is_none() {
                return Err(Error::not_found(format!("Voter {voter_id}")));
            }
            vec![Beneficiary::insert(&new_beneficiaries, row(Target::Voter { voter_id })).await?]
        }
        Recipients::Parts(part_numbers) => {
            ensure_parts_exist(&parts, &part_numbers).await?;
            let batch = part_numbers
                .into_iter()
                .map(|part_no| row(Target::Part { part_no }))
                .collect();
            Beneficiary::insert_all(db_client, &new_beneficiaries, batch).await?
        }
    };

    info!(
        "'{}' recorded {} beneficiaries of '{}'",
        permit.user.username,
        created.len(),
        service.name
    );
    ok(created.into_iter().map(Into::into).collect())
}

#[get("/api/beneficiaries?<service_id>&<status>&<voter_id>&<part_no>&<pagination..>")]
async fn list_beneficiaries(
    _permit: Beneficiaries,
    service_id: Option<String>,
    status: Option<BeneficiaryStatus>,
    voter_id: Option<String>,
    part_no: Option<u32>,
    pagination: PaginationRequest,
    beneficiaries: Coll<Beneficiary>,
) -> Reply<Paginated<BeneficiaryView>> {
    let pagination = pagination.validate()?;
    let query = BeneficiaryQuery {
        service_id,
        status,
        voter_id,
        part_no,
    };
    let (page, total) = Beneficiary::list(&beneficiaries, query.to_filter()?, pagination).await?;
    ok(pagination.to_paginated(total, page.into_iter().map(Into::into).collect()))
}

#[get("/api/beneficiaries/<beneficiary_id>")]
async fn get_beneficiary(
    _permit: Beneficiaries,
    beneficiary_id: Id,
    beneficiaries: Coll<Beneficiary>,
) -> Reply<BeneficiaryView> {
    let beneficiary = Beneficiary::find(&beneficiaries, beneficiary_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Beneficiary {beneficiary_id}")))?;
    ok(beneficiary.into())
}

#[put("/api/beneficiaries/<beneficiary_id>/status", data = "<update>", format = "json")]
async fn update_status(
    _permit: Beneficiaries,
    beneficiary_id: Id,
    update: Json<StatusUpdate>,
    beneficiaries: Coll<Beneficiary>,
) -> Reply<BeneficiaryView> {
    let StatusUpdate { status, notes } = update.0;
    let beneficiary = Beneficiary::set_status(
        &beneficiaries,
        beneficiary_id,
        status,
        fields::optional(notes),
    )
    .await?
    .ok_or_else(|| Error::not_found(format!("Beneficiary {beneficiary_id}")))?;
    ok(beneficiary.into())
}

#[cfg(test)]
mod tests {
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json},
    };

    use crate::{
        api::testing,
        model::{
            common::{EpicNumber, Priority},
            db::service::NewService,
        },
    };

    use super::*;

    struct Fixture {
        one_to_one: Id,
        one_to_many: Id,
    }

    async fn seed(
        new_services: &Coll<NewService>,
        voters: &Coll<Voter>,
        parts: &Coll<Part>,
    ) -> Fixture {
        let by = Id::new();
        let result = new_services
            .insert_one(NewService::example_one_to_one(by), None)
            .await
            .unwrap();
        let one_to_one = Id::inserted(&result).unwrap();
        let result = new_services
            .insert_one(NewService::example_one_to_many(by), None)
            .await
            .unwrap();
        let one_to_many = Id::inserted(&result).unwrap();

        voters.insert_one(Voter::example(), None).await.unwrap();
        parts
            .insert_many([Part::example(12, 3), Part::example(13, 3), Part::example(14, 4)], None)
            .await
            .unwrap();
        Fixture {
            one_to_one,
            one_to_many,
        }
    }

    async fn post<'c>(client: &'c Client, body: serde_json::Value) -> LocalResponse<'c> {
        client
            .post(uri!(create_beneficiaries))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
    }

    #[backend_test(admin)]
    async fn single_voter_makes_one_row(
        client: Client,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
        beneficiaries: Coll<Beneficiary>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_one.to_string(),
                "voter_id": "abc1234567",
                "description": "Pension application",
            }),
        )
        .await;
        let created: Vec<BeneficiaryView> = testing::data(response).await;
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].target,
            Target::Voter {
                voter_id: EpicNumber::example()
            }
        );
        assert_eq!(created[0].priority, Priority::Medium);
        assert_eq!(created[0].status, BeneficiaryStatus::Pending);

        let stored = beneficiaries
            .count_documents(doc! { "voter_id": EpicNumber::example() }, None)
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[backend_test(admin)]
    async fn one_row_per_part(
        client: Client,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
        beneficiaries: Coll<Beneficiary>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_many.to_string(),
                "part_numbers": [12, 14],
                "description": "Resurface the main road",
                "priority": "high",
            }),
        )
        .await;
        let created: Vec<BeneficiaryView> = testing::data(response).await;
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].target, Target::Part { part_no: 14 });
        assert_eq!(beneficiaries.count_documents(None, None).await.unwrap(), 2);

        let response = client
            .get("/api/beneficiaries?part_no=14")
            .dispatch()
            .await;
        let page: Paginated<BeneficiaryView> = testing::data(response).await;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].priority, Priority::High);
    }

    #[backend_test(admin)]
    async fn unknown_part_creates_nothing(
        client: Client,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
        beneficiaries: Coll<Beneficiary>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_many.to_string(),
                "part_numbers": [12, 99, 98],
                "description": "Streetlights",
            }),
        )
        .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(
            testing::error(response).await,
            "Unknown part numbers: 98, 99"
        );
        assert_eq!(beneficiaries.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn failed_insert_rolls_back_every_part(
        client: Client,
        db: Database,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
        beneficiaries: Coll<Beneficiary>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;
        // Part 12 is written first, then the collection refuses part 14.
        db.run_command(
            doc! {
                "collMod": "beneficiaries",
                "validator": { "part_no": { "$ne": 14_i64 } },
            },
            None,
        )
        .await
        .unwrap();

        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_many.to_string(),
                "part_numbers": [12, 14],
                "description": "Drinking water tank",
            }),
        )
        .await;
        assert_eq!(Status::InternalServerError, response.status());
        assert_eq!(testing::error(response).await, "Internal server error");
        assert_eq!(beneficiaries.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn request_must_fit_service(
        client: Client,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
        beneficiaries: Coll<Beneficiary>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;

        // One-to-one service asked for parts.
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_one.to_string(),
                "part_numbers": [12],
                "description": "x",
            }),
        )
        .await;
        assert_eq!(Status::BadRequest, response.status());

        // Both recipients.
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_many.to_string(),
                "voter_id": "ABC1234567",
                "part_numbers": [12],
                "description": "x",
            }),
        )
        .await;
        assert_eq!(Status::BadRequest, response.status());

        // Unknown voter.
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_one.to_string(),
                "voter_id": "ZZZ9999999",
                "description": "x",
            }),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());

        // Unknown service.
        let response = post(
            &client,
            json!({
                "service_id": Id::new().to_string(),
                "voter_id": "ABC1234567",
                "description": "x",
            }),
        )
        .await;
        assert_eq!(Status::NotFound, response.status());

        assert_eq!(beneficiaries.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn status_updates_track_completion(
        client: Client,
        new_services: Coll<NewService>,
        voters: Coll<Voter>,
        parts: Coll<Part>,
    ) {
        let fixture = seed(&new_services, &voters, &parts).await;
        let response = post(
            &client,
            json!({
                "service_id": fixture.one_to_one.to_string(),
                "voter_id": "ABC1234567",
                "description": "Pension application",
                "notes": "Bring Aadhaar",
            }),
        )
        .await;
        let created: Vec<BeneficiaryView> = testing::data(response).await;
        let id = *created[0].id;

        let set_status = |body: serde_json::Value| {
            client
                .put(uri!(update_status(id)))
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch()
        };

        let response = set_status(json!({ "status": "completed" })).await;
        let updated: BeneficiaryView = testing::data(response).await;
        assert_eq!(updated.status, BeneficiaryStatus::Completed);
        assert!(updated.completed_at.is_some());
        assert_eq!(updated.notes.as_deref(), Some("Bring Aadhaar"));

        let response = set_status(json!({ "status": "in_progress", "notes": "Reopened" })).await;
        let updated: BeneficiaryView = testing::data(response).await;
        assert_eq!(updated.completed_at, None);
        assert_eq!(updated.notes.as_deref(), Some("Reopened"));

        let response = set_status(json!({ "status": "finished" })).await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let response = client
            .get(uri!(get_beneficiary(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
