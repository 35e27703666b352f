use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            pagination::{Paginated, PaginationRequest},
            voter::{ImportView, MobileUpdate, VoterDetail, VoterImport, VoterQuery, VoterRecord, VoterView},
        },
        common::{gate, EpicError, EpicNumber},
        db::{vote_mark::VoteMark, voter::Voter},
        mongodb::{is_duplicate_key_error, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        search_voters,
        get_voter,
        get_family,
        create_voter,
        update_mobile_numbers,
        import_voters,
    ]
}

/// A malformed EPIC number in the path is a bad request rather than a miss.
fn epic_param(epic_number: std::result::Result<EpicNumber, EpicError>) -> Result<EpicNumber> {
    epic_number.map_err(|e| Error::bad_request(e.to_string()))
}

async fn find_voter(voters: &Coll<Voter>, epic_number: &EpicNumber) -> Result<Voter> {
    Voter::find(voters, epic_number)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {epic_number}")))
}

#[allow(clippy::too_many_arguments)]
#[get("/api/voters?<q>&<part_no>&<ward_no>&<booth_no>&<family_id>&<pagination..>")]
async fn search_voters(
    _permit: Permit<gate::Voters>,
    q: Option<String>,
    part_no: Option<u32>,
    ward_no: Option<u32>,
    booth_no: Option<u32>,
    family_id: Option<String>,
    pagination: PaginationRequest,
    voters: Coll<Voter>,
) -> Reply<Paginated<VoterView>> {
    let pagination = pagination.validate()?;
    let query = VoterQuery {
        q,
        part_no,
        ward_no,
        booth_no,
        family_id,
    };
    let (page, total) = Voter::search(&voters, query.to_filter(), pagination).await?;
    ok(pagination.to_paginated(total, page.into_iter().map(Into::into).collect()))
}

#[get("/api/voters/<epic_number>")]
async fn get_voter(
    _permit: Permit<gate::Voters>,
    epic_number: std::result::Result<EpicNumber, EpicError>,
    voters: Coll<Voter>,
    marks: Coll<VoteMark>,
) -> Reply<VoterDetail> {
    let voter = find_voter(&voters, &epic_param(epic_number)?).await?;
    let history = VoteMark::history(&marks, &voter.epic_number).await?;
    ok(VoterDetail {
        voter: voter.into(),
        voting_history: history.into_iter().map(Into::into).collect(),
    })
}

#[get("/api/voters/<epic_number>/family")]
async fn get_family(
    _permit: Permit<gate::Voters>,
    epic_number: std::result::Result<EpicNumber, EpicError>,
    voters: Coll<Voter>,
) -> Reply<Vec<VoterView>> {
    let voter = find_voter(&voters, &epic_param(epic_number)?).await?;
    let family = voter.family(&voters).await?;
    ok(family.into_iter().map(Into::into).collect())
}

#[post("/api/voters", data = "<record>", format = "json")]
async fn create_voter(
    permit: Permit<gate::Operator>,
    record: Json<VoterRecord>,
    voters: Coll<Voter>,
) -> Reply<VoterView> {
    let voter = Voter::try_from(record.0)?;
    match voters.insert_one(&voter, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::bad_request(format!(
                "Voter {} already exists",
                voter.epic_number
            )))
        }
        Err(e) => return Err(e.into()),
    }
    info!(
        "Voter {} added by '{}'",
        voter.epic_number, permit.user.username
    );
    ok(voter.into())
}

#[put("/api/voters/<epic_number>/mobile", data = "<update>", format = "json")]
async fn update_mobile_numbers(
    _permit: Permit<gate::Operator>,
    epic_number: std::result::Result<EpicNumber, EpicError>,
    update: Json<MobileUpdate>,
    voters: Coll<Voter>,
) -> Reply<VoterView> {
    let epic_number = epic_param(epic_number)?;
    let mobile_numbers = update.parse()?;
    if !Voter::set_mobile_numbers(&voters, &epic_number, mobile_numbers).await? {
        return Err(Error::not_found(format!("Voter {epic_number}")));
    }
    ok(find_voter(&voters, &epic_number).await?.into())
}

/// Add voters in bulk. Voters already on the roll are left untouched.
#[post("/api/voters/import", data = "<import>", format = "json")]
async fn import_voters(
    permit: Permit<gate::Admin>,
    import: Json<VoterImport>,
    voters: Coll<Voter>,
) -> Reply<ImportView> {
    let batch = import.0.parse()?;
    let summary = Voter::import(&voters, batch).await?;
    info!(
        "Import by '{}': {} inserted, {} duplicates skipped",
        permit.user.username, summary.inserted, summary.duplicates
    );
    ok(summary)
}
