use rocket::{serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::Error,
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            fields,
            pagination::{Paginated, PaginationRequest},
            visitor::{NewVisitorRequest, VisitorQuery, VisitorView},
        },
        common::gate,
        db::{
            programme::ProgrammeItem,
            visitor::{NewVisitor, Visitor},
            voter::Voter,
        },
        mongodb::Coll,
    },
};

type Visitors = Permit<gate::Visitors>;

pub fn routes() -> Vec<Route> {
    routes![log_visit, list_visitors, visitors_by_contact]
}

#[post("/api/visitors", data = "<request>", format = "json")]
async fn log_visit(
    permit: Visitors,
    request: Json<NewVisitorRequest>,
    new_visitors: Coll<NewVisitor>,
    voters: Coll<Voter>,
    programme: Coll<ProgrammeItem>,
    config: &State<Config>,
) -> Reply<VisitorView> {
    let visitor = request.0.into_new(permit.user.id, config.today())?;
    if let Some(voter_id) = &visitor.voter_id {
        if Voter::find(&voters, voter_id).await?.is_none() {
            return Err(Error::not_found(format!("Voter {voter_id}")));
        }
    }
    if let Some(programme_id) = visitor.programme_id {
        if ProgrammeItem::find(&programme, programme_id).await?.is_none() {
            return Err(Error::not_found(format!("Programme item {programme_id}")));
        }
    }
    ok(Visitor::insert(&new_visitors, visitor).await?.into())
}

#[get("/api/visitors?<date>&<pagination..>")]
async fn list_visitors(
    _permit: Visitors,
    date: Option<String>,
    pagination: PaginationRequest,
    visitors: Coll<Visitor>,
) -> Reply<Paginated<VisitorView>> {
    let pagination = pagination.validate()?;
    let filter = VisitorQuery { date }.to_filter()?;
    let (page, total) = Visitor::list(&visitors, filter, pagination).await?;
    ok(pagination.to_paginated(total, page.into_iter().map(Into::into).collect()))
}

/// Every earlier visit from one phone number.
#[get("/api/visitors/by-contact/<contact_no>")]
async fn visitors_by_contact(
    _permit: Visitors,
    contact_no: &str,
    visitors: Coll<Visitor>,
) -> Reply<Vec<VisitorView>> {
    let contact_no = fields::mobile("contact_no", contact_no)?;
    let visits = Visitor::by_contact(&visitors, &contact_no).await?;
    ok(visits.into_iter().map(Into::into).collect())
}
