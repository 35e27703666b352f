use mongodb::bson::Document;
use rocket::{Route, State};

use crate::{
    config::Config,
    model::{
        api::{
            auth::Permit,
            dashboard::DashboardView,
            envelope::{ok, Reply},
        },
        common::gate,
        db::{
            beneficiary::Beneficiary, programme::ProgrammeItem, project::Project,
            visitor::Visitor, voter::Voter,
        },
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![dashboard]
}

#[get("/api/dashboard")]
async fn dashboard(
    _permit: Permit<gate::Dashboard>,
    voters: Coll<Voter>,
    beneficiaries: Coll<Beneficiary>,
    projects: Coll<Project>,
    visitors: Coll<Visitor>,
    programme: Coll<ProgrammeItem>,
    config: &State<Config>,
) -> Reply<DashboardView> {
    let today = config.today();
    let beneficiaries = Beneficiary::count_by_status(&beneficiaries, Document::new()).await?;
    let projects = Project::count_by_status(&projects).await?;
    let programme_today = ProgrammeItem::for_date(&programme, today).await?;

    ok(DashboardView {
        date: today,
        voters: voters.count_documents(None, None).await?,
        beneficiaries: beneficiaries.into_iter().map(Into::into).collect(),
        projects: projects.into_iter().map(Into::into).collect(),
        visitors_today: visitors
            .count_documents(Visitor::date_filter(today), None)
            .await?,
        programme_today: programme_today.into_iter().map(Into::into).collect(),
    })
}
