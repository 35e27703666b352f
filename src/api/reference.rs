use rocket::Route;

use crate::model::{
    api::{
        auth::Permit,
        envelope::{ok, Reply},
        reference::{BoothView, ElectionView, PartView},
    },
    common::gate,
    db::reference::{Booth, Election, Part},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![list_elections, list_booths, list_parts]
}

#[get("/api/elections")]
async fn list_elections(
    _permit: Permit<gate::Voters>,
    elections: Coll<Election>,
) -> Reply<Vec<ElectionView>> {
    let elections = Election::all(&elections).await?;
    ok(elections.into_iter().map(Into::into).collect())
}

#[get("/api/booths?<ward_no>&<part_no>")]
async fn list_booths(
    _permit: Permit<gate::Voters>,
    ward_no: Option<u32>,
    part_no: Option<u32>,
    booths: Coll<Booth>,
) -> Reply<Vec<BoothView>> {
    let booths = Booth::list(&booths, ward_no, part_no).await?;
    ok(booths.into_iter().map(Into::into).collect())
}

#[get("/api/parts?<ward_no>")]
async fn list_parts(
    _permit: Permit<gate::Voters>,
    ward_no: Option<u32>,
    parts: Coll<Part>,
) -> Reply<Vec<PartView>> {
    let parts = Part::list(&parts, ward_no).await?;
    ok(parts.into_iter().map(Into::into).collect())
}
