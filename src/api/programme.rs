use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use rocket::{serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::Error,
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            programme::{replacement, ProgrammeQuery, ProgrammeRequest, ProgrammeView},
        },
        common::gate,
        db::programme::{NewProgrammeItem, ProgrammeItem},
        mongodb::{Coll, Id},
    },
};

type Programme = Permit<gate::Programme>;

pub fn routes() -> Vec<Route> {
    routes![
        list_programme,
        get_programme_item,
        create_programme_item,
        update_programme_item,
        delete_programme_item,
    ]
}

/// The day's programme, or every item in a date range.
#[get("/api/programme?<date>&<from>&<to>")]
async fn list_programme(
    _permit: Programme,
    date: Option<String>,
    from: Option<String>,
    to: Option<String>,
    programme: Coll<ProgrammeItem>,
    config: &State<Config>,
) -> Reply<Vec<ProgrammeView>> {
    let filter = ProgrammeQuery { date, from, to }.to_filter(config.today())?;
    let items = ProgrammeItem::list(&programme, filter).await?;
    ok(items.into_iter().map(Into::into).collect())
}

#[get("/api/programme/<item_id>")]
async fn get_programme_item(
    _permit: Programme,
    item_id: Id,
    programme: Coll<ProgrammeItem>,
) -> Reply<ProgrammeView> {
    let item = ProgrammeItem::find(&programme, item_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Programme item {item_id}")))?;
    ok(item.into())
}

#[post("/api/programme", data = "<request>", format = "json")]
async fn create_programme_item(
    permit: Programme,
    request: Json<ProgrammeRequest>,
    new_programme: Coll<NewProgrammeItem>,
) -> Reply<ProgrammeView> {
    let item = request.0.into_new(permit.user.id)?;
    ok(ProgrammeItem::insert(&new_programme, item).await?.into())
}

#[put("/api/programme/<item_id>", data = "<request>", format = "json")]
async fn update_programme_item(
    permit: Programme,
    item_id: Id,
    request: Json<ProgrammeRequest>,
    programme: Coll<ProgrammeItem>,
) -> Reply<ProgrammeView> {
    let item = request.0.into_new(permit.user.id)?;
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = programme
        .find_one_and_update(item_id.as_doc(), replacement(&item), options)
        .await?
        .ok_or_else(|| Error::not_found(format!("Programme item {item_id}")))?;
    ok(updated.into())
}

#[delete("/api/programme/<item_id>")]
async fn delete_programme_item(
    _permit: Programme,
    item_id: Id,
    programme: Coll<ProgrammeItem>,
) -> Reply<()> {
    let result = programme.delete_one(item_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Programme item {item_id}")));
    }
    ok(())
}
