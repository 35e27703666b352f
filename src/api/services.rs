use mongodb::Client;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Error,
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            service::{ServiceQuery, ServiceRequest, ServiceView},
        },
        common::gate,
        db::{
            beneficiary::Beneficiary,
            service::{NewService, Service},
        },
        mongodb::{Coll, Id},
    },
};

type Services = Permit<gate::Services>;

pub fn routes() -> Vec<Route> {
    routes![
        list_services,
        get_service,
        create_service,
        update_service,
        delete_service,
    ]
}

#[get("/api/services?<query..>")]
async fn list_services(
    _permit: Services,
    query: ServiceQuery,
    services: Coll<Service>,
) -> Reply<Vec<ServiceView>> {
    let services = Service::list(&services, query.to_filter()).await?;
    ok(services.into_iter().map(Into::into).collect())
}

#[get("/api/services/<service_id>")]
async fn get_service(
    _permit: Services,
    service_id: Id,
    services: Coll<Service>,
) -> Reply<ServiceView> {
    let service = Service::find(&services, service_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Service {service_id}")))?;
    ok(service.into())
}

#[post("/api/services", data = "<request>", format = "json")]
async fn create_service(
    permit: Services,
    request: Json<ServiceRequest>,
    new_services: Coll<NewService>,
) -> Reply<ServiceView> {
    let service = request.0.into_new(permit.user.id)?;
    let result = new_services.insert_one(&service, None).await?;
    ok(Service {
        id: Id::inserted(&result)?,
        service,
    }
    .into())
}

#[put("/api/services/<service_id>", data = "<request>", format = "json")]
async fn update_service(
    _permit: Services,
    service_id: Id,
    request: Json<ServiceRequest>,
    db_client: &State<Client>,
    services: Coll<Service>,
    beneficiaries: Coll<Beneficiary>,
) -> Reply<ServiceView> {
    let update = request.to_update()?;
    let service =
        Service::update_unreferenced(db_client, &services, &beneficiaries, service_id, update)
            .await?
            .ok_or_else(|| Error::not_found(format!("Service {service_id}")))?;
    ok(service.into())
}

#[delete("/api/services/<service_id>")]
async fn delete_service(
    _permit: Services,
    service_id: Id,
    db_client: &State<Client>,
    services: Coll<Service>,
    beneficiaries: Coll<Beneficiary>,
) -> Reply<()> {
    if !Service::delete_unreferenced(db_client, &services, &beneficiaries, service_id).await? {
        return Err(Error::not_found(format!("Service {service_id}")));
    }
    ok(())
}
