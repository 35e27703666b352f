#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{fairing::AdHoc, Build, Rocket};

use crate::{
    config::{ConfigFairing, DatabaseFairing},
    logging::LoggerFairing,
};

pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// The server, connecting to the configured database on ignition.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build(), DatabaseFairing::from_config())
}

fn assemble(rocket: Rocket<Build>, database: DatabaseFairing) -> Rocket<Build> {
    rocket
        .attach(ConfigFairing)
        .attach(database)
        .attach(LoggerFairing)
        .attach(AdHoc::try_on_ignite("Assistant tools", |rocket| async move {
            match assistant::tools::toolset() {
                Ok(tools) => {
                    info!("Registered assistant tools {tools:?}");
                    Ok(rocket.manage(tools))
                }
                Err(e) => {
                    error!("Failed to register assistant tools: {e}");
                    Err(rocket)
                }
            }
        }))
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server using the given client and database, for tests.
#[cfg(test)]
pub(crate) fn rocket_for_db(
    db_client: mongodb::Client,
    db_name: impl Into<String>,
) -> Rocket<Build> {
    assemble(
        rocket::build(),
        DatabaseFairing::with_client(db_client, db_name),
    )
}

/// A client for the configured test database server.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .unwrap_or_else(|e| panic!("Could not connect to database at {db_uri}: {e}"))
}

/// A fresh database name, so tests running in parallel never share data.
#[cfg(test)]
pub(crate) fn database() -> String {
    use rand::{distributions::Alphanumeric, Rng};

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("test_{suffix}")
}
