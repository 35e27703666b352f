use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::user::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    default_admin_username: String,
    utc_offset_minutes: UtcOffset,
    // secrets
    jwt_secret: String,
    default_admin_password: String,
}

impl Config {
    /// Valid lifetime of session cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Username of the administrator seeded into an empty database.
    pub fn default_admin_username(&self) -> &str {
        &self.default_admin_username
    }

    /// Initial password of the seeded administrator.
    pub fn default_admin_password(&self) -> &str {
        &self.default_admin_password
    }

    /// The constituency's calendar date right now. Visit dates, the dashboard
    /// and the programme all count days in local time.
    pub fn today(&self) -> NaiveDate {
        self.utc_offset_minutes.date_at(Utc::now())
    }
}

/// Local time's offset from UTC, configured in minutes east.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i32")]
pub struct UtcOffset(FixedOffset);

impl UtcOffset {
    /// The local calendar date at `instant`.
    pub fn date_at(self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }
}

impl TryFrom<i32> for UtcOffset {
    type Error = String;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self)
            .ok_or_else(|| format!("UTC offset of {minutes} minutes is out of range"))
    }
}

/// Loads [`Config`] into managed state, failing ignition with a readable
/// error if any key is missing.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    db_name: String,
    // secrets
    db_uri: String,
}

/// Connects to MongoDB, ensures indexes and the seed administrator exist,
/// and places both a `Client` and a `Database` into managed state.
///
/// The client is created once and shared by every request; the driver pools
/// connections internally.
pub struct DatabaseFairing {
    connection: Option<(MongoClient, String)>,
}

impl DatabaseFairing {
    /// Connect using `db_uri` and `db_name` from the figment.
    pub fn from_config() -> Self {
        Self { connection: None }
    }

    /// Use an existing client and database name instead of the configured ones.
    pub fn with_client(client: MongoClient, db_name: impl Into<String>) -> Self {
        Self {
            connection: Some((client, db_name.into())),
        }
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (client, db_name) = match &self.connection {
            Some((client, db_name)) => (client.clone(), db_name.clone()),
            None => {
                let config = match rocket.figment().extract::<DbConfig>() {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Failed to load database config");
                        rocket::config::pretty_print_error(e);
                        return Err(rocket);
                    }
                };
                info!("Loaded database config, connecting...");
                match MongoClient::with_uri_str(&config.db_uri).await {
                    Ok(client) => (client, config.db_name),
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };
        let db = client.database(&db_name);

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }

        // The config fairing is attached first, so the config is available.
        let Some(config) = rocket.state::<Config>() else {
            error!("Database fairing requires the application config");
            return Err(rocket);
        };
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), &Coll::from_db(&db), config).await
        {
            error!("Failed to seed administrator: {e}");
            return Err(rocket);
        }
        info!("...database {db_name} online!");

        Ok(rocket.manage(client).manage(db))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_date_crosses_midnight_before_utc() {
        let ist = UtcOffset::try_from(330).unwrap();
        let utc = UtcOffset::try_from(0).unwrap();
        // 00:30 in India is still the previous evening in UTC.
        let instant = Utc.with_ymd_and_hms(2026, 10, 18, 19, 0, 0).unwrap();
        assert_eq!(ist.date_at(instant), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(utc.date_at(instant), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        let before = Utc.with_ymd_and_hms(2026, 10, 18, 18, 29, 59).unwrap();
        assert_eq!(ist.date_at(before), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        let west = UtcOffset::try_from(-300).unwrap();
        let morning = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
        assert_eq!(west.date_at(morning), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn offsets_must_be_under_a_day() {
        assert!(UtcOffset::try_from(24 * 60).is_err());
        assert!(UtcOffset::try_from(-24 * 60).is_err());
        assert!(UtcOffset::try_from(i32::MAX).is_err());
        assert!(UtcOffset::try_from(-(23 * 60 + 59)).is_ok());
    }
}
