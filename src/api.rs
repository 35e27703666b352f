use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::{error::Rejection, model::api::envelope::Failure};

pub(crate) mod auth;
mod beneficiaries;
mod chat;
mod dashboard;
mod programme;
mod projects;
mod reference;
mod services;
mod users;
mod visitors;
mod voters;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(users::routes());
    routes.extend(voters::routes());
    routes.extend(votes::routes());
    routes.extend(reference::routes());
    routes.extend(services::routes());
    routes.extend(beneficiaries::routes());
    routes.extend(visitors::routes());
    routes.extend(programme::routes());
    routes.extend(projects::routes());
    routes.extend(dashboard::routes());
    routes.extend(chat::routes());
    routes
}

/// Catchers that keep error responses in the same envelope as handler errors.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error,
        default_catcher,
    ]
}

/// The guard's own message if a guard failed, otherwise `fallback`.
fn envelope(req: &Request<'_>, fallback: &str) -> Json<Failure> {
    let rejection = req.local_cache(|| Rejection(None));
    Json(Failure::new(
        rejection.0.clone().unwrap_or_else(|| fallback.to_string()),
    ))
}

#[catch(400)]
fn bad_request(req: &Request) -> Json<Failure> {
    envelope(req, "Bad request")
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Failure> {
    envelope(req, "Not signed in")
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Failure> {
    envelope(req, "Forbidden")
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Failure> {
    envelope(req, "Not found")
}

#[catch(422)]
fn unprocessable(req: &Request) -> Json<Failure> {
    envelope(req, "Request body is not in the expected format")
}

#[catch(500)]
fn internal_error(req: &Request) -> Json<Failure> {
    envelope(req, "Internal server error")
}

#[catch(default)]
fn default_catcher(status: Status, req: &Request) -> Json<Failure> {
    envelope(req, status.reason().unwrap_or("Request failed"))
}

/// Helpers shared by the route tests.
#[cfg(test)]
pub(crate) mod testing {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json},
    };
    use serde::de::DeserializeOwned;

    use crate::model::api::envelope::{Failure, Success};

    /// Parse a success envelope, returning its data.
    pub async fn data<T: DeserializeOwned>(response: LocalResponse<'_>) -> T {
        let raw = response.into_string().await.unwrap();
        let success: Success<T> = serde_json::from_str(&raw)
            .unwrap_or_else(|e| panic!("Not a success envelope ({e}): {raw}"));
        assert!(success.success);
        success.data
    }

    /// Parse a failure envelope, returning its message.
    pub async fn error(response: LocalResponse<'_>) -> String {
        let raw = response.into_string().await.unwrap();
        let failure: Failure = serde_json::from_str(&raw)
            .unwrap_or_else(|e| panic!("Not a failure envelope ({e}): {raw}"));
        assert!(!failure.success);
        failure.error
    }

    /// Sign the client in, replacing any existing session.
    pub async fn login(client: &Client, username: &str, password: &str) -> Status {
        client
            .post(uri!(crate::api::auth::login))
            .header(ContentType::JSON)
            .body(json!({ "username": username, "password": password }).to_string())
            .dispatch()
            .await
            .status()
    }
}
