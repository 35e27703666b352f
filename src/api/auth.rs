use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::Error,
    model::{
        api::{
            auth::{AuthToken, CurrentUser, AUTH_TOKEN_COOKIE},
            envelope::{ok, Reply},
            user::{LoginRequest, SessionView},
        },
        db::{role::Role, user::User},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, logout, me]
}

#[post("/api/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    users: Coll<User>,
    roles: Coll<Role>,
    config: &State<Config>,
) -> Reply<SessionView> {
    let with_username = doc! {
        "username": credentials.username.trim(),
    };

    // Same message whether the user is unknown, inactive, or the password is wrong.
    let user = users
        .find_one(with_username, None)
        .await?
        .filter(|user| user.active && user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid username or password"))?;

    let permissions = user.effective_permissions(&roles).await?;
    cookies.add_private(AuthToken::new(&user).into_cookie(config)?);
    info!("User '{}' signed in", user.username);

    ok(SessionView {
        modules: permissions.granted_modules(),
        user: user.into(),
    })
}

#[delete("/api/auth")]
async fn logout(cookies: &CookieJar<'_>) -> Reply<()> {
    cookies.remove_private(Cookie::named(AUTH_TOKEN_COOKIE));
    ok(())
}

/// The signed-in user and the modules they can open.
#[get("/api/auth/me")]
async fn me(current: CurrentUser) -> Reply<SessionView> {
    ok(SessionView {
        modules: current.permissions.granted_modules(),
        user: current.user.into(),
    })
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::{
        api::testing,
        model::{
            common::Module,
            db::user::{NewUser, EXAMPLE_PASSWORD},
        },
    };

    use super::*;

    #[backend_test]
    async fn login_logout(client: Client, users: Coll<NewUser>) {
        users
            .insert_one(NewUser::example_operator(), None)
            .await
            .unwrap();

        // Not yet signed in.
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(testing::error(response).await, "Not signed in");

        // Sign in.
        let status = testing::login(&client, "operator", EXAMPLE_PASSWORD).await;
        assert_eq!(Status::Ok, status);
        assert!(client.cookies().get_private(AUTH_TOKEN_COOKIE).is_some());

        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let session: SessionView = testing::data(response).await;
        assert_eq!(session.user.username, "operator");
        assert_eq!(session.modules, vec![Module::Operator, Module::Voters]);

        // Sign out.
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn bad_credentials(client: Client, users: Coll<NewUser>) {
        let mut inactive = NewUser::example_viewer();
        inactive.active = false;
        users
            .insert_many([NewUser::example_operator(), inactive], None)
            .await
            .unwrap();

        for (username, password) in [
            ("operator", "wrong-password"),
            ("nobody", EXAMPLE_PASSWORD),
            ("viewer", EXAMPLE_PASSWORD),
        ] {
            let status = testing::login(&client, username, password).await;
            assert_eq!(Status::Unauthorized, status, "{username}");
        }
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }

    #[backend_test(admin)]
    async fn session_cookie_is_encrypted(client: Client) {
        let token = client
            .cookies()
            .get_private(AUTH_TOKEN_COOKIE)
            .unwrap()
            .value()
            .to_string();
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        // The bare JWT is not accepted in place of the encrypted cookie.
        let response = client
            .get(uri!(me))
            .cookie(Cookie::new(AUTH_TOKEN_COOKIE, token.clone()))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .get(uri!(me))
            .private_cookie(Cookie::new(AUTH_TOKEN_COOKIE, token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(admin)]
    async fn admin_sees_every_module(client: Client, db: Database) {
        let response = client.get(uri!(me)).dispatch().await;
        let session: SessionView = testing::data(response).await;
        assert_eq!(session.modules, Module::ALL.to_vec());

        // The seeded admin holds the admin role rather than their own map.
        let admin = Coll::<User>::from_db(&db)
            .find_one(doc! { "username": &session.user.username }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.permissions.is_none());
        assert!(admin.role_id.is_some());
    }

    #[backend_test(operator)]
    async fn deactivation_ends_session(client: Client, users: Coll<User>) {
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        users
            .update_one(
                doc! { "username": "operator" },
                doc! { "$set": { "active": false } },
                None,
            )
            .await
            .unwrap();
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(testing::error(response).await, "Account no longer active");
    }
}
