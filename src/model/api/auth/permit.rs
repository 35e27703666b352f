use std::marker::PhantomData;
use std::ops::Deref;

use mongodb::Database;
use rocket::{
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::{
    error::Error,
    model::{
        common::{Gate, Permissions},
        db::user::User,
        mongodb::Coll,
    },
};

use super::token::AuthToken;

/// The signed-in user, loaded from the database, with the permissions in
/// force for them. Fails with 401 if there is no session or the user has
/// since been deleted or deactivated.
pub struct CurrentUser {
    pub user: User,
    pub permissions: Permissions,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken>().await);

        // Unwrap is safe as the `Database` is always managed.
        let db = req.guard::<&State<Database>>().await.unwrap();
        let user = match Coll::<User>::from_db(db)
            .find_one(token.id().as_doc(), None)
            .await
        {
            Ok(Some(user)) if user.active => user,
            Ok(_) => return Error::unauthorized("Account no longer active").reject(req),
            Err(e) => return Error::from(e).reject(req),
        };
        match user.effective_permissions(&Coll::from_db(db)).await {
            Ok(permissions) => Outcome::Success(Self { user, permissions }),
            Err(e) => e.reject(req),
        }
    }
}

/// Proof that the signed-in user may use module `G`. Taking this as the first
/// handler argument gates the route: 401 without a session, 403 without the
/// module, and the handler body never runs in either case.
pub struct Permit<G> {
    pub current: CurrentUser,
    phantom: PhantomData<G>,
}

impl<G> Deref for Permit<G> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.current
    }
}

#[rocket::async_trait]
impl<'r, G> FromRequest<'r> for Permit<G>
where
    G: Gate + Send,
{
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let current = try_outcome!(req.guard::<CurrentUser>().await);
        if !current.permissions.grants(G::MODULE) {
            return Error::forbidden(format!("No access to the {} module", G::MODULE)).reject(req);
        }
        Outcome::Success(Self {
            current,
            phantom: PhantomData,
        })
    }
}
