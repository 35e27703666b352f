use std::ops::{Deref, DerefMut};

use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::Result,
    model::{
        api::user::hash_password,
        common::{Module, Permissions},
        db::role::{NewRole, Role, ADMIN_ROLE_NAME},
        mongodb::{Coll, Id},
    },
};

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub active: bool,
    pub role_id: Option<Id>,
    /// When present, replaces the role's permissions entirely.
    pub permissions: Option<Permissions>,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed stored hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl User {
    /// The permissions in force for this user, loading their role if needed.
    pub async fn effective_permissions(&self, roles: &Coll<Role>) -> Result<Permissions> {
        let role = match (&self.permissions, self.role_id) {
            (None, Some(role_id)) => roles.find_one(role_id.as_doc(), None).await?,
            _ => None,
        };
        Ok(Permissions::effective(
            self.permissions.as_ref(),
            role.as_ref().map(|r| &r.permissions),
        )
        .cloned()
        .unwrap_or_default())
    }
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// If there are no users at all, create the configured administrator, with
/// an `admin` role, so that the system can be bootstrapped.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(
    users: &Coll<NewUser>,
    roles: &Coll<Role>,
    config: &Config,
) -> Result<()> {
    if users.count_documents(None, None).await? > 0 {
        return Ok(());
    }

    let role_id = match roles
        .find_one(doc! { "name": ADMIN_ROLE_NAME }, None)
        .await?
    {
        Some(role) => role.id,
        None => {
            let role = NewRole {
                name: ADMIN_ROLE_NAME.to_string(),
                description: Some("Full access to every module".to_string()),
                permissions: Permissions::from_modules([Module::Admin]),
            };
            let result = roles
                .clone_with_type::<NewRole>()
                .insert_one(role, None)
                .await?;
            Id::inserted(&result)?
        }
    };

    let admin = NewUser {
        username: config.default_admin_username().to_string(),
        display_name: "Administrator".to_string(),
        password_hash: hash_password(config.default_admin_password())?,
        active: true,
        role_id: Some(role_id),
        permissions: None,
    };
    users.insert_one(admin, None).await?;
    warn!(
        "No users found; created administrator '{}'. Change its password!",
        config.default_admin_username()
    );
    Ok(())
}


#[cfg(test)]
pub use examples::EXAMPLE_PASSWORD;
