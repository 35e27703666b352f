use mongodb::bson::{doc, Document};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::id::ApiId,
        common::{Module, Permissions},
        db::{
            role::{NewRole, Role},
            user::{NewUser, User},
        },
    },
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is the recommended salt length for Argon2.
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &argon2::Config::default(),
    )?)
}

fn check_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn check_permissions(permissions: Option<&Permissions>) -> Result<()> {
    if let Some(permissions) = permissions {
        permissions
            .validate()
            .map_err(|e| Error::bad_request(e.to_string()))?;
    }
    Ok(())
}

/// Username and plaintext password, as submitted to the login endpoint.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for creating a user.
#[derive(Clone, Deserialize, Serialize)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub role_id: Option<ApiId>,
    pub permissions: Option<Permissions>,
}

impl TryFrom<NewUserRequest> for NewUser {
    type Error = Error;

    /// Validate the request and hash the password. Role existence is checked
    /// separately, since it needs the database.
    fn try_from(request: NewUserRequest) -> Result<Self> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(Error::bad_request("Username must not be empty"));
        }
        check_password(&request.password)?;
        check_permissions(request.permissions.as_ref())?;
        Ok(Self {
            display_name: request
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| username.clone()),
            username,
            password_hash: hash_password(&request.password)?,
            active: true,
            role_id: request.role_id.map(|id| *id),
            permissions: request.permissions,
        })
    }
}

/// Partial update of a user. Absent fields are left unchanged.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub role_id: Option<ApiId>,
    pub permissions: Option<Permissions>,
    /// Remove the user's own permissions so that their role's apply.
    #[serde(default)]
    pub clear_permissions: bool,
    pub active: Option<bool>,
}

impl UpdateUserRequest {
    /// Build the update document.
    pub fn to_update(&self) -> Result<Document> {
        if self.permissions.is_some() && self.clear_permissions {
            return Err(Error::bad_request(
                "Cannot both set and clear permissions",
            ));
        }
        check_permissions(self.permissions.as_ref())?;

        let mut set = Document::new();
        if let Some(name) = &self.display_name {
            if name.trim().is_empty() {
                return Err(Error::bad_request("Display name must not be empty"));
            }
            set.insert("display_name", name.trim());
        }
        if let Some(role_id) = self.role_id {
            set.insert("role_id", *role_id);
        }
        if let Some(permissions) = &self.permissions {
            set.insert("permissions", permissions.clone());
        }
        if let Some(active) = self.active {
            set.insert("active", active);
        }

        let mut update = Document::new();
        if self.clear_permissions {
            update.insert("$unset", doc! { "permissions": "" });
        }
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if update.is_empty() {
            return Err(Error::bad_request("Nothing to update"));
        }
        Ok(update)
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct PasswordReset {
    pub password: String,
}

impl PasswordReset {
    pub fn into_hash(self) -> Result<String> {
        check_password(&self.password)?;
        hash_password(&self.password)
    }
}

/// A user as shown to API clients. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: ApiId,
    pub username: String,
    pub display_name: String,
    pub active: bool,
    pub role_id: Option<ApiId>,
    pub permissions: Option<Permissions>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
            display_name: user.user.display_name,
            active: user.user.active,
            role_id: user.user.role_id.map(Into::into),
            permissions: user.user.permissions,
        }
    }
}

/// The signed-in user and the modules they may open.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub user: UserView,
    pub modules: Vec<Module>,
}

/// Result of a single permission check.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub module: Module,
    pub granted: bool,
}

/// Request body for creating or replacing a role.
#[derive(Clone, Deserialize, Serialize)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl TryFrom<RoleRequest> for NewRole {
    type Error = Error;

    fn try_from(request: RoleRequest) -> Result<Self> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::bad_request("Role name must not be empty"));
        }
        check_permissions(Some(&request.permissions))?;
        Ok(Self {
            name,
            description: request.description.filter(|d| !d.trim().is_empty()),
            permissions: request.permissions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Permissions,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.into(),
            name: role.role.name,
            description: role.role.description,
            permissions: role.role.permissions,
        }
    }
}
