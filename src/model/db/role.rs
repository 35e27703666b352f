use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::Permissions, mongodb::Id};

/// Core role data: a named, reusable permissions map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCore {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Permissions,
}

/// A role without an ID.
pub type NewRole = RoleCore;

/// A role from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub role: RoleCore,
}

impl Deref for Role {
    type Target = RoleCore;

    fn deref(&self) -> &Self::Target {
        &self.role
    }
}

impl DerefMut for Role {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.role
    }
}

/// Name of the role given to the seeded administrator.
pub const ADMIN_ROLE_NAME: &str = "admin";
