use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            user::{
                NewUserRequest, PasswordReset, PermissionCheck, RoleRequest, RoleView,
                UpdateUserRequest, UserView,
            },
        },
        common::{gate, Module, UnknownModule},
        db::{
            role::{NewRole, Role},
            user::{NewUser, User},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

type Manager = Permit<gate::UserManagement>;

pub fn routes() -> Vec<Route> {
    routes![
        list_roles,
        create_role,
        update_role,
        delete_role,
        list_users,
        get_user,
        create_user,
        update_user,
        reset_password,
        delete_user,
        check_permission,
    ]
}

async fn ensure_role_exists(roles: &Coll<Role>, role_id: Id) -> Result<()> {
    match roles.find_one(role_id.as_doc(), None).await? {
        Some(_) => Ok(()),
        None => Err(Error::not_found(format!("Role {role_id}"))),
    }
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[get("/api/roles")]
async fn list_roles(_permit: Manager, roles: Coll<Role>) -> Reply<Vec<RoleView>> {
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let roles: Vec<Role> = roles.find(None, options).await?.try_collect().await?;
    ok(roles.into_iter().map(Into::into).collect())
}

#[post("/api/roles", data = "<request>", format = "json")]
async fn create_role(
    _permit: Manager,
    request: Json<RoleRequest>,
    new_roles: Coll<NewRole>,
) -> Reply<RoleView> {
    let role = NewRole::try_from(request.0)?;
    let result = match new_roles.insert_one(&role, None).await {
        Ok(result) => result,
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::bad_request(format!(
                "Role '{}' already exists",
                role.name
            )))
        }
        Err(e) => return Err(e.into()),
    };
    ok(Role {
        id: Id::inserted(&result)?,
        role,
    }
    .into())
}

#[put("/api/roles/<role_id>", data = "<request>", format = "json")]
async fn update_role(
    _permit: Manager,
    role_id: Id,
    request: Json<RoleRequest>,
    roles: Coll<Role>,
) -> Reply<RoleView> {
    let role = NewRole::try_from(request.0)?;
    let update = doc! {
        "$set": {
            "name": &role.name,
            "description": role.description.clone(),
            "permissions": role.permissions.clone(),
        }
    };
    match roles
        .find_one_and_update(role_id.as_doc(), update, after_update())
        .await
    {
        Ok(Some(updated)) => ok(updated.into()),
        Ok(None) => Err(Error::not_found(format!("Role {role_id}"))),
        Err(e) if is_duplicate_key_error(&e) => Err(Error::bad_request(format!(
            "Role '{}' already exists",
            role.name
        ))),
        Err(e) => Err(e.into()),
    }
}

#[delete("/api/roles/<role_id>")]
async fn delete_role(
    _permit: Manager,
    role_id: Id,
    roles: Coll<Role>,
    users: Coll<User>,
) -> Reply<()> {
    let holders = users
        .count_documents(doc! { "role_id": role_id }, None)
        .await?;
    if holders > 0 {
        return Err(Error::bad_request(format!(
            "Role is assigned to {holders} user(s) and cannot be deleted"
        )));
    }
    let result = roles.delete_one(role_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Role {role_id}")));
    }
    ok(())
}

#[get("/api/users")]
async fn list_users(_permit: Manager, users: Coll<User>) -> Reply<Vec<UserView>> {
    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let users: Vec<User> = users.find(None, options).await?.try_collect().await?;
    ok(users.into_iter().map(Into::into).collect())
}

#[get("/api/users/<user_id>")]
async fn get_user(_permit: Manager, user_id: Id, users: Coll<User>) -> Reply<UserView> {
    let user = users
        .find_one(user_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    ok(user.into())
}

#[post("/api/users", data = "<request>", format = "json")]
async fn create_user(
    _permit: Manager,
    request: Json<NewUserRequest>,
    new_users: Coll<NewUser>,
    roles: Coll<Role>,
) -> Reply<UserView> {
    let user = NewUser::try_from(request.0)?;
    if let Some(role_id) = user.role_id {
        ensure_role_exists(&roles, role_id).await?;
    }
    let result = match new_users.insert_one(&user, None).await {
        Ok(result) => result,
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::bad_request(format!(
                "Username '{}' already exists",
                user.username
            )))
        }
        Err(e) => return Err(e.into()),
    };
    info!("Created user '{}'", user.username);
    ok(User {
        id: Id::inserted(&result)?,
        user,
    }
    .into())
}

#[patch("/api/users/<user_id>", data = "<request>", format = "json")]
async fn update_user(
    permit: Manager,
    user_id: Id,
    request: Json<UpdateUserRequest>,
    users: Coll<User>,
    roles: Coll<Role>,
) -> Reply<UserView> {
    let update = request.to_update()?;
    if let Some(role_id) = request.role_id {
        ensure_role_exists(&roles, *role_id).await?;
    }
    if request.active == Some(false) && permit.user.id == user_id {
        return Err(Error::bad_request("You cannot deactivate yourself"));
    }
    let user = users
        .find_one_and_update(user_id.as_doc(), update, after_update())
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    ok(user.into())
}

#[put("/api/users/<user_id>/password", data = "<request>", format = "json")]
async fn reset_password(
    _permit: Manager,
    user_id: Id,
    request: Json<PasswordReset>,
    users: Coll<User>,
) -> Reply<()> {
    let update = doc! {
        "$set": { "password_hash": request.0.into_hash()? },
    };
    let result = users.update_one(user_id.as_doc(), update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    ok(())
}

#[delete("/api/users/<user_id>")]
async fn delete_user(permit: Manager, user_id: Id, users: Coll<User>) -> Reply<()> {
    if permit.user.id == user_id {
        return Err(Error::bad_request("You cannot delete yourself"));
    }
    let result = users.delete_one(user_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    ok(())
}

/// Whether the given user may open the given module.
#[get("/api/users/<user_id>/permissions/<module>")]
async fn check_permission(
    _permit: Manager,
    user_id: Id,
    module: std::result::Result<Module, UnknownModule>,
    users: Coll<User>,
    roles: Coll<Role>,
) -> Reply<PermissionCheck> {
    let module = module.map_err(|e| Error::bad_request(e.to_string()))?;
    let user = users
        .find_one(user_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    let permissions = user.effective_permissions(&roles).await?;
    ok(PermissionCheck {
        module,
        granted: permissions.grants(module),
    })
}
