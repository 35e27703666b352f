use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::Error,
    model::{
        api::{
            auth::Permit,
            envelope::{ok, Reply},
            project::{ProjectQuery, ProjectRequest, ProjectStatusUpdate, ProjectView},
        },
        common::{gate, ProjectStatus},
        db::project::{NewProject, Project},
        mongodb::{Coll, Id},
    },
};

type Projects = Permit<gate::Projects>;

pub fn routes() -> Vec<Route> {
    routes![
        list_projects,
        get_project,
        create_project,
        update_project,
        set_project_status,
        delete_project,
    ]
}

fn not_found(project_id: Id) -> Error {
    Error::not_found(format!("Project {project_id}"))
}

#[get("/api/projects?<ward_no>&<status>")]
async fn list_projects(
    _permit: Projects,
    ward_no: Option<u32>,
    status: Option<ProjectStatus>,
    projects: Coll<Project>,
) -> Reply<Vec<ProjectView>> {
    let filter = ProjectQuery { ward_no, status }.to_filter();
    let projects = Project::list(&projects, filter).await?;
    ok(projects.into_iter().map(Into::into).collect())
}

#[get("/api/projects/<project_id>")]
async fn get_project(
    _permit: Projects,
    project_id: Id,
    projects: Coll<Project>,
) -> Reply<ProjectView> {
    let project = Project::find(&projects, project_id)
        .await?
        .ok_or_else(|| not_found(project_id))?;
    ok(project.into())
}

#[post("/api/projects", data = "<request>", format = "json")]
async fn create_project(
    permit: Projects,
    request: Json<ProjectRequest>,
    new_projects: Coll<NewProject>,
) -> Reply<ProjectView> {
    let project = request.0.into_new(permit.user.id)?;
    ok(Project::insert(&new_projects, project).await?.into())
}

#[put("/api/projects/<project_id>", data = "<request>", format = "json")]
async fn update_project(
    _permit: Projects,
    project_id: Id,
    request: Json<ProjectRequest>,
    projects: Coll<Project>,
) -> Reply<ProjectView> {
    let project = Project::update(&projects, project_id, request.to_set()?)
        .await?
        .ok_or_else(|| not_found(project_id))?;
    ok(project.into())
}

/// Any status may follow any other.
#[put("/api/projects/<project_id>/status", data = "<update>", format = "json")]
async fn set_project_status(
    _permit: Projects,
    project_id: Id,
    update: Json<ProjectStatusUpdate>,
    projects: Coll<Project>,
) -> Reply<ProjectView> {
    let project = Project::update(&projects, project_id, doc! { "status": update.status })
        .await?
        .ok_or_else(|| not_found(project_id))?;
    ok(project.into())
}

#[delete("/api/projects/<project_id>")]
async fn delete_project(
    _permit: Projects,
    project_id: Id,
    projects: Coll<Project>,
) -> Reply<()> {
    let result = projects.delete_one(project_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(not_found(project_id));
    }
    ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use crate::api::testing;

    use super::*;

    #[backend_test(admin)]
    async fn list_filters(client: Client, new_projects: Coll<NewProject>) {
        let by = Id::new();
        new_projects
            .insert_many([NewProject::example(by), NewProject::example2(by)], None)
            .await
            .unwrap();

        let response = client.get("/api/projects").dispatch().await;
        let listed: Vec<ProjectView> = testing::data(response).await;
        assert_eq!(listed.len(), 2);

        let response = client.get("/api/projects?ward_no=4").dispatch().await;
        let listed: Vec<ProjectView> = testing::data(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Anganwadi roof");

        let response = client
            .get("/api/projects?status=In%20Progress")
            .dispatch()
            .await;
        let listed: Vec<ProjectView> = testing::data(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ProjectStatus::InProgress);
    }

    #[backend_test(admin)]
    async fn lifecycle(client: Client) {
        let response = client
            .post(uri!(create_project))
            .header(ContentType::JSON)
            .body(json!({ "name": "Footpath", "ward_no": 2, "estimated_cost": 50000.0 }).to_string())
            .dispatch()
            .await;
        let created: ProjectView = testing::data(response).await;
        assert_eq!(created.status, ProjectStatus::Concept);
        let id = *created.id;

        // Status jumps straight to Completed.
        let response = client
            .put(uri!(set_project_status(id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "Completed" }).to_string())
            .dispatch()
            .await;
        let updated: ProjectView = testing::data(response).await;
        assert_eq!(updated.status, ProjectStatus::Completed);

        // Editing details leaves the status alone.
        let response = client
            .put(uri!(update_project(id)))
            .header(ContentType::JSON)
            .body(json!({ "name": "Footpath, phase 2", "status": "Concept" }).to_string())
            .dispatch()
            .await;
        let updated: ProjectView = testing::data(response).await;
        assert_eq!(updated.name, "Footpath, phase 2");
        assert_eq!(updated.status, ProjectStatus::Completed);
        assert_eq!(updated.ward_no, None);
        assert!(updated.updated_at >= created.updated_at);

        let response = client
            .put(uri!(update_project(id)))
            .header(ContentType::JSON)
            .body(json!({ "name": "Footpath", "estimated_cost": -5.0 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client.delete(uri!(delete_project(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(get_project(id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(viewer)]
    async fn viewers_lack_projects(client: Client) {
        let response = client.get("/api/projects").dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
