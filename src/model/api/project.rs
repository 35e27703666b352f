use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{fields, id::ApiId},
        common::ProjectStatus,
        db::project::{NewProject, Project},
        mongodb::Id,
    },
};

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub ward_no: Option<u32>,
    pub status: Option<ProjectStatus>,
}

impl ProjectQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(ward_no) = self.ward_no {
            filter.insert("ward_no", i64::from(ward_no));
        }
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        filter
    }
}

/// Request body for creating a project or editing its details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub ward_no: Option<u32>,
    pub project_type: Option<String>,
    /// Defaults to `Concept` for new projects; ignored on edit.
    pub status: Option<ProjectStatus>,
    pub owner: Option<String>,
    pub estimated_cost: Option<f64>,
}

fn check_cost(cost: Option<f64>) -> Result<()> {
    match cost {
        Some(cost) if !cost.is_finite() || cost < 0.0 => Err(Error::bad_request(
            "estimated_cost must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

impl ProjectRequest {
    pub fn into_new(self, created_by: Id) -> Result<NewProject> {
        check_cost(self.estimated_cost)?;
        let now = Utc::now();
        Ok(NewProject {
            name: fields::required("name", &self.name)?,
            description: fields::optional(self.description),
            ward_no: self.ward_no,
            project_type: fields::optional(self.project_type),
            status: self.status.unwrap_or(ProjectStatus::Concept),
            owner: fields::optional(self.owner),
            estimated_cost: self.estimated_cost,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// The fields to `$set` when editing. Status has its own endpoint.
    pub fn to_set(&self) -> Result<Document> {
        check_cost(self.estimated_cost)?;
        let mut set = Document::new();
        set.insert("name", fields::required("name", &self.name)?);
        set.insert("description", fields::optional(self.description.clone()));
        set.insert("ward_no", self.ward_no.map(i64::from));
        set.insert("project_type", fields::optional(self.project_type.clone()));
        set.insert("owner", fields::optional(self.owner.clone()));
        set.insert("estimated_cost", self.estimated_cost);
        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectStatusUpdate {
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub ward_no: Option<u32>,
    pub project_type: Option<String>,
    pub status: ProjectStatus,
    pub owner: Option<String>,
    pub estimated_cost: Option<f64>,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        let core = project.project;
        Self {
            id: project.id.into(),
            name: core.name,
            description: core.description,
            ward_no: core.ward_no,
            project_type: core.project_type,
            status: core.status,
            owner: core.owner,
            estimated_cost: core.estimated_cost,
            created_by: core.created_by.into(),
            created_at: core.created_at,
            updated_at: core.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_projects_start_as_concepts() {
        let request = ProjectRequest {
            name: "Footpath".to_string(),
            ..Default::default()
        };
        let project = request.into_new(Id::new()).unwrap();
        assert_eq!(project.status, ProjectStatus::Concept);
    }

    #[test]
    fn cost_must_be_sensible() {
        let request = ProjectRequest {
            name: "Footpath".to_string(),
            estimated_cost: Some(-1.0),
            ..Default::default()
        };
        assert!(request.to_set().is_err());
        assert!(request.into_new(Id::new()).is_err());
    }

    #[test]
    fn edit_does_not_touch_status() {
        let request = ProjectRequest {
            name: "Footpath".to_string(),
            status: Some(ProjectStatus::Completed),
            ward_no: Some(2),
            ..Default::default()
        };
        let set = request.to_set().unwrap();
        assert!(!set.contains_key("status"));
        assert_eq!(set.get_i64("ward_no").unwrap(), 2);
    }
}
