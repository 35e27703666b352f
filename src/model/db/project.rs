use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        common::ProjectStatus,
        mongodb::{Coll, Id},
    },
};

/// Core project data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCore {
    pub name: String,
    pub description: Option<String>,
    pub ward_no: Option<u32>,
    pub project_type: Option<String>,
    pub status: ProjectStatus,
    /// Person or department responsible.
    pub owner: Option<String>,
    pub estimated_cost: Option<f64>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A project without an ID.
pub type NewProject = ProjectCore;

/// A project from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub project: ProjectCore,
}

impl Project {
    pub async fn insert(projects: &Coll<NewProject>, project: NewProject) -> Result<Project> {
        let result = projects.insert_one(&project, None).await?;
        Ok(Project {
            id: Id::inserted(&result)?,
            project,
        })
    }

    pub async fn find(projects: &Coll<Project>, id: Id) -> Result<Option<Project>> {
        Ok(projects.find_one(id.as_doc(), None).await?)
    }

    /// Matching projects, most recently updated first.
    pub async fn list(projects: &Coll<Project>, filter: Document) -> Result<Vec<Project>> {
        let options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .build();
        Ok(projects.find(filter, options).await?.try_collect().await?)
    }

    /// Apply a `$set` of fields, bumping `updated_at`. Returns the updated
    /// project, or `None` if there is no such project.
    pub async fn update(
        projects: &Coll<Project>,
        id: Id,
        mut set: Document,
    ) -> Result<Option<Project>> {
        set.insert("updated_at", Utc::now());
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(projects
            .find_one_and_update(id.as_doc(), doc! { "$set": set }, options)
            .await?)
    }

    pub async fn count_by_status(projects: &Coll<Project>) -> Result<Vec<(ProjectStatus, u64)>> {
        let mut counts = Vec::with_capacity(ProjectStatus::ALL.len());
        for status in ProjectStatus::ALL {
            let count = projects
                .count_documents(doc! { "status": status }, None)
                .await?;
            counts.push((status, count));
        }
        Ok(counts)
    }
}

impl Deref for Project {
    type Target = ProjectCore;

    fn deref(&self) -> &Self::Target {
        &self.project
    }
}

impl DerefMut for Project {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.project
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ProjectCore {
        pub fn example(created_by: Id) -> Self {
            let now = Utc::now();
            Self {
                name: "Storm drain, Temple Street".to_string(),
                description: Some("Covered drain along the east side".to_string()),
                ward_no: Some(3),
                project_type: Some("drainage".to_string()),
                status: ProjectStatus::Proposal,
                owner: Some("Public Works Department".to_string()),
                estimated_cost: Some(1_250_000.0),
                created_by,
                created_at: now,
                updated_at: now,
            }
        }

        pub fn example2(created_by: Id) -> Self {
            let now = Utc::now();
            Self {
                name: "Anganwadi roof".to_string(),
                description: None,
                ward_no: Some(4),
                project_type: Some("building".to_string()),
                status: ProjectStatus::InProgress,
                owner: None,
                estimated_cost: None,
                created_by,
                created_at: now,
                updated_at: now,
            }
        }
    }
}
