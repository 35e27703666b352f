use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use rocket::FromForm;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::{fields, id::ApiId},
        common::ServiceType,
        db::service::{NewService, Service},
        mongodb::Id,
    },
};

#[derive(Debug, Clone, Default, FromForm)]
pub struct ServiceQuery {
    #[field(name = "type")]
    pub service_type: Option<ServiceType>,
    pub category: Option<String>,
}

impl ServiceQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(service_type) = self.service_type {
            filter.insert("type", service_type);
        }
        if let Some(category) = fields::optional(self.category.clone()) {
            filter.insert("category", category);
        }
        filter
    }
}

/// Request body for creating or replacing a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub category: Option<String>,
}

impl ServiceRequest {
    pub fn into_new(self, created_by: Id) -> Result<NewService> {
        Ok(NewService {
            name: fields::required("name", &self.name)?,
            description: fields::optional(self.description),
            service_type: self.service_type,
            category: fields::optional(self.category),
            created_by,
            created_at: Utc::now(),
        })
    }

    /// A `$set` replacing every editable field.
    pub fn to_update(&self) -> Result<Document> {
        Ok(doc! {
            "$set": {
                "name": fields::required("name", &self.name)?,
                "description": fields::optional(self.description.clone()),
                "type": self.service_type,
                "category": fields::optional(self.category.clone()),
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceView {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub category: Option<String>,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Service> for ServiceView {
    fn from(service: Service) -> Self {
        Self {
            id: service.id.into(),
            name: service.service.name,
            description: service.service.description,
            service_type: service.service.service_type,
            category: service.service.category,
            created_by: service.service.created_by.into(),
            created_at: service.service.created_at,
        }
    }
}
