use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::ServiceType,
        db::beneficiary::Beneficiary,
        mongodb::{Coll, Id},
    },
};

/// Core service data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCore {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub category: Option<String>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A service without an ID.
pub type NewService = ServiceCore;

/// A service from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub service: ServiceCore,
}

impl Service {
    pub async fn list(services: &Coll<Service>, filter: Document) -> Result<Vec<Service>> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        Ok(services.find(filter, options).await?.try_collect().await?)
    }

    pub async fn find(services: &Coll<Service>, id: Id) -> Result<Option<Service>> {
        Ok(services.find_one(id.as_doc(), None).await?)
    }

    /// Services that beneficiaries were recorded against are frozen.
    async fn ensure_unreferenced(
        id: Id,
        beneficiaries: &Coll<Beneficiary>,
        session: &mut ClientSession,
    ) -> Result<()> {
        let count = beneficiaries
            .count_documents_with_session(doc! { "service_id": id }, None, session)
            .await?;
        if count > 0 {
            return Err(Error::bad_request(
                "Service has beneficiaries and cannot be changed",
            ));
        }
        Ok(())
    }

    /// Apply `update` if nothing references the service, checking and
    /// writing in one transaction. `None` if there is no such service.
    pub async fn update_unreferenced(
        db_client: &Client,
        services: &Coll<Service>,
        beneficiaries: &Coll<Beneficiary>,
        id: Id,
        update: Document,
    ) -> Result<Option<Service>> {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        Self::ensure_unreferenced(id, beneficiaries, &mut session).await?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let service = services
            .find_one_and_update_with_session(id.as_doc(), update, options, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(service)
    }

    /// Delete the service if nothing references it, in one transaction.
    /// Returns whether it existed.
    pub async fn delete_unreferenced(
        db_client: &Client,
        services: &Coll<Service>,
        beneficiaries: &Coll<Beneficiary>,
        id: Id,
    ) -> Result<bool> {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        Self::ensure_unreferenced(id, beneficiaries, &mut session).await?;
        let result = services
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(result.deleted_count > 0)
    }
}

impl Deref for Service {
    type Target = ServiceCore;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

impl DerefMut for Service {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.service
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ServiceCore {
        pub fn example_one_to_one(created_by: Id) -> Self {
            Self {
                name: "Old Age Pension".to_string(),
                description: Some("Help applying for the state pension".to_string()),
                service_type: ServiceType::OneToOne,
                category: Some("welfare".to_string()),
                created_by,
                created_at: Utc::now(),
            }
        }

        pub fn example_one_to_many(created_by: Id) -> Self {
            Self {
                name: "Road Repair".to_string(),
                description: None,
                service_type: ServiceType::OneToMany,
                category: Some("public_works".to_string()),
                created_by,
                created_at: Utc::now(),
            }
        }
    }
}
