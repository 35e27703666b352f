use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::pagination::PaginationRequest,
        common::{BeneficiaryStatus, EpicNumber, Priority},
        mongodb::{Coll, Id},
    },
};

/// Who receives a service: one voter, or every voter of one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Target {
    Voter { voter_id: EpicNumber },
    Part { part_no: u32 },
}

/// Core beneficiary data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryCore {
    pub service_id: Id,
    #[serde(flatten)]
    pub target: Target,
    pub description: String,
    pub priority: Priority,
    pub status: BeneficiaryStatus,
    pub notes: Option<String>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Set while the status is `completed`.
    pub completed_at: Option<bson::DateTime>,
}

/// A beneficiary without an ID.
pub type NewBeneficiary = BeneficiaryCore;

/// A beneficiary from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub beneficiary: BeneficiaryCore,
}

impl BeneficiaryCore {
    /// A fresh, pending request.
    pub fn new(
        service_id: Id,
        target: Target,
        description: String,
        priority: Priority,
        notes: Option<String>,
        created_by: Id,
    ) -> Self {
        let now = Utc::now();
        Self {
            service_id,
            target,
            description,
            priority,
            status: BeneficiaryStatus::Pending,
            notes,
            created_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

impl Beneficiary {
    pub async fn insert(
        beneficiaries: &Coll<NewBeneficiary>,
        beneficiary: NewBeneficiary,
    ) -> Result<Beneficiary> {
        let result = beneficiaries.insert_one(&beneficiary, None).await?;
        Ok(Beneficiary {
            id: Id::inserted(&result)?,
            beneficiary,
        })
    }

    /// Insert every row in one transaction: either all are created or none.
    pub async fn insert_all(
        db_client: &Client,
        beneficiaries: &Coll<NewBeneficiary>,
        batch: Vec<NewBeneficiary>,
    ) -> Result<Vec<Beneficiary>> {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let mut created = Vec::with_capacity(batch.len());
        for beneficiary in batch {
            let result = beneficiaries
                .insert_one_with_session(&beneficiary, None, &mut session)
                .await?;
            created.push(Beneficiary {
                id: Id::inserted(&result)?,
                beneficiary,
            });
        }

        session.commit_transaction().await?;
        Ok(created)
    }

    pub async fn find(beneficiaries: &Coll<Beneficiary>, id: Id) -> Result<Option<Beneficiary>> {
        Ok(beneficiaries.find_one(id.as_doc(), None).await?)
    }

    /// One page of matches, newest first, and the total number of matches.
    pub async fn list(
        beneficiaries: &Coll<Beneficiary>,
        filter: Document,
        pagination: PaginationRequest,
    ) -> Result<(Vec<Beneficiary>, u64)> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(pagination.skip())
            .limit(i64::from(pagination.page_size()))
            .build();
        let page = beneficiaries
            .find(filter.clone(), options)
            .await?
            .try_collect()
            .await?;
        let total = beneficiaries.count_documents(filter, None).await?;
        Ok((page, total))
    }

    /// Move to a new status, replacing the notes if given. Returns the updated
    /// beneficiary, or `None` if there is no such beneficiary.
    pub async fn set_status(
        beneficiaries: &Coll<Beneficiary>,
        id: Id,
        status: BeneficiaryStatus,
        notes: Option<String>,
    ) -> Result<Option<Beneficiary>> {
        let now = Utc::now();
        let mut set = doc! { "status": status, "updated_at": now };
        if let Some(notes) = notes {
            set.insert("notes", notes);
        }
        let mut update = Document::new();
        if status == BeneficiaryStatus::Completed {
            set.insert("completed_at", bson::DateTime::from_chrono(now));
        } else {
            update.insert("$unset", doc! { "completed_at": "" });
        }
        update.insert("$set", set);

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(beneficiaries
            .find_one_and_update(id.as_doc(), update, options)
            .await?)
    }

    /// Number of beneficiaries in each status, in status order.
    pub async fn count_by_status(
        beneficiaries: &Coll<Beneficiary>,
        filter: Document,
    ) -> Result<Vec<(BeneficiaryStatus, u64)>> {
        let mut counts = Vec::with_capacity(BeneficiaryStatus::ALL.len());
        for status in BeneficiaryStatus::ALL {
            let mut filter = filter.clone();
            filter.insert("status", status);
            counts.push((status, beneficiaries.count_documents(filter, None).await?));
        }
        Ok(counts)
    }
}

impl Deref for Beneficiary {
    type Target = BeneficiaryCore;

    fn deref(&self) -> &Self::Target {
        &self.beneficiary
    }
}

impl DerefMut for Beneficiary {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.beneficiary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_stored_tagged() {
        let core = BeneficiaryCore::new(
            Id::new(),
            Target::Part { part_no: 12 },
            "Streetlights".to_string(),
            Priority::default(),
            None,
            Id::new(),
        );
        let doc = bson::to_document(&core).unwrap();
        assert_eq!(doc.get_str("target").unwrap(), "part");
        assert!(doc.contains_key("part_no"));
        assert!(!doc.contains_key("voter_id"));
        assert_eq!(doc.get_str("priority").unwrap(), "medium");
        assert_eq!(doc.get_str("status").unwrap(), "pending");

        let back: BeneficiaryCore = bson::from_document(doc).unwrap();
        assert_eq!(back.target, Target::Part { part_no: 12 });
    }
}
