use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::pagination::PaginationRequest,
        common::{EpicNumber, Mobile},
        mongodb::{Coll, Id},
    },
};

/// Core visitor data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorCore {
    pub name: String,
    pub contact_no: Mobile,
    pub purpose: String,
    /// Stored as `YYYY-MM-DD`, so string order is date order.
    pub visit_date: NaiveDate,
    /// The programme item during which the visit happened.
    pub programme_id: Option<Id>,
    pub voter_id: Option<EpicNumber>,
    pub notes: Option<String>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A visitor without an ID.
pub type NewVisitor = VisitorCore;

/// A visitor from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub visitor: VisitorCore,
}

impl Visitor {
    pub fn date_filter(date: NaiveDate) -> Document {
        doc! { "visit_date": date.to_string() }
    }

    pub async fn insert(visitors: &Coll<NewVisitor>, visitor: NewVisitor) -> Result<Visitor> {
        let result = visitors.insert_one(&visitor, None).await?;
        Ok(Visitor {
            id: Id::inserted(&result)?,
            visitor,
        })
    }

    /// One page of visits, newest first, and the total number of matches.
    pub async fn list(
        visitors: &Coll<Visitor>,
        filter: Document,
        pagination: PaginationRequest,
    ) -> Result<(Vec<Visitor>, u64)> {
        let options = FindOptions::builder()
            .sort(doc! { "visit_date": -1, "created_at": -1 })
            .skip(pagination.skip())
            .limit(i64::from(pagination.page_size()))
            .build();
        let page = visitors
            .find(filter.clone(), options)
            .await?
            .try_collect()
            .await?;
        let total = visitors.count_documents(filter, None).await?;
        Ok((page, total))
    }

    /// Every visit from the given number, newest first.
    pub async fn by_contact(visitors: &Coll<Visitor>, contact_no: &Mobile) -> Result<Vec<Visitor>> {
        let options = FindOptions::builder()
            .sort(doc! { "visit_date": -1, "created_at": -1 })
            .build();
        Ok(visitors
            .find(doc! { "contact_no": contact_no.to_string() }, options)
            .await?
            .try_collect()
            .await?)
    }
}

impl Deref for Visitor {
    type Target = VisitorCore;

    fn deref(&self) -> &Self::Target {
        &self.visitor
    }
}

impl DerefMut for Visitor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.visitor
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VisitorCore {
        pub fn example(visit_date: NaiveDate, created_by: Id) -> Self {
            Self {
                name: "Selvi Raman".to_string(),
                contact_no: Mobile::example(),
                purpose: "Ration card correction".to_string(),
                visit_date,
                programme_id: None,
                voter_id: Some(EpicNumber::example()),
                notes: None,
                created_by,
                created_at: Utc::now(),
            }
        }
    }
}
