use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::mongodb::{Coll, Id},
};

/// Core programme item data, as stored in the database.
///
/// Dates and times are stored as `YYYY-MM-DD` and `HH:MM:SS` strings, which
/// sort in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeItemCore {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A programme item without an ID.
pub type NewProgrammeItem = ProgrammeItemCore;

/// A programme item from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeItem {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub item: ProgrammeItemCore,
}

impl ProgrammeItem {
    /// Items from `from` to `to` inclusive.
    pub fn range_filter(from: NaiveDate, to: NaiveDate) -> Document {
        doc! { "date": { "$gte": from.to_string(), "$lte": to.to_string() } }
    }

    pub async fn insert(
        programme: &Coll<NewProgrammeItem>,
        item: NewProgrammeItem,
    ) -> Result<ProgrammeItem> {
        let result = programme.insert_one(&item, None).await?;
        Ok(ProgrammeItem {
            id: Id::inserted(&result)?,
            item,
        })
    }

    pub async fn find(programme: &Coll<ProgrammeItem>, id: Id) -> Result<Option<ProgrammeItem>> {
        Ok(programme.find_one(id.as_doc(), None).await?)
    }

    /// Items in chronological order.
    pub async fn list(programme: &Coll<ProgrammeItem>, filter: Document) -> Result<Vec<ProgrammeItem>> {
        let options = FindOptions::builder()
            .sort(doc! { "date": 1, "start_time": 1 })
            .build();
        Ok(programme.find(filter, options).await?.try_collect().await?)
    }

    pub async fn for_date(
        programme: &Coll<ProgrammeItem>,
        date: NaiveDate,
    ) -> Result<Vec<ProgrammeItem>> {
        Self::list(programme, Self::range_filter(date, date)).await
    }
}

impl Deref for ProgrammeItem {
    type Target = ProgrammeItemCore;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl DerefMut for ProgrammeItem {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}
