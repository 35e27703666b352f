//! Read-only reference data: elections, booths and parts.

use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::mongodb::{Coll, Id},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub year: i32,
    /// e.g. "assembly", "parliament", "local body".
    pub election_type: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booth {
    #[serde(rename = "_id")]
    pub id: Id,
    pub booth_no: u32,
    pub name: String,
    pub part_no: u32,
    pub ward_no: Option<u32>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "_id")]
    pub part_no: u32,
    pub name: Option<String>,
    pub ward_no: Option<u32>,
}

impl Election {
    /// All elections, most recent first.
    pub async fn all(elections: &Coll<Election>) -> Result<Vec<Election>> {
        let options = FindOptions::builder()
            .sort(doc! { "year": -1, "name": 1 })
            .build();
        Ok(elections.find(None, options).await?.try_collect().await?)
    }

    pub async fn find(elections: &Coll<Election>, id: Id) -> Result<Option<Election>> {
        Ok(elections.find_one(id.as_doc(), None).await?)
    }

    /// Which of the given IDs have no election.
    pub async fn missing(elections: &Coll<Election>, ids: &[Id]) -> Result<Vec<Id>> {
        let found: Vec<Election> = elections
            .find(doc! { "_id": { "$in": ids } }, None)
            .await?
            .try_collect()
            .await?;
        let mut missing: Vec<Id> = ids
            .iter()
            .filter(|id| !found.iter().any(|e| e.id == **id))
            .copied()
            .collect();
        missing.sort();
        missing.dedup();
        Ok(missing)
    }
}

impl Booth {
    pub async fn list(
        booths: &Coll<Booth>,
        ward_no: Option<u32>,
        part_no: Option<u32>,
    ) -> Result<Vec<Booth>> {
        let mut filter = Document::new();
        if let Some(ward_no) = ward_no {
            filter.insert("ward_no", i64::from(ward_no));
        }
        if let Some(part_no) = part_no {
            filter.insert("part_no", i64::from(part_no));
        }
        let options = FindOptions::builder().sort(doc! { "booth_no": 1 }).build();
        Ok(booths.find(filter, options).await?.try_collect().await?)
    }
}

impl Part {
    pub async fn list(parts: &Coll<Part>, ward_no: Option<u32>) -> Result<Vec<Part>> {
        let filter = ward_no.map(|ward_no| doc! { "ward_no": i64::from(ward_no) });
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(parts.find(filter, options).await?.try_collect().await?)
    }

    /// Of the given part numbers, those that do not exist, in ascending order.
    pub async fn missing(parts: &Coll<Part>, part_numbers: &[u32]) -> Result<Vec<u32>> {
        let wanted: Vec<i64> = part_numbers.iter().copied().map(i64::from).collect();
        let found: Vec<Part> = parts
            .find(doc! { "_id": { "$in": wanted } }, None)
            .await?
            .try_collect()
            .await?;
        let mut missing: Vec<u32> = part_numbers
            .iter()
            .copied()
            .filter(|no| !found.iter().any(|p| p.part_no == *no))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        Ok(missing)
    }
}
