use mongodb::{
    bson::{doc, Document},
    options::{FindOptions, InsertManyOptions},
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::pagination::PaginationRequest,
        common::{EpicNumber, Gender, Mobile},
        mongodb::{duplicate_insert_count, Coll},
    },
};

/// A voter-roll entry, keyed by EPIC number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub epic_number: EpicNumber,
    pub name: String,
    /// Father's or husband's name, as printed on the roll.
    pub relation_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub house_no: Option<String>,
    pub family_id: Option<String>,
    pub part_no: u32,
    pub ward_no: Option<u32>,
    pub booth_no: Option<u32>,
    #[serde(default)]
    pub mobile_numbers: Vec<Mobile>,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

impl Voter {
    pub fn filter(epic_number: &EpicNumber) -> Document {
        doc! { "_id": epic_number }
    }

    pub async fn find(voters: &Coll<Voter>, epic_number: &EpicNumber) -> Result<Option<Voter>> {
        Ok(voters.find_one(Self::filter(epic_number), None).await?)
    }

    /// One page of voters matching `filter`, ordered by part then name, and
    /// the total number of matches.
    pub async fn search(
        voters: &Coll<Voter>,
        filter: Document,
        pagination: PaginationRequest,
    ) -> Result<(Vec<Voter>, u64)> {
        let options = FindOptions::builder()
            .sort(doc! { "part_no": 1, "name": 1 })
            .skip(pagination.skip())
            .limit(i64::from(pagination.page_size()))
            .build();
        let page = voters
            .find(filter.clone(), options)
            .await?
            .try_collect()
            .await?;
        let total = voters.count_documents(filter, None).await?;
        Ok((page, total))
    }

    /// Everyone in this voter's family: the same family ID if one is
    /// recorded, otherwise the same house in the same part.
    pub async fn family(&self, voters: &Coll<Voter>) -> Result<Vec<Voter>> {
        let filter = match (&self.family_id, &self.house_no) {
            (Some(family_id), _) => doc! { "family_id": family_id },
            (None, Some(house_no)) => doc! { "part_no": i64::from(self.part_no), "house_no": house_no },
            (None, None) => return Ok(vec![self.clone()]),
        };
        let options = FindOptions::builder().sort(doc! { "age": -1 }).build();
        Ok(voters.find(filter, options).await?.try_collect().await?)
    }

    /// Replace the voter's mobile numbers. Returns false if there is no such voter.
    pub async fn set_mobile_numbers(
        voters: &Coll<Voter>,
        epic_number: &EpicNumber,
        mobile_numbers: Vec<Mobile>,
    ) -> Result<bool> {
        let update = doc! {
            "$set": { "mobile_numbers": mobile_numbers },
        };
        let result = voters
            .update_one(Self::filter(epic_number), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    /// Insert many voters, skipping any whose EPIC number already exists.
    pub async fn import(voters: &Coll<Voter>, batch: Vec<Voter>) -> Result<ImportSummary> {
        if batch.is_empty() {
            return Ok(ImportSummary {
                inserted: 0,
                duplicates: 0,
            });
        }
        let total = batch.len();
        let options = InsertManyOptions::builder().ordered(false).build();
        match voters.insert_many(batch, options).await {
            Ok(result) => Ok(ImportSummary {
                inserted: result.inserted_ids.len(),
                duplicates: 0,
            }),
            Err(e) => match duplicate_insert_count(&e) {
                Some(duplicates) => Ok(ImportSummary {
                    inserted: total - duplicates,
                    duplicates,
                }),
                None => Err(e.into()),
            },
        }
    }

    /// The voters with any of the given EPIC numbers.
    pub async fn find_many(voters: &Coll<Voter>, epic_numbers: &[EpicNumber]) -> Result<Vec<Voter>> {
        Ok(voters
            .find(doc! { "_id": { "$in": epic_numbers } }, None)
            .await?
            .try_collect()
            .await?)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Voter {
        pub fn example() -> Self {
            Self {
                epic_number: EpicNumber::example(),
                name: "Lakshmi Narayanan".to_string(),
                relation_name: Some("Narayanan K".to_string()),
                gender: Some(Gender::Female),
                age: Some(42),
                house_no: Some("12/4".to_string()),
                family_id: Some("F-0012".to_string()),
                part_no: 12,
                ward_no: Some(3),
                booth_no: Some(7),
                mobile_numbers: vec![Mobile::example()],
            }
        }

        pub fn example2() -> Self {
            Self {
                epic_number: EpicNumber::example2(),
                name: "Karthik Narayanan".to_string(),
                relation_name: Some("Narayanan K".to_string()),
                gender: Some(Gender::Male),
                age: Some(19),
                house_no: Some("12/4".to_string()),
                family_id: Some("F-0012".to_string()),
                part_no: 12,
                ward_no: Some(3),
                booth_no: Some(7),
                mobile_numbers: vec![],
            }
        }

        pub fn example3() -> Self {
            Self {
                epic_number: EpicNumber::example3(),
                name: "Fathima Beevi".to_string(),
                relation_name: None,
                gender: Some(Gender::Female),
                age: Some(67),
                house_no: Some("3".to_string()),
                family_id: None,
                part_no: 14,
                ward_no: Some(4),
                booth_no: Some(9),
                mobile_numbers: vec![Mobile::example2()],
            }
        }
    }
}
