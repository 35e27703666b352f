use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{fields, id::ApiId},
        common::{EpicNumber, Gender, Mobile},
        db::{
            vote_mark::VoteMark,
            voter::{ImportSummary, Voter},
        },
        mongodb::escape_regex,
    },
};

/// Most voters accepted by one import request.
pub const MAX_IMPORT_BATCH: usize = 5000;

/// Search parameters for the voter roll.
#[derive(Debug, Clone, Default)]
pub struct VoterQuery {
    /// Free text matched against name, EPIC number and mobile number.
    pub q: Option<String>,
    pub part_no: Option<u32>,
    pub ward_no: Option<u32>,
    pub booth_no: Option<u32>,
    pub family_id: Option<String>,
}

impl VoterQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(part_no) = self.part_no {
            filter.insert("part_no", i64::from(part_no));
        }
        if let Some(ward_no) = self.ward_no {
            filter.insert("ward_no", i64::from(ward_no));
        }
        if let Some(booth_no) = self.booth_no {
            filter.insert("booth_no", i64::from(booth_no));
        }
        if let Some(family_id) = fields::optional(self.family_id.clone()) {
            filter.insert("family_id", family_id);
        }

        if let Some(q) = fields::optional(self.q.clone()) {
            let mut any: Vec<Bson> = vec![
                doc! { "name": { "$regex": escape_regex(&q), "$options": "i" } }.into(),
                doc! { "_id": { "$regex": format!("^{}", escape_regex(&q.to_ascii_uppercase())) } }
                    .into(),
            ];
            let digits: String = q.chars().filter(char::is_ascii_digit).collect();
            // Too few digits would match most numbers.
            if digits.len() >= 4 {
                any.push(doc! { "mobile_numbers": { "$regex": digits } }.into());
            }
            filter.insert("$or", any);
        }
        filter
    }
}

/// A voter as submitted for creation or import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterRecord {
    pub epic_number: String,
    pub name: String,
    pub relation_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub house_no: Option<String>,
    pub family_id: Option<String>,
    pub part_no: u32,
    pub ward_no: Option<u32>,
    pub booth_no: Option<u32>,
    #[serde(default)]
    pub mobile_numbers: Vec<String>,
}

impl TryFrom<VoterRecord> for Voter {
    type Error = Error;

    fn try_from(record: VoterRecord) -> Result<Self> {
        if record.part_no == 0 {
            return Err(Error::bad_request("part_no must be at least 1"));
        }
        Ok(Self {
            epic_number: fields::epic("epic_number", &record.epic_number)?,
            name: fields::required("name", &record.name)?,
            relation_name: fields::optional(record.relation_name),
            gender: record.gender,
            age: record.age,
            house_no: fields::optional(record.house_no),
            family_id: fields::optional(record.family_id),
            part_no: record.part_no,
            ward_no: record.ward_no,
            booth_no: record.booth_no,
            mobile_numbers: parse_mobiles(&record.mobile_numbers)?,
        })
    }
}

fn parse_mobiles(numbers: &[String]) -> Result<Vec<Mobile>> {
    let mut mobiles: Vec<Mobile> = Vec::with_capacity(numbers.len());
    for number in numbers {
        let mobile = fields::mobile("mobile_numbers", number)?;
        if !mobiles.contains(&mobile) {
            mobiles.push(mobile);
        }
    }
    Ok(mobiles)
}

/// Request body replacing a voter's mobile numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileUpdate {
    pub mobile_numbers: Vec<String>,
}

impl MobileUpdate {
    pub fn parse(&self) -> Result<Vec<Mobile>> {
        parse_mobiles(&self.mobile_numbers)
    }
}

/// Request body for a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterImport {
    pub voters: Vec<VoterRecord>,
}

impl VoterImport {
    /// Validate every record, naming the first bad one by position.
    pub fn parse(self) -> Result<Vec<Voter>> {
        if self.voters.is_empty() {
            return Err(Error::bad_request("voters must not be empty"));
        }
        if self.voters.len() > MAX_IMPORT_BATCH {
            return Err(Error::bad_request(format!(
                "At most {MAX_IMPORT_BATCH} voters per import"
            )));
        }
        self.voters
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                Voter::try_from(record).map_err(|e| Error::bad_request(format!("voters[{i}]: {e}")))
            })
            .collect()
    }
}

pub type ImportView = ImportSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterView {
    pub epic_number: EpicNumber,
    pub name: String,
    pub relation_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub house_no: Option<String>,
    pub family_id: Option<String>,
    pub part_no: u32,
    pub ward_no: Option<u32>,
    pub booth_no: Option<u32>,
    pub mobile_numbers: Vec<Mobile>,
}

impl From<Voter> for VoterView {
    fn from(voter: Voter) -> Self {
        Self {
            epic_number: voter.epic_number,
            name: voter.name,
            relation_name: voter.relation_name,
            gender: voter.gender,
            age: voter.age,
            house_no: voter.house_no,
            family_id: voter.family_id,
            part_no: voter.part_no,
            ward_no: voter.ward_no,
            booth_no: voter.booth_no,
            mobile_numbers: voter.mobile_numbers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMarkView {
    pub epic_number: EpicNumber,
    pub election_id: ApiId,
    pub has_voted: bool,
    pub part_no: u32,
    pub marked_by: ApiId,
    pub marked_at: DateTime<Utc>,
}

impl From<VoteMark> for VoteMarkView {
    fn from(mark: VoteMark) -> Self {
        Self {
            epic_number: mark.epic_number,
            election_id: mark.election_id.into(),
            has_voted: mark.has_voted,
            part_no: mark.part_no,
            marked_by: mark.marked_by.into(),
            marked_at: mark.marked_at,
        }
    }
}

/// A voter with their voting history.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoterDetail {
    #[serde(flatten)]
    pub voter: VoterView,
    pub voting_history: Vec<VoteMarkView>,
}
