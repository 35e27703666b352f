use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::{FindOptions, UpdateOptions},
    Client,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        common::EpicNumber,
        db::voter::Voter,
        mongodb::{Coll, Id},
    },
};

/// Whether one voter voted in one election. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMark {
    pub epic_number: EpicNumber,
    pub election_id: Id,
    pub has_voted: bool,
    /// Copied from the voter so turnout can be counted per part.
    pub part_no: u32,
    pub marked_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub marked_at: DateTime<Utc>,
}

/// A mark to be recorded, before the voter's part is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkInput {
    pub epic_number: EpicNumber,
    pub election_id: Id,
    pub has_voted: bool,
}

/// Voting numbers for an election, optionally within one part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Turnout {
    pub total_voters: u64,
    pub voted: u64,
    pub percentage: f64,
}

impl Turnout {
    pub fn new(total_voters: u64, voted: u64) -> Self {
        let percentage = if total_voters == 0 {
            0.0
        } else {
            // Two decimal places.
            (voted as f64 * 10_000.0 / total_voters as f64).round() / 100.0
        };
        Self {
            total_voters,
            voted,
            percentage,
        }
    }
}

impl VoteMark {
    fn key(epic_number: &EpicNumber, election_id: Id) -> Document {
        doc! { "epic_number": epic_number, "election_id": election_id }
    }

    fn upsert_options() -> UpdateOptions {
        UpdateOptions::builder().upsert(true).build()
    }

    fn update(part_no: u32, has_voted: bool, marked_by: Id, marked_at: DateTime<Utc>) -> Document {
        doc! {
            "$set": {
                "has_voted": has_voted,
                "part_no": i64::from(part_no),
                "marked_by": marked_by,
                "marked_at": marked_at,
            }
        }
    }

    /// Record one mark, replacing any earlier mark for the same pair.
    pub async fn upsert(
        marks: &Coll<VoteMark>,
        voter: &Voter,
        election_id: Id,
        has_voted: bool,
        marked_by: Id,
    ) -> Result<VoteMark> {
        let marked_at = Utc::now();
        marks
            .update_one(
                Self::key(&voter.epic_number, election_id),
                Self::update(voter.part_no, has_voted, marked_by, marked_at),
                Self::upsert_options(),
            )
            .await?;
        Ok(VoteMark {
            epic_number: voter.epic_number.clone(),
            election_id,
            has_voted,
            part_no: voter.part_no,
            marked_by,
            marked_at,
        })
    }

    /// Record many marks in a single transaction, in order, so that a later
    /// entry for the same pair overrides an earlier one. Every voter must
    /// appear in `voters`.
    pub async fn upsert_many(
        db_client: &Client,
        marks: &Coll<VoteMark>,
        inputs: &[MarkInput],
        voters: &[Voter],
        marked_by: Id,
    ) -> Result<usize> {
        let marked_at = Utc::now();
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let mut written = 0;
        for input in inputs {
            let Some(voter) = voters.iter().find(|v| v.epic_number == input.epic_number) else {
                continue;
            };
            marks
                .update_one_with_session(
                    Self::key(&input.epic_number, input.election_id),
                    Self::update(voter.part_no, input.has_voted, marked_by, marked_at),
                    Self::upsert_options(),
                    &mut session,
                )
                .await?;
            written += 1;
        }

        session.commit_transaction().await?;
        Ok(written)
    }

    /// Every mark recorded for a voter, newest first.
    pub async fn history(marks: &Coll<VoteMark>, epic_number: &EpicNumber) -> Result<Vec<VoteMark>> {
        let options = FindOptions::builder()
            .sort(doc! { "marked_at": -1 })
            .build();
        Ok(marks
            .find(doc! { "epic_number": epic_number }, options)
            .await?
            .try_collect()
            .await?)
    }

    /// Count voters and those marked as having voted.
    pub async fn turnout(
        voters: &Coll<Voter>,
        marks: &Coll<VoteMark>,
        election_id: Id,
        part_no: Option<u32>,
    ) -> Result<Turnout> {
        let mut voter_filter = Document::new();
        let mut mark_filter = doc! { "election_id": election_id, "has_voted": true };
        if let Some(part_no) = part_no {
            voter_filter.insert("part_no", i64::from(part_no));
            mark_filter.insert("part_no", i64::from(part_no));
        }
        let total_voters = voters.count_documents(voter_filter, None).await?;
        let voted = marks.count_documents(mark_filter, None).await?;
        Ok(Turnout::new(total_voters, voted))
    }
}
