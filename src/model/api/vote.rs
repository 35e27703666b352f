use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{api::fields, db::vote_mark::MarkInput},
};

/// Most marks accepted by one bulk request.
pub const MAX_BULK_MARKS: usize = 1000;

/// One vote mark as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkRequest {
    pub epic_number: String,
    pub election_id: String,
    pub has_voted: bool,
}

impl MarkRequest {
    pub fn parse(&self) -> Result<MarkInput> {
        Ok(MarkInput {
            epic_number: fields::epic("epic_number", &self.epic_number)?,
            election_id: fields::id("election_id", &self.election_id)?,
            has_voted: self.has_voted,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMarkRequest {
    pub marks: Vec<MarkRequest>,
}

impl BulkMarkRequest {
    /// Check the batch size and parse every entry, naming the first bad one
    /// by position.
    pub fn parse(&self) -> Result<Vec<MarkInput>> {
        if self.marks.is_empty() {
            return Err(Error::bad_request("marks must not be empty"));
        }
        if self.marks.len() > MAX_BULK_MARKS {
            return Err(Error::bad_request(format!(
                "At most {MAX_BULK_MARKS} marks per request"
            )));
        }
        self.marks
            .iter()
            .enumerate()
            .map(|(i, mark)| {
                mark.parse()
                    .map_err(|e| Error::bad_request(format!("marks[{i}]: {e}")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMarkResult {
    pub marked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{common::EpicNumber, mongodb::Id};

    fn mark(epic_number: &str) -> MarkRequest {
        MarkRequest {
            epic_number: epic_number.to_string(),
            election_id: Id::new().to_string(),
            has_voted: true,
        }
    }

    #[test]
    fn parses_marks() {
        let request = BulkMarkRequest {
            marks: vec![mark("abc1234567"), mark("XYZ7654321")],
        };
        let marks = request.parse().unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].epic_number, EpicNumber::example());
    }

    #[test]
    fn batch_bounds() {
        assert!(BulkMarkRequest { marks: vec![] }.parse().is_err());
        let request = BulkMarkRequest {
            marks: vec![mark("ABC1234567"); MAX_BULK_MARKS + 1],
        };
        assert!(request.parse().is_err());
        let request = BulkMarkRequest {
            marks: vec![mark("ABC1234567"); MAX_BULK_MARKS],
        };
        assert!(request.parse().is_ok());
    }

    #[test]
    fn bad_entry_is_named() {
        let mut bad = mark("ABC1234567");
        bad.election_id = "zzz".to_string();
        let request = BulkMarkRequest {
            marks: vec![mark("ABC1234567"), bad],
        };
        let err = request.parse().unwrap_err();
        assert!(err.to_string().starts_with("marks[1]: election_id"));
    }
}
