use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{fields, id::ApiId},
        common::{BeneficiaryStatus, EpicNumber, Priority, ServiceType},
        db::beneficiary::{Beneficiary, Target},
        mongodb::Id,
    },
};

/// Request body for recording that a service is wanted. Exactly one of
/// `voter_id` and `part_numbers` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBeneficiaryRequest {
    pub service_id: String,
    pub voter_id: Option<String>,
    pub part_numbers: Option<Vec<u32>>,
    pub description: String,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

/// Who a new request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    Voter(EpicNumber),
    Parts(Vec<u32>),
}

/// A validated [`NewBeneficiaryRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryInput {
    pub service_id: Id,
    pub recipients: Recipients,
    pub description: String,
    pub priority: Priority,
    pub notes: Option<String>,
}

impl BeneficiaryInput {
    /// Check the service type matches the recipients.
    pub fn check_service_type(&self, service_type: ServiceType) -> Result<()> {
        match (service_type, &self.recipients) {
            (ServiceType::OneToOne, Recipients::Parts(_)) => Err(Error::bad_request(
                "A one-to-one service must be requested for a voter_id",
            )),
            (ServiceType::OneToMany, Recipients::Voter(_)) => Err(Error::bad_request(
                "A one-to-many service must be requested for part_numbers",
            )),
            _ => Ok(()),
        }
    }
}

impl TryFrom<NewBeneficiaryRequest> for BeneficiaryInput {
    type Error = Error;

    fn try_from(request: NewBeneficiaryRequest) -> Result<Self> {
        let recipients = match (request.voter_id, request.part_numbers) {
            (Some(_), Some(_)) => {
                return Err(Error::bad_request(
                    "Give either voter_id or part_numbers, not both",
                ))
            }
            (None, None) => {
                return Err(Error::bad_request(
                    "One of voter_id or part_numbers is required",
                ))
            }
            (Some(voter_id), None) => Recipients::Voter(fields::epic("voter_id", &voter_id)?),
            (None, Some(part_numbers)) => {
                if part_numbers.is_empty() {
                    return Err(Error::bad_request("part_numbers must not be empty"));
                }
                let mut seen = Vec::with_capacity(part_numbers.len());
                for part_no in &part_numbers {
                    if seen.contains(part_no) {
                        return Err(Error::bad_request(format!(
                            "Part number {part_no} is listed more than once"
                        )));
                    }
                    seen.push(*part_no);
                }
                Recipients::Parts(part_numbers)
            }
        };
        Ok(Self {
            service_id: fields::id("service_id", &request.service_id)?,
            recipients,
            description: fields::required("description", &request.description)?,
            priority: request.priority.unwrap_or_default(),
            notes: fields::optional(request.notes),
        })
    }
}

/// Request body for moving a beneficiary to a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: BeneficiaryStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BeneficiaryQuery {
    pub service_id: Option<String>,
    pub status: Option<BeneficiaryStatus>,
    pub voter_id: Option<String>,
    pub part_no: Option<u32>,
}

impl BeneficiaryQuery {
    pub fn to_filter(&self) -> Result<Document> {
        let mut filter = Document::new();
        if let Some(service_id) = &self.service_id {
            filter.insert("service_id", fields::id("service_id", service_id)?);
        }
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(voter_id) = &self.voter_id {
            filter.insert("voter_id", fields::epic("voter_id", voter_id)?);
        }
        if let Some(part_no) = self.part_no {
            filter.insert("part_no", i64::from(part_no));
        }
        Ok(filter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryView {
    pub id: ApiId,
    pub service_id: ApiId,
    #[serde(flatten)]
    pub target: Target,
    pub description: String,
    pub priority: Priority,
    pub status: BeneficiaryStatus,
    pub notes: Option<String>,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Beneficiary> for BeneficiaryView {
    fn from(beneficiary: Beneficiary) -> Self {
        let core = beneficiary.beneficiary;
        Self {
            id: beneficiary.id.into(),
            service_id: core.service_id.into(),
            target: core.target,
            description: core.description,
            priority: core.priority,
            status: core.status,
            notes: core.notes,
            created_by: core.created_by.into(),
            created_at: core.created_at,
            updated_at: core.updated_at,
            completed_at: core.completed_at.map(|at| at.to_chrono()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewBeneficiaryRequest {
        NewBeneficiaryRequest {
            service_id: Id::new().to_string(),
            description: "Pension application".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn exactly_one_recipient() {
        assert!(BeneficiaryInput::try_from(request()).is_err());

        let both = NewBeneficiaryRequest {
            voter_id: Some("ABC1234567".to_string()),
            part_numbers: Some(vec![1]),
            ..request()
        };
        assert!(BeneficiaryInput::try_from(both).is_err());

        let voter = NewBeneficiaryRequest {
            voter_id: Some("abc1234567".to_string()),
            ..request()
        };
        let input = BeneficiaryInput::try_from(voter).unwrap();
        assert_eq!(input.recipients, Recipients::Voter(EpicNumber::example()));
        assert_eq!(input.priority, Priority::Medium);
    }

    #[test]
    fn part_numbers_must_be_distinct_and_present() {
        let empty = NewBeneficiaryRequest {
            part_numbers: Some(vec![]),
            ..request()
        };
        assert!(BeneficiaryInput::try_from(empty).is_err());

        let repeated = NewBeneficiaryRequest {
            part_numbers: Some(vec![3, 4, 3]),
            ..request()
        };
        assert!(BeneficiaryInput::try_from(repeated).is_err());

        let parts = NewBeneficiaryRequest {
            part_numbers: Some(vec![3, 4]),
            priority: Some(Priority::High),
            ..request()
        };
        let input = BeneficiaryInput::try_from(parts).unwrap();
        assert_eq!(input.recipients, Recipients::Parts(vec![3, 4]));
        assert_eq!(input.priority, Priority::High);
    }

    #[test]
    fn service_type_must_match() {
        let input = BeneficiaryInput::try_from(NewBeneficiaryRequest {
            part_numbers: Some(vec![3]),
            ..request()
        })
        .unwrap();
        assert!(input.check_service_type(ServiceType::OneToMany).is_ok());
        assert!(input.check_service_type(ServiceType::OneToOne).is_err());
    }

    #[test]
    fn query_filter() {
        let query = BeneficiaryQuery {
            status: Some(BeneficiaryStatus::Pending),
            part_no: Some(4),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.get_str("status").unwrap(), "pending");
        assert_eq!(filter.get_i64("part_no").unwrap(), 4);

        let bad = BeneficiaryQuery {
            service_id: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(bad.to_filter().is_err());
    }
}
