use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Implement `From<$ty> for Bson` so the enum can be used directly in `doc!`.
macro_rules! bson_enum {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Bson {
                fn from(value: $ty) -> Self {
                    to_bson(&value).expect("Serialisation is infallible")
                }
            }
        )+
    };
}

/// Whether a service is delivered to one voter or to every voter of a part.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
pub enum ServiceType {
    #[serde(rename = "one-to-one")]
    #[field(value = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    #[field(value = "one-to-many")]
    OneToMany,
}

/// Progress of a service request.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, FromFormField,
)]
#[serde(rename_all = "snake_case")]
pub enum BeneficiaryStatus {
    #[field(value = "pending")]
    Pending,
    #[field(value = "in_progress")]
    InProgress,
    #[field(value = "completed")]
    Completed,
    #[field(value = "rejected")]
    Rejected,
}

impl BeneficiaryStatus {
    pub const ALL: [BeneficiaryStatus; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle of a public-works project.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, FromFormField,
)]
pub enum ProjectStatus {
    #[field(value = "Concept")]
    Concept,
    #[field(value = "Proposal")]
    Proposal,
    #[serde(rename = "In Progress")]
    #[field(value = "In Progress")]
    InProgress,
    #[field(value = "Completed")]
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        Self::Concept,
        Self::Proposal,
        Self::InProgress,
        Self::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Concept => "Concept",
            Self::Proposal => "Proposal",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

bson_enum!(ServiceType, BeneficiaryStatus, Priority, ProjectStatus);

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::serde::json::serde_json;

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_string(&ServiceType::OneToMany).unwrap(),
            "\"one-to-many\""
        );
        assert_eq!(
            serde_json::to_string(&BeneficiaryStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(Bson::from(Priority::High), Bson::String("high".into()));
    }

    #[test]
    fn labels_match_wire_names() {
        for status in ProjectStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));
        }
    }
}
