use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::Bson;
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_EPIC_LENGTH: usize = 20;

/// An Elector Photo Identity Card number: the voter's unique identifier.
///
/// Normalised to uppercase with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EpicNumber(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpicError {
    #[error("EPIC number must not be empty")]
    Empty,
    #[error("EPIC number must be at most {MAX_EPIC_LENGTH} characters")]
    TooLong,
    #[error("EPIC number may only contain letters, digits and '/': {0}")]
    InvalidCharacter(String),
}

impl FromStr for EpicNumber {
    type Err = EpicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase();
        if normalised.is_empty() {
            return Err(EpicError::Empty);
        }
        if normalised.len() > MAX_EPIC_LENGTH {
            return Err(EpicError::TooLong);
        }
        if !normalised
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/')
        {
            return Err(EpicError::InvalidCharacter(normalised));
        }
        Ok(Self(normalised))
    }
}

impl TryFrom<String> for EpicNumber {
    type Error = EpicError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EpicNumber> for String {
    fn from(epic: EpicNumber) -> Self {
        epic.0
    }
}

impl From<EpicNumber> for Bson {
    fn from(epic: EpicNumber) -> Self {
        Bson::String(epic.0)
    }
}

impl Deref for EpicNumber {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for EpicNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> FromParam<'a> for EpicNumber {
    type Error = EpicError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

impl UriDisplay<Path> for EpicNumber {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(&self.0)
    }
}

impl_from_uri_param_identity!([Path] EpicNumber);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case_and_whitespace() {
        let epic: EpicNumber = "  abc1234567 ".parse().unwrap();
        assert_eq!(&*epic, "ABC1234567");
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!("   ".parse::<EpicNumber>(), Err(EpicError::Empty));
        assert_eq!(
            "A".repeat(MAX_EPIC_LENGTH + 1).parse::<EpicNumber>(),
            Err(EpicError::TooLong)
        );
        assert!(matches!(
            "ABC-123".parse::<EpicNumber>(),
            Err(EpicError::InvalidCharacter(_))
        ));
        assert!("TN/01/001/123456".parse::<EpicNumber>().is_ok());
    }

    #[test]
    fn stored_as_plain_string() {
        let epic = EpicNumber::example();
        assert_eq!(Bson::from(epic.clone()), Bson::String("ABC1234567".to_string()));
        // Borrowed numbers convert through bson's own `From<&T>`.
        let filter = mongodb::bson::doc! { "_id": &epic };
        assert_eq!(filter.get_str("_id").unwrap(), "ABC1234567");
    }
}
