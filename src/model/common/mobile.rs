use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::Bson;
use phonenumber::{country, Mode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numbers given without a country code are read as Indian numbers.
const DEFAULT_REGION: country::Id = country::Id::IN;

/// A validated phone number, stored and compared in E.164 form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mobile(String);

#[derive(Debug, Error)]
pub enum MobileError {
    #[error(transparent)]
    Parse(#[from] phonenumber::ParseError),
    #[error("Not a valid phone number: {0}")]
    Invalid(String),
}

impl FromStr for Mobile {
    type Err = MobileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = phonenumber::parse(Some(DEFAULT_REGION), s.trim())?;
        if !phonenumber::is_valid(&number) {
            return Err(MobileError::Invalid(s.to_string()));
        }
        Ok(Self(number.format().mode(Mode::E164).to_string()))
    }
}

impl TryFrom<String> for Mobile {
    type Error = MobileError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Mobile> for String {
    fn from(mobile: Mobile) -> Self {
        mobile.0
    }
}

impl From<Mobile> for Bson {
    fn from(mobile: Mobile) -> Self {
        Bson::String(mobile.0)
    }
}

impl Deref for Mobile {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Mobile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Mobile {
        pub fn example() -> Self {
            "9876543210".parse().unwrap()
        }

        pub fn example2() -> Self {
            "+91 91234 56789".parse().unwrap()
        }
    }
}
