use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::reference::{Booth, Election, Part},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionView {
    pub id: ApiId,
    pub name: String,
    pub year: i32,
    pub election_type: String,
    pub is_active: bool,
}

impl From<Election> for ElectionView {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            name: election.name,
            year: election.year,
            election_type: election.election_type,
            is_active: election.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoothView {
    pub id: ApiId,
    pub booth_no: u32,
    pub name: String,
    pub part_no: u32,
    pub ward_no: Option<u32>,
    pub address: Option<String>,
}

impl From<Booth> for BoothView {
    fn from(booth: Booth) -> Self {
        Self {
            id: booth.id.into(),
            booth_no: booth.booth_no,
            name: booth.name,
            part_no: booth.part_no,
            ward_no: booth.ward_no,
            address: booth.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartView {
    pub part_no: u32,
    pub name: Option<String>,
    pub ward_no: Option<u32>,
}

impl From<Part> for PartView {
    fn from(part: Part) -> Self {
        Self {
            part_no: part.part_no,
            name: part.name,
            ward_no: part.ward_no,
        }
    }
}
