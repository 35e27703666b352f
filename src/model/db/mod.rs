//! Types and queries for the documents kept in each collection.

pub mod beneficiary;
pub mod programme;
pub mod project;
pub mod reference;
pub mod role;
pub mod service;
pub mod user;
pub mod visitor;
pub mod vote_mark;
pub mod voter;
