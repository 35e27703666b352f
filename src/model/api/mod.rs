//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Fields that need validating arrive as strings and are parsed into domain
//!   types, so a bad value is reported against its field.

pub mod auth;
pub mod beneficiary;
pub mod chat;
pub mod dashboard;
pub mod envelope;
pub mod fields;
pub mod id;
pub mod pagination;
pub mod programme;
pub mod project;
pub mod reference;
pub mod service;
pub mod user;
pub mod visitor;
pub mod vote;
pub mod voter;
