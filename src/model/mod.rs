//! Data types, split by where they live: `api` for request/response bodies,
//! `common` for types shared by both sides, `db` for stored documents and the
//! queries over them, and `mongodb` for collection plumbing.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
