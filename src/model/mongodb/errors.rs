//! The mongodb crate doesn't provide server error code constants.
//! This module fills in the ones we rely on.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key write error.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// For an unordered bulk insert, the number of documents rejected as
/// duplicates. Returns `None` if any failure was something other than a
/// duplicate key, in which case the error should be propagated.
pub fn duplicate_insert_count(err: &DbError) -> Option<usize> {
    match *err.kind {
        ErrorKind::BulkWrite(ref failure) => {
            if failure.write_concern_error.is_some() {
                return None;
            }
            let write_errors = failure.write_errors.as_deref().unwrap_or_default();
            write_errors
                .iter()
                .all(|e| e.code == DUPLICATE_KEY)
                .then_some(write_errors.len())
        }
        _ => None,
    }
}
