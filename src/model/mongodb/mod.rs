mod bson;
mod collection;
mod errors;

pub use bson::{escape_regex, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{duplicate_insert_count, is_duplicate_key_error, DUPLICATE_KEY};
