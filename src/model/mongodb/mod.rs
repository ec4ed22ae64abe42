mod bson;
mod collection;
mod counter;
mod errors;

pub use self::bson::u32_id_filter;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::Counter;
pub use errors::is_duplicate_key_error;
