use mongodb::bson::{doc, Document};

/// A filter matching the document with the given numeric `_id`.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": i64::from(id) }
}
