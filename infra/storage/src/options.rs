use fcrypt_domain::document::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document built from the filter and the update when nothing matches.
    pub upsert: bool,
}

impl UpdateOptions {
    #[must_use]
    pub const fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Which version of the document a `find_one_and_*` call hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOneAndUpdateOptions {
    pub return_document: ReturnDocument,
    pub upsert: bool,
}

impl FindOneAndUpdateOptions {
    #[must_use]
    pub const fn returning(return_document: ReturnDocument) -> Self {
        Self { return_document, upsert: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<Value>,
}
