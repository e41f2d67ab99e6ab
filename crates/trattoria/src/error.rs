use thiserror::Error;

use crate::store::Relation;

/// Hard failures: the store cannot continue without its backing relations.
///
/// Expected outcomes (duplicates, missing rows, invalid input) are never
/// reported through this type; see [`crate::repo::WriteOutcome`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A row that could not be turned into a valid entity.
///
/// Produced by [`crate::codec::Record::decode`]. A full load logs it and
/// moves on to the next row.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("corrupt {relation} record: {reason}")]
pub struct CorruptRecord {
    pub relation: Relation,
    pub reason: String,
}

impl CorruptRecord {
    pub fn new(relation: Relation, reason: impl Into<String>) -> Self {
        Self {
            relation,
            reason: reason.into(),
        }
    }
}
