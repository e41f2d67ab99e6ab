use super::{Relation, Row};
use crate::error::Result;

/// Abstract interface for raw relation I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while the
/// repositories handle the "what" (keys, references, validation).
/// Every call is self-contained: nothing is cached between calls.
pub trait RelationBackend {
    /// Make sure the relation exists, creating it with its header if missing.
    /// Existing contents are left untouched.
    fn ensure(&self, relation: Relation) -> Result<()>;

    /// Read every data row in file order, skipping the header.
    ///
    /// Rows the underlying format cannot split (e.g. invalid UTF-8) are logged
    /// and skipped. A missing relation is an error.
    fn load_all(&self, relation: Relation) -> Result<Vec<Row>>;

    /// Append a single row at the end of the relation.
    /// Never rewrites; the caller is responsible for uniqueness.
    fn append_one(&self, relation: Relation, row: &[String]) -> Result<()>;

    /// Replace the whole relation with its header followed by `rows`.
    /// MUST be atomic: a failure leaves the previous contents intact.
    fn rewrite_all(&self, relation: Relation, rows: &[Row]) -> Result<()>;
}
