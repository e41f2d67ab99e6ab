use std::cell::RefCell;
use std::collections::HashMap;

use super::backend::RelationBackend;
use super::{Relation, Row};
use crate::error::{Result, StoreError};

/// In-memory relation backend for testing.
///
/// Uses `RefCell` for interior mutability since the store is single-threaded.
/// This keeps `RelationBackend` on `&self` for every method.
#[derive(Default)]
pub struct MemBackend {
    relations: RefCell<HashMap<Relation, Vec<Row>>>,
    simulate_write_error: RefCell<bool>,
    /// Writes still allowed before simulated errors start.
    writes_left: RefCell<Option<usize>>,
}

impl MemBackend {
    /// A backend with all four relations present and empty.
    pub fn new() -> Self {
        let backend = Self::default();
        for relation in Relation::ALL {
            backend.relations.borrow_mut().insert(relation, Vec::new());
        }
        backend
    }

    /// Enable write error simulation for testing error handling.
    /// Also clears any [`Self::fail_after_writes`] budget.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
        *self.writes_left.borrow_mut() = None;
    }

    /// Let the next `writes` writes through, then fail every later one.
    pub fn fail_after_writes(&self, writes: usize) {
        *self.writes_left.borrow_mut() = Some(writes);
    }

    /// Test helper to plant a raw row, bypassing every check.
    pub fn push_raw(&self, relation: Relation, row: Row) {
        self.relations
            .borrow_mut()
            .entry(relation)
            .or_default()
            .push(row);
    }

    fn check_writable(&self) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(StoreError::Store("Simulated write error".to_string()));
        }
        if let Some(left) = self.writes_left.borrow_mut().as_mut() {
            if *left == 0 {
                return Err(StoreError::Store("Simulated write error".to_string()));
            }
            *left -= 1;
        }
        Ok(())
    }
}

impl RelationBackend for MemBackend {
    fn ensure(&self, relation: Relation) -> Result<()> {
        self.relations.borrow_mut().entry(relation).or_default();
        Ok(())
    }

    fn load_all(&self, relation: Relation) -> Result<Vec<Row>> {
        self.relations
            .borrow()
            .get(&relation)
            .cloned()
            .ok_or_else(|| StoreError::Store(format!("relation {} does not exist", relation)))
    }

    fn append_one(&self, relation: Relation, row: &[String]) -> Result<()> {
        self.check_writable()?;
        let mut relations = self.relations.borrow_mut();
        let rows = relations
            .get_mut(&relation)
            .ok_or_else(|| StoreError::Store(format!("relation {} does not exist", relation)))?;
        rows.push(row.to_vec());
        Ok(())
    }

    fn rewrite_all(&self, relation: Relation, rows: &[Row]) -> Result<()> {
        self.check_writable()?;
        self.relations.borrow_mut().insert(relation, rows.to_vec());
        Ok(())
    }
}
