//! # Entity Repositories
//!
//! Domain-level operations on one relation, built from the backend, the codec
//! and the integrity layer. [`Table`] provides the uniform contract; each entity
//! kind adds its own finders in a submodule.
//!
//! ## Contract
//!
//! | Operation | I/O | Rejected when |
//! |-----------|-----|---------------|
//! | `add` | full scan + append | invalid, dangling reference, duplicate key |
//! | `find` | full scan | never (returns `None`) |
//! | `update` | full scan + rewrite | old not found, new invalid/dangling, new key taken, old key still referenced |
//! | `remove` | full scan + rewrite | nothing matched, still referenced |
//! | `list_by` | full scan | never |
//!
//! Every call re-reads the relation. Results are in file order, which is
//! insertion order since rewrites keep the survivors in place.
//!
//! ## Outcomes
//!
//! `try_*` methods return a [`WriteOutcome`], carrying the [`Rejection`] on a
//! refused write. The plain methods (`add`, `update`, `remove`) collapse it to
//! a `bool`. Either way, only I/O faults come back as `Err`.
//!
//! A rewrite is built from the decoded rows, so rows skipped as corrupt on
//! that load are not written back.

use std::marker::PhantomData;

use log::debug;

use crate::codec::Record;
use crate::error::Result;
use crate::integrity::{Constrained, Integrity, Rejection};
use crate::model::{Favorite, Restaurant, Review, User};
use crate::store::{RelationBackend, Row};

pub mod favorites;
pub mod restaurants;
pub mod reviews;
pub mod users;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied,
    Rejected(Rejection),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            WriteOutcome::Applied => None,
            WriteOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

impl From<Option<Rejection>> for WriteOutcome {
    fn from(rejection: Option<Rejection>) -> Self {
        match rejection {
            Some(rejection) => WriteOutcome::Rejected(rejection),
            None => WriteOutcome::Applied,
        }
    }
}

/// Whether a replacement or removal first checks the rows referencing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    Dependents,
    Skip,
}

pub type Users<'s, B> = Table<'s, B, User>;
pub type Restaurants<'s, B> = Table<'s, B, Restaurant>;
pub type Reviews<'s, B> = Table<'s, B, Review>;
pub type Favorites<'s, B> = Table<'s, B, Favorite>;

/// Repository over the relation of record kind `R`.
pub struct Table<'s, B: RelationBackend, R: Constrained> {
    backend: &'s B,
    tolerance: f64,
    _record: PhantomData<R>,
}

impl<'s, B: RelationBackend, R: Constrained> Table<'s, B, R> {
    pub fn new(backend: &'s B, tolerance: f64) -> Self {
        Self {
            backend,
            tolerance,
            _record: PhantomData,
        }
    }

    pub fn integrity(&self) -> Integrity<'s, B> {
        Integrity::new(self.backend, self.tolerance)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Every loadable record, in file order.
    pub fn list(&self) -> Result<Vec<R>> {
        self.integrity().load::<R>()
    }

    pub fn list_by<P>(&self, predicate: P) -> Result<Vec<R>>
    where
        P: Fn(&R) -> bool,
    {
        Ok(self.list()?.into_iter().filter(|r| predicate(r)).collect())
    }

    pub fn find(&self, key: &R::Key) -> Result<Option<R>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.matches_key(key, self.tolerance)))
    }

    pub fn exists(&self, key: &R::Key) -> Result<bool> {
        self.integrity().exists_by_natural_key::<R>(key)
    }

    pub fn try_add(&self, record: &R) -> Result<WriteOutcome> {
        let integrity = self.integrity();
        if let Some(rejection) = integrity.check_write(record)? {
            return Ok(self.rejected(rejection));
        }
        if integrity.key_taken::<R>(&record.key())? {
            return Ok(self.rejected(Rejection::Duplicate(record.describe_key())));
        }
        self.backend.append_one(R::RELATION, &record.encode())?;
        Ok(WriteOutcome::Applied)
    }

    pub fn add(&self, record: &R) -> Result<bool> {
        Ok(self.try_add(record)?.is_applied())
    }

    /// Replace the record whose key matches `old` with `new`, in place.
    ///
    /// `new` may carry a different key, as long as no other row holds it and
    /// no other relation references the old one.
    pub fn try_update(&self, old: &R, new: &R) -> Result<WriteOutcome> {
        self.replace(old, new, Guard::Dependents)
    }

    pub fn update(&self, old: &R, new: &R) -> Result<bool> {
        Ok(self.try_update(old, new)?.is_applied())
    }

    /// [`Self::try_update`] without the dependents check. The caller moves the
    /// dependents afterwards.
    pub(crate) fn try_update_detached(&self, old: &R, new: &R) -> Result<WriteOutcome> {
        self.replace(old, new, Guard::Skip)
    }

    fn replace(&self, old: &R, new: &R, guard: Guard) -> Result<WriteOutcome> {
        let mut records = self.list()?;
        let Some(position) = records
            .iter()
            .position(|r| r.same_key(old, self.tolerance))
        else {
            return Ok(self.rejected(Rejection::NotFound));
        };

        match self.check_replacement(&records, position, new.clone(), guard)? {
            Ok(checked) => records[position] = checked,
            Err(rejection) => return Ok(self.rejected(rejection)),
        }
        self.rewrite(&records)?;
        Ok(WriteOutcome::Applied)
    }

    /// Everything a changed record must pass before it replaces
    /// `records[position]`.
    fn check_replacement(
        &self,
        records: &[R],
        position: usize,
        changed: R,
        guard: Guard,
    ) -> Result<std::result::Result<R, Rejection>> {
        let integrity = self.integrity();
        if let Some(rejection) = integrity.check_write(&changed)? {
            return Ok(Err(rejection));
        }
        let current = &records[position];
        let moved = !current.same_key(&changed, self.tolerance);
        let taken_here = records
            .iter()
            .enumerate()
            .any(|(i, r)| i != position && r.same_key(&changed, self.tolerance));
        if taken_here || (moved && integrity.key_taken::<R>(&changed.key())?) {
            return Ok(Err(Rejection::Duplicate(changed.describe_key())));
        }
        if guard == Guard::Dependents {
            if let Some(rejection) = current.check_dependents(Some(&changed), &integrity)? {
                return Ok(Err(rejection));
            }
        }
        Ok(Ok(changed))
    }

    /// Remove every record whose key matches `record`. Refused while another
    /// relation references it.
    pub fn try_remove(&self, record: &R) -> Result<WriteOutcome> {
        let integrity = self.integrity();
        let matched = self.list_by(|r| r.same_key(record, self.tolerance))?;
        if matched.is_empty() {
            return Ok(self.rejected(Rejection::NotFound));
        }
        for found in &matched {
            if let Some(rejection) = found.check_dependents(None, &integrity)? {
                return Ok(self.rejected(rejection));
            }
        }
        self.remove_matching(|r| r.same_key(record, self.tolerance), Guard::Skip)?;
        Ok(WriteOutcome::Applied)
    }

    pub fn remove(&self, record: &R) -> Result<bool> {
        Ok(self.try_remove(record)?.is_applied())
    }

    /// [`Self::try_remove`] without the dependents check. The caller removes
    /// the dependents afterwards.
    pub(crate) fn try_remove_detached(&self, record: &R) -> Result<WriteOutcome> {
        let removed = self.remove_matching(|r| r.same_key(record, self.tolerance), Guard::Skip)?;
        if removed == 0 {
            return Ok(self.rejected(Rejection::NotFound));
        }
        Ok(WriteOutcome::Applied)
    }

    /// Remove all matching records with a single rewrite. Returns how many were
    /// removed; nothing is written when that is zero. Matching records that
    /// another relation still references are kept.
    pub fn remove_where<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&R) -> bool,
    {
        self.remove_matching(predicate, Guard::Dependents)
    }

    fn remove_matching<P>(&self, predicate: P, guard: Guard) -> Result<usize>
    where
        P: Fn(&R) -> bool,
    {
        let integrity = self.integrity();
        let records = self.list()?;
        let before = records.len();
        let mut survivors = Vec::with_capacity(before);
        for record in records {
            if !predicate(&record) {
                survivors.push(record);
                continue;
            }
            if guard == Guard::Dependents {
                if let Some(rejection) = record.check_dependents(None, &integrity)? {
                    debug!("{} kept: {}", R::RELATION, rejection);
                    survivors.push(record);
                }
            }
        }
        let removed = before - survivors.len();
        if removed > 0 {
            self.rewrite(&survivors)?;
        }
        Ok(removed)
    }

    /// Load, apply `change` to the record matching `key`, and rewrite.
    ///
    /// `change` may refuse by returning a rejection, in which case nothing is
    /// written. The changed record goes through the same checks as an update.
    pub fn try_modify<F>(&self, key: &R::Key, change: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut R) -> Option<Rejection>,
    {
        let mut records = self.list()?;
        let Some(position) = records
            .iter()
            .position(|r| r.matches_key(key, self.tolerance))
        else {
            return Ok(self.rejected(Rejection::NotFound));
        };

        let mut changed = records[position].clone();
        if let Some(rejection) = change(&mut changed) {
            return Ok(self.rejected(rejection));
        }
        match self.check_replacement(&records, position, changed, Guard::Dependents)? {
            Ok(checked) => records[position] = checked,
            Err(rejection) => return Ok(self.rejected(rejection)),
        }
        self.rewrite(&records)?;
        Ok(WriteOutcome::Applied)
    }

    fn rewrite(&self, records: &[R]) -> Result<()> {
        let rows: Vec<Row> = records.iter().map(Record::encode).collect();
        self.backend.rewrite_all(R::RELATION, &rows)
    }

    fn rejected(&self, rejection: Rejection) -> WriteOutcome {
        debug!("{} write rejected: {}", R::RELATION, rejection);
        WriteOutcome::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::store::mem_backend::MemBackend;
    use crate::store::Relation;

    const TOL: f64 = 1e-4;

    fn users(backend: &MemBackend) -> Users<'_, MemBackend> {
        Table::new(backend, TOL)
    }

    fn usernames(backend: &MemBackend) -> Vec<String> {
        users(backend)
            .list()
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect()
    }

    #[test]
    fn test_duplicate_add_is_rejected_and_leaves_relation_unchanged() {
        let backend = MemBackend::new();
        let table = users(&backend);

        assert!(table.add(&customer("alice")).unwrap());
        let mut again = customer("alice");
        again.name = "Someone Else".to_string();
        assert!(!table.add(&again).unwrap());

        let all = table.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Alice");
    }

    #[test]
    fn test_invalid_add_is_rejected_without_io() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let mut user = customer("alice");
        user.surname.clear();

        let outcome = users(&backend).try_add(&user).unwrap();
        assert!(matches!(
            outcome.rejection(),
            Some(Rejection::Invalid(_))
        ));
    }

    #[test]
    fn test_io_fault_is_an_error_not_a_rejection() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        assert!(users(&backend).add(&customer("alice")).is_err());
    }

    #[test]
    fn test_find_returns_none_when_absent() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("alice")).unwrap();
        assert!(table.find(&"alice".to_string()).unwrap().is_some());
        assert!(table.find(&"bob".to_string()).unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_position() {
        let backend = MemBackend::new();
        let table = users(&backend);
        for name in ["a", "b", "c"] {
            table.add(&customer(name)).unwrap();
        }

        let old = customer("b");
        let mut new = old.clone();
        new.domicile = "Napoli".to_string();
        assert!(table.update(&old, &new).unwrap());

        assert_eq!(usernames(&backend), vec!["a", "b", "c"]);
        let b = table.find(&"b".to_string()).unwrap().unwrap();
        assert_eq!(b.domicile, "Napoli");
    }

    #[test]
    fn test_update_missing_record_is_rejected() {
        let backend = MemBackend::new();
        let table = users(&backend);
        let outcome = table
            .try_update(&customer("ghost"), &customer("ghost"))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Rejected(Rejection::NotFound));
    }

    #[test]
    fn test_update_to_taken_key_is_rejected() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("a")).unwrap();
        table.add(&customer("b")).unwrap();

        let outcome = table.try_update(&customer("a"), &customer("b")).unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected(Rejection::Duplicate(_))));
        assert_eq!(usernames(&backend), vec!["a", "b"]);
    }

    #[test]
    fn test_update_may_change_key() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("a")).unwrap();
        table.add(&customer("b")).unwrap();

        assert!(table.update(&customer("a"), &customer("z")).unwrap());
        assert_eq!(usernames(&backend), vec!["z", "b"]);
    }

    #[test]
    fn test_remove_preserves_order_of_survivors() {
        let backend = MemBackend::new();
        let table = users(&backend);
        for name in ["a", "b", "x", "c"] {
            table.add(&customer(name)).unwrap();
        }

        assert!(table.remove(&customer("x")).unwrap());
        assert_eq!(usernames(&backend), vec!["a", "b", "c"]);
        assert!(!table.remove(&customer("x")).unwrap());
    }

    #[test]
    fn test_remove_where_counts_and_skips_rewrite_when_nothing_matches() {
        let backend = MemBackend::new();
        let table = users(&backend);
        for name in ["a", "b", "c"] {
            table.add(&customer(name)).unwrap();
        }

        backend.set_simulate_write_error(true);
        assert_eq!(table.remove_where(|u| u.username == "zz").unwrap(), 0);

        backend.set_simulate_write_error(false);
        assert_eq!(table.remove_where(|u| u.username != "b").unwrap(), 2);
        assert_eq!(usernames(&backend), vec!["b"]);
    }

    #[test]
    fn test_rewrite_drops_corrupt_rows() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("a")).unwrap();
        backend.push_raw(Relation::Users, vec!["broken".to_string()]);
        table.add(&customer("b")).unwrap();

        table.remove(&customer("a")).unwrap();
        assert_eq!(backend.load_all(Relation::Users).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_of_undecodable_row_is_rejected() {
        let backend = MemBackend::new();
        let mut broken = customer("alice").encode();
        broken[4] = "someday".to_string();
        backend.push_raw(Relation::Users, broken);
        let table = users(&backend);

        assert!(table.list().unwrap().is_empty());
        let outcome = table.try_add(&customer("alice")).unwrap();
        assert!(matches!(outcome.rejection(), Some(Rejection::Duplicate(_))));
        assert_eq!(backend.load_all(Relation::Users).unwrap().len(), 1);

        table.add(&customer("bob")).unwrap();
        let outcome = table.try_update(&customer("bob"), &customer("alice")).unwrap();
        assert!(matches!(outcome.rejection(), Some(Rejection::Duplicate(_))));
    }

    fn owners_with_restaurants(backend: &MemBackend) -> Restaurants<'_, MemBackend> {
        let table = users(backend);
        table.add(&owner("bruno")).unwrap();
        table.add(&owner("dario")).unwrap();
        let restaurants: Restaurants<'_, MemBackend> = Table::new(backend, TOL);
        restaurants.add(&restaurant("Da Mario", "bruno")).unwrap();
        restaurants.add(&restaurant("Zen", "dario")).unwrap();
        restaurants
    }

    #[test]
    fn test_owner_with_restaurants_cannot_be_demoted_renamed_or_removed() {
        let backend = MemBackend::new();
        let restaurants = owners_with_restaurants(&backend);
        let table = users(&backend);
        let referenced = Some(Rejection::Referenced {
            key: "user 'bruno'".to_string(),
            rows: 1,
        });

        let demoted = table.try_update(&owner("bruno"), &customer("bruno")).unwrap();
        assert_eq!(demoted.rejection(), referenced.as_ref());
        let renamed = table.try_update(&owner("bruno"), &owner("bruna")).unwrap();
        assert_eq!(renamed.rejection(), referenced.as_ref());
        let removed = table.try_remove(&owner("bruno")).unwrap();
        assert_eq!(removed.rejection(), referenced.as_ref());
        let modified = table
            .try_modify(&"bruno".to_string(), |u| {
                u.kind = crate::model::UserKind::Customer;
                None
            })
            .unwrap();
        assert_eq!(modified.rejection(), referenced.as_ref());
        assert_eq!(table.remove_where(|u| u.is_owner()).unwrap(), 0);

        // An unrelated rewrite must not lose bruno's restaurant.
        assert!(restaurants.remove(&restaurant("Zen", "dario")).unwrap());
        let names: Vec<String> = backend
            .load_all(Relation::Restaurants)
            .unwrap()
            .into_iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(names, vec!["Da Mario"]);

        // Non-key changes and owners without restaurants are fine.
        let mut renamed_person = owner("bruno");
        renamed_person.surname = "Verdi".to_string();
        assert!(table.update(&owner("bruno"), &renamed_person).unwrap());
        assert!(table.remove(&owner("dario")).unwrap());
    }

    #[test]
    fn test_modify_can_refuse() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("a")).unwrap();

        let outcome = table
            .try_modify(&"a".to_string(), |_| Some(Rejection::NoReply))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Rejected(Rejection::NoReply));
    }

    #[test]
    fn test_modify_revalidates() {
        let backend = MemBackend::new();
        let table = users(&backend);
        table.add(&customer("a")).unwrap();

        let outcome = table
            .try_modify(&"a".to_string(), |u| {
                u.name.clear();
                None
            })
            .unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(table.find(&"a".to_string()).unwrap().unwrap().name, "Alice");
    }
}
