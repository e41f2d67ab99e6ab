//! # Identity & Integrity
//!
//! The only place that decides whether a logical row already exists and
//! whether a foreign reference resolves.
//!
//! ## Two Reference Policies
//!
//! References are checked on two separate paths, with different strictness:
//!
//! - **Load path** ([`Integrity::load`]): rows are decoded against a
//!   [`Snapshot`] of the relations they reference. A row whose restaurant or
//!   owner does not resolve is logged and dropped. Files written by older
//!   versions may contain such rows and must still load.
//! - **Write path** ([`Constrained::check_references`]): a new or changed row
//!   whose references do not resolve is rejected before anything is written.
//!   The other direction is guarded too ([`Constrained::check_dependents`]): a
//!   user or restaurant that other rows point at cannot be removed, or change
//!   what they point at, through a plain update.
//!
//! Keep the two paths separate. Existing files may hold dangling rows and must
//! still load; no new dangling row may be written.
//!
//! ## Cost
//!
//! Every check is a full scan. There are no indexes: the store is single-user
//! and single-process.

use log::{debug, warn};
use thiserror::Error;

use crate::codec::{self, Dependencies, Record, Resolve};
use crate::error::Result;
use crate::model::{Favorite, Restaurant, RestaurantKey, Review, User, ValidationError};
use crate::store::{Relation, RelationBackend, Row};

/// Why a write was refused. Expected during normal operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("a record with the same key already exists: {0}")]
    Duplicate(String),

    #[error("no such record")]
    NotFound,

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("user '{0}' is not a restaurant owner")]
    NotAnOwner(String),

    #[error("user '{0}' is not a customer")]
    NotACustomer(String),

    #[error("unknown restaurant {0}")]
    UnknownRestaurant(RestaurantKey),

    #[error("review already has a reply")]
    AlreadyReplied,

    #[error("review has no reply to edit")]
    NoReply,

    #[error("restaurant {0} belongs to another owner")]
    ForeignRestaurant(RestaurantKey),

    #[error("wrong password")]
    WrongPassword,

    #[error("address could not be located and no coordinates were given")]
    Unlocatable,

    #[error("{key} is still referenced by {rows} row(s)")]
    Referenced { key: String, rows: usize },
}

/// Point-in-time copy of the users and restaurants relations, used to resolve
/// references. Plain vectors, scanned linearly.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    users: Vec<User>,
    restaurants: Vec<Restaurant>,
    tolerance: f64,
}

impl Snapshot {
    pub fn empty(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Default::default()
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        &self.restaurants
    }
}

impl Resolve for Snapshot {
    fn user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    fn restaurant(&self, key: &RestaurantKey) -> Option<&Restaurant> {
        self.restaurants
            .iter()
            .find(|r| r.key.matches(key, self.tolerance))
    }
}

/// Write-time rules of a record kind.
pub trait Constrained: Record {
    /// Reject the record if one of its references does not resolve in
    /// `snapshot`. Called before every insert and update.
    fn check_references(&self, snapshot: &Snapshot) -> Option<Rejection>;

    /// Human-readable key, for rejections and logs.
    fn describe_key(&self) -> String;

    /// Reject removing this record, or replacing it with `replacement`, while
    /// rows of other relations reference it by something that would change.
    fn check_dependents<B: RelationBackend>(
        &self,
        _replacement: Option<&Self>,
        _integrity: &Integrity<'_, B>,
    ) -> Result<Option<Rejection>> {
        Ok(None)
    }
}

fn referenced(key: String, rows: usize) -> Option<Rejection> {
    (rows > 0).then_some(Rejection::Referenced { key, rows })
}

fn require_customer(snapshot: &Snapshot, username: &str) -> Option<Rejection> {
    match snapshot.user(username) {
        Some(user) if user.is_customer() => None,
        Some(_) => Some(Rejection::NotACustomer(username.to_string())),
        None => Some(Rejection::UnknownUser(username.to_string())),
    }
}

fn require_restaurant(snapshot: &Snapshot, key: &RestaurantKey) -> Option<Rejection> {
    match snapshot.restaurant(key) {
        Some(_) => None,
        None => Some(Rejection::UnknownRestaurant(key.clone())),
    }
}

impl Constrained for User {
    fn check_references(&self, _snapshot: &Snapshot) -> Option<Rejection> {
        None
    }

    fn describe_key(&self) -> String {
        self.username.clone()
    }

    /// Restaurants reference owners, reviews and favorites reference
    /// customers, all by username. A change of kind breaks them as well.
    fn check_dependents<B: RelationBackend>(
        &self,
        replacement: Option<&Self>,
        integrity: &Integrity<'_, B>,
    ) -> Result<Option<Rejection>> {
        let unchanged = replacement
            .is_some_and(|new| new.username == self.username && new.kind == self.kind);
        if unchanged {
            return Ok(None);
        }
        let rows = integrity.rows_referencing_user(&self.username)?;
        Ok(referenced(format!("user '{}'", self.username), rows))
    }
}

impl Constrained for Restaurant {
    fn check_references(&self, snapshot: &Snapshot) -> Option<Rejection> {
        match snapshot.user(&self.owner) {
            Some(user) if user.is_owner() => None,
            Some(_) => Some(Rejection::NotAnOwner(self.owner.clone())),
            None => Some(Rejection::UnknownUser(self.owner.clone())),
        }
    }

    fn describe_key(&self) -> String {
        self.key.to_string()
    }

    fn check_dependents<B: RelationBackend>(
        &self,
        replacement: Option<&Self>,
        integrity: &Integrity<'_, B>,
    ) -> Result<Option<Rejection>> {
        let unchanged =
            replacement.is_some_and(|new| new.key.matches(&self.key, integrity.tolerance()));
        if unchanged {
            return Ok(None);
        }
        let rows = integrity.rows_referencing_restaurant(&self.key)?;
        Ok(referenced(format!("restaurant {}", self.key), rows))
    }
}

impl Constrained for Review {
    fn check_references(&self, snapshot: &Snapshot) -> Option<Rejection> {
        require_customer(snapshot, &self.reviewer)
            .or_else(|| require_restaurant(snapshot, &self.restaurant))
    }

    fn describe_key(&self) -> String {
        format!("review by '{}' of {}", self.reviewer, self.restaurant)
    }
}

impl Constrained for Favorite {
    fn check_references(&self, snapshot: &Snapshot) -> Option<Rejection> {
        require_customer(snapshot, &self.customer)
            .or_else(|| require_restaurant(snapshot, &self.restaurant))
    }

    fn describe_key(&self) -> String {
        format!("favorite of '{}': {}", self.customer, self.restaurant)
    }
}

/// Integrity operations over one backend.
pub struct Integrity<'s, B: RelationBackend> {
    backend: &'s B,
    tolerance: f64,
}

impl<'s, B: RelationBackend> Integrity<'s, B> {
    pub fn new(backend: &'s B, tolerance: f64) -> Self {
        Self { backend, tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Load whatever `deps` asks for. Restaurants are decoded against the
    /// freshly loaded users, so owner references are resolved transitively.
    pub fn snapshot(&self, deps: Dependencies) -> Result<Snapshot> {
        let mut snapshot = Snapshot::empty(self.tolerance);
        if deps >= Dependencies::Users {
            snapshot.users = self.load_with::<User>(&snapshot)?;
        }
        if deps >= Dependencies::Restaurants {
            snapshot.restaurants = self.load_with::<Restaurant>(&snapshot)?;
        }
        Ok(snapshot)
    }

    /// Full load of a relation on the tolerant path: corrupt rows and rows
    /// with dangling references are logged and skipped.
    pub fn load<R: Record>(&self) -> Result<Vec<R>> {
        let snapshot = self.snapshot(R::DEPENDENCIES)?;
        self.load_with(&snapshot)
    }

    pub fn load_with<R: Record>(&self, resolver: &dyn Resolve) -> Result<Vec<R>> {
        let rows = self.backend.load_all(R::RELATION)?;
        let mut records = Vec::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            match R::decode(row, resolver) {
                Ok(record) => records.push(record),
                Err(corrupt) => warn!("skipping {} record #{}: {}", R::RELATION, position + 1, corrupt),
            }
        }
        Ok(records)
    }

    pub fn exists_by_natural_key<R: Record>(&self, key: &R::Key) -> Result<bool> {
        let records = self.load::<R>()?;
        Ok(records.iter().any(|r| r.matches_key(key, self.tolerance)))
    }

    /// Whether any full-arity row holds `key`, including rows the tolerant
    /// load skips. Uniqueness is decided here, not by [`Self::exists_by_natural_key`].
    pub fn key_taken<R: Record>(&self, key: &R::Key) -> Result<bool> {
        let arity = R::RELATION.arity();
        Ok(self
            .backend
            .load_all(R::RELATION)?
            .iter()
            .any(|row| row.len() == arity && R::key_in_row(row, key, self.tolerance)))
    }

    fn count_rows<P>(&self, relation: Relation, predicate: P) -> Result<usize>
    where
        P: Fn(&[String]) -> bool,
    {
        Ok(self
            .backend
            .load_all(relation)?
            .iter()
            .filter(|row| predicate(row))
            .count())
    }

    /// Raw restaurant, review and favorite rows naming `username`.
    pub fn rows_referencing_user(&self, username: &str) -> Result<usize> {
        let owned = self.count_rows(Relation::Restaurants, |row| {
            codec::restaurant_owner(row) == Some(username)
        })?;
        let mut by_user = 0;
        for relation in [Relation::Reviews, Relation::Favorites] {
            by_user += self.count_rows(relation, |row| {
                codec::referencing_user(row) == Some(username)
            })?;
        }
        Ok(owned + by_user)
    }

    /// Raw review and favorite rows pointing at `key`.
    pub fn rows_referencing_restaurant(&self, key: &RestaurantKey) -> Result<usize> {
        let mut rows = 0;
        for relation in [Relation::Reviews, Relation::Favorites] {
            rows += self.count_rows(relation, |row| {
                codec::referenced_restaurant(row).is_some_and(|found| found.matches(key, self.tolerance))
            })?;
        }
        Ok(rows)
    }

    pub fn resolve_user(&self, username: &str) -> Result<Option<User>> {
        let snapshot = self.snapshot(Dependencies::Users)?;
        Ok(snapshot.user(username).cloned())
    }

    pub fn resolve_restaurant(&self, key: &RestaurantKey) -> Result<Option<Restaurant>> {
        let snapshot = self.snapshot(Dependencies::Restaurants)?;
        Ok(snapshot.restaurant(key).cloned())
    }

    /// Point every review and favorite referencing `old` at `replacement`, or
    /// delete them when `replacement` is `None`.
    ///
    /// Works on raw rows so that rows which do not currently decode survive
    /// untouched. Returns the number of rows changed across both relations.
    /// Each relation is rewritten atomically, but the two rewrites are
    /// independent of each other and of the restaurant change.
    pub fn cascade_restaurant(
        &self,
        old: &RestaurantKey,
        replacement: Option<&RestaurantKey>,
    ) -> Result<usize> {
        let mut changed = 0;
        for relation in [Relation::Reviews, Relation::Favorites] {
            let rows = self.backend.load_all(relation)?;
            let mut kept: Vec<Row> = Vec::with_capacity(rows.len());
            let mut touched = 0;
            for mut row in rows {
                let references_old = codec::referenced_restaurant(&row)
                    .is_some_and(|key| key.matches(old, self.tolerance));
                if !references_old {
                    kept.push(row);
                    continue;
                }
                touched += 1;
                if let Some(new_key) = replacement {
                    codec::replace_referenced_restaurant(&mut row, new_key);
                    kept.push(row);
                }
            }
            if touched > 0 {
                debug!("cascading {} {} rows for {}", touched, relation, old);
                self.backend.rewrite_all(relation, &kept)?;
                changed += touched;
            }
        }
        Ok(changed)
    }

    /// Everything that must hold before `record` may be written, except
    /// uniqueness (which needs the target relation itself).
    pub fn check_write<R: Constrained>(&self, record: &R) -> Result<Option<Rejection>> {
        if let Err(invalid) = record.validate() {
            return Ok(Some(Rejection::Invalid(invalid)));
        }
        let snapshot = self.snapshot(R::DEPENDENCIES)?;
        Ok(record.check_references(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Record;
    use crate::model::fixtures::*;
    use crate::model::Coordinates;
    use crate::store::mem_backend::MemBackend;
    use crate::store::Relation;

    const TOL: f64 = 1e-4;

    fn seeded() -> MemBackend {
        let backend = MemBackend::new();
        backend.push_raw(Relation::Users, customer("alice").encode());
        backend.push_raw(Relation::Users, owner("bruno").encode());
        backend.push_raw(Relation::Restaurants, restaurant("Da Mario", "bruno").encode());
        backend
    }

    #[test]
    fn test_exists_by_username() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);
        assert!(integrity
            .exists_by_natural_key::<User>(&"alice".to_string())
            .unwrap());
        assert!(!integrity
            .exists_by_natural_key::<User>(&"Alice".to_string())
            .unwrap());
    }

    #[test]
    fn test_exists_by_restaurant_tuple_with_tolerance() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);
        let mut k = key("Da Mario");
        k.coordinates = Coordinates::new(45.46424, 9.19003);
        assert!(integrity.exists_by_natural_key::<Restaurant>(&k).unwrap());

        k.city = "Roma".to_string();
        assert!(!integrity.exists_by_natural_key::<Restaurant>(&k).unwrap());
    }

    #[test]
    fn test_load_skips_corrupt_rows_and_keeps_the_rest() {
        let backend = seeded();
        backend.push_raw(Relation::Users, vec!["too".into(), "short".into()]);
        backend.push_raw(Relation::Users, customer("carla").encode());

        let integrity = Integrity::new(&backend, TOL);
        let users = integrity.load::<User>().unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bruno", "carla"]);
    }

    #[test]
    fn test_restaurant_with_vanished_owner_is_dropped_on_load() {
        let backend = seeded();
        backend.push_raw(Relation::Restaurants, restaurant("Orphan", "ghost").encode());

        let integrity = Integrity::new(&backend, TOL);
        let restaurants = integrity.load::<Restaurant>().unwrap();
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].key.name, "Da Mario");
    }

    #[test]
    fn test_review_chain_resolution_drops_review_of_dropped_restaurant() {
        let backend = seeded();
        // Restaurant owned by a customer never loads, so its reviews dangle.
        backend.push_raw(Relation::Restaurants, restaurant("Bad Owner", "alice").encode());
        backend.push_raw(
            Relation::Reviews,
            Review::new("alice", key("Bad Owner"), 2, "").encode(),
        );
        backend.push_raw(
            Relation::Reviews,
            Review::new("alice", key("Da Mario"), 5, "").encode(),
        );

        let integrity = Integrity::new(&backend, TOL);
        let reviews = integrity.load::<Review>().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].restaurant.name, "Da Mario");
    }

    #[test]
    fn test_write_path_rejects_what_load_path_tolerates() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);

        let dangling = Review::new("alice", key("Nowhere"), 4, "");
        assert_eq!(
            integrity.check_write(&dangling).unwrap(),
            Some(Rejection::UnknownRestaurant(key("Nowhere")))
        );
    }

    #[test]
    fn test_write_path_checks_user_kinds() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);

        let by_owner = Review::new("bruno", key("Da Mario"), 4, "");
        assert_eq!(
            integrity.check_write(&by_owner).unwrap(),
            Some(Rejection::NotACustomer("bruno".to_string()))
        );

        let owned_by_customer = restaurant("Altro", "alice");
        assert_eq!(
            integrity.check_write(&owned_by_customer).unwrap(),
            Some(Rejection::NotAnOwner("alice".to_string()))
        );

        let owned_by_nobody = restaurant("Altro", "ghost");
        assert_eq!(
            integrity.check_write(&owned_by_nobody).unwrap(),
            Some(Rejection::UnknownUser("ghost".to_string()))
        );
    }

    #[test]
    fn test_validation_runs_before_references() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);
        let review = Review::new("ghost", key("Nowhere"), 0, "");
        assert!(matches!(
            integrity.check_write(&review).unwrap(),
            Some(Rejection::Invalid(ValidationError::StarsOutOfRange(0)))
        ));
    }

    #[test]
    fn test_resolve_helpers() {
        let backend = seeded();
        let integrity = Integrity::new(&backend, TOL);
        assert!(integrity.resolve_user("bruno").unwrap().unwrap().is_owner());
        assert!(integrity.resolve_user("nobody").unwrap().is_none());
        assert!(integrity
            .resolve_restaurant(&key("Da Mario"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_cascade_rekeys_reviews_and_favorites() {
        let backend = seeded();
        backend.push_raw(
            Relation::Reviews,
            Review::new("alice", key("Da Mario"), 5, "").encode(),
        );
        backend.push_raw(Relation::Favorites, Favorite::new("alice", key("Da Mario")).encode());
        backend.push_raw(Relation::Favorites, Favorite::new("alice", key("Zen")).encode());

        let integrity = Integrity::new(&backend, TOL);
        let changed = integrity
            .cascade_restaurant(&key("Da Mario"), Some(&key("Da Mario 2")))
            .unwrap();
        assert_eq!(changed, 2);

        let favorites = backend.load_all(Relation::Favorites).unwrap();
        assert_eq!(favorites[0][1], "Da Mario 2");
        assert_eq!(favorites[1][1], "Zen");
        assert_eq!(backend.load_all(Relation::Reviews).unwrap()[0][1], "Da Mario 2");
    }

    #[test]
    fn test_cascade_delete_keeps_unrelated_and_undecodable_rows() {
        let backend = seeded();
        backend.push_raw(Relation::Favorites, Favorite::new("alice", key("Da Mario")).encode());
        backend.push_raw(Relation::Favorites, vec!["garbage".to_string()]);

        let integrity = Integrity::new(&backend, TOL);
        assert_eq!(integrity.cascade_restaurant(&key("Da Mario"), None).unwrap(), 1);
        assert_eq!(
            backend.load_all(Relation::Favorites).unwrap(),
            vec![vec!["garbage".to_string()]]
        );
    }

    #[test]
    fn test_key_taken_sees_rows_the_load_skips() {
        let backend = seeded();
        let mut broken = customer("zed").encode();
        broken[4] = "31/02/1999".to_string();
        backend.push_raw(Relation::Users, broken);
        backend.push_raw(Relation::Restaurants, restaurant("Orphan", "ghost").encode());

        let integrity = Integrity::new(&backend, TOL);
        let zed = "zed".to_string();
        assert!(!integrity.exists_by_natural_key::<User>(&zed).unwrap());
        assert!(integrity.key_taken::<User>(&zed).unwrap());
        assert!(integrity.key_taken::<Restaurant>(&key("Orphan")).unwrap());
        assert!(!integrity.key_taken::<User>(&"nobody".to_string()).unwrap());
    }

    #[test]
    fn test_dependents_of_users_and_restaurants() {
        let backend = seeded();
        backend.push_raw(Relation::Favorites, Favorite::new("alice", key("Da Mario")).encode());
        let integrity = Integrity::new(&backend, TOL);

        let bruno = owner("bruno");
        assert_eq!(integrity.rows_referencing_user("bruno").unwrap(), 1);
        assert_eq!(
            bruno.check_dependents(None, &integrity).unwrap(),
            Some(Rejection::Referenced {
                key: "user 'bruno'".to_string(),
                rows: 1
            })
        );
        let demoted = customer("bruno");
        assert!(bruno.check_dependents(Some(&demoted), &integrity).unwrap().is_some());
        let mut renamed_only = owner("bruno");
        renamed_only.name = "Bruno Maria".to_string();
        assert_eq!(bruno.check_dependents(Some(&renamed_only), &integrity).unwrap(), None);

        assert!(customer("alice").check_dependents(None, &integrity).unwrap().is_some());
        assert_eq!(customer("carla").check_dependents(None, &integrity).unwrap(), None);

        let da_mario = restaurant("Da Mario", "bruno");
        assert!(da_mario.check_dependents(None, &integrity).unwrap().is_some());
        let mut repriced = da_mario.clone();
        repriced.average_price = 99.0;
        assert_eq!(da_mario.check_dependents(Some(&repriced), &integrity).unwrap(), None);
    }

    #[test]
    fn test_cascade_without_matches_writes_nothing() {
        let backend = seeded();
        backend.set_simulate_write_error(true);
        let integrity = Integrity::new(&backend, TOL);
        assert_eq!(integrity.cascade_restaurant(&key("Nowhere"), None).unwrap(), 0);
    }
}
