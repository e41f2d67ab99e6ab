//! # Relation Storage
//!
//! Physical I/O over the four relations. A relation is an ordered sequence of
//! rows (field vectors) preceded by a header row.
//!
//! The [`RelationBackend`] trait is deliberately small:
//!
//! - `load_all`: every data row, in file order, header skipped
//! - `append_one`: one row added at the end (insert path)
//! - `rewrite_all`: the whole relation replaced (update and delete paths)
//!
//! It knows nothing about entities, keys or duplicates. That is the job of
//! [`crate::codec`] and [`crate::integrity`].
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: CSV files in a data directory. Rewrites go to a
//!   temporary file which is then renamed over the relation.
//! - [`mem_backend::MemBackend`]: in-memory rows for tests, with write-fault
//!   injection.
//!
//! [`RecordStore`] wraps a backend and hands out the entity repositories.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── users.csv
//! ├── restaurants.csv
//! ├── reviews.csv
//! └── favorites.csv
//! ```

use std::fmt;

use serde::Serialize;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod record_store;

pub use backend::RelationBackend;
pub use record_store::RecordStore;

/// One decoded-from-text row: fields in column order.
pub type Row = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    Users,
    Restaurants,
    Reviews,
    Favorites,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::Users,
        Relation::Restaurants,
        Relation::Reviews,
        Relation::Favorites,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Relation::Users => "users.csv",
            Relation::Restaurants => "restaurants.csv",
            Relation::Reviews => "reviews.csv",
            Relation::Favorites => "favorites.csv",
        }
    }

    /// Column names, in the persisted order.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Relation::Users => &[
                "name",
                "surname",
                "username",
                "password_hash",
                "birth_date",
                "domicile",
                "user_kind",
            ],
            Relation::Restaurants => &[
                "name",
                "average_price",
                "cuisine_kind",
                "country",
                "city",
                "address",
                "latitude",
                "longitude",
                "description",
                "delivery",
                "reservation",
                "owner_username",
            ],
            Relation::Reviews => &[
                "reviewer_username",
                "restaurant_name",
                "country",
                "city",
                "address",
                "latitude",
                "longitude",
                "stars",
                "message",
                "timestamp",
                "reply_text",
                "reply_timestamp",
            ],
            Relation::Favorites => &[
                "customer_username",
                "restaurant_name",
                "country",
                "city",
                "address",
                "latitude",
                "longitude",
            ],
        }
    }

    pub fn arity(&self) -> usize {
        self.header().len()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Users => "users",
            Relation::Restaurants => "restaurants",
            Relation::Reviews => "reviews",
            Relation::Favorites => "favorites",
        };
        f.write_str(name)
    }
}
