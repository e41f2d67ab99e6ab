//! # Trattoria Record Store
//!
//! Trattoria is the **persistence library** behind a restaurant review
//! application. It keeps users, restaurants, reviews and favorites in four
//! plain CSV files and offers entity-level operations over them. Screens,
//! prompts and formatting live in whatever front end links it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Services (services/)                                       │
//! │  - Accounts, customer and owner sessions, search            │
//! │  - Compose several repositories per operation               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Repositories (repo/)                                       │
//! │  - find, exists, add, update, remove, list_by per entity    │
//! │  - Return WriteOutcome: Applied or Rejected(why)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Integrity (integrity.rs) + Codec (codec.rs)                │
//! │  - Natural keys, reference resolution, validation           │
//! │  - Row <-> entity mapping                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Relation Store (store/)                                    │
//! │  - RelationBackend trait: load_all, append_one, rewrite_all │
//! │  - FsBackend (CSV files), MemBackend (testing)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References Between Files
//!
//! There is no database enforcing foreign keys. Two rules keep the files
//! consistent enough to use:
//!
//! - **Loads are tolerant.** A row that cannot be decoded, or that points at a
//!   restaurant or owner that does not exist, is logged with `log::warn!` and
//!   skipped. One bad line never hides the rest of a file.
//! - **Writes are strict.** Nothing is written unless the record is valid, its
//!   references resolve and its natural key is free.
//!
//! ## Failure Model
//!
//! Expected refusals (duplicate key, unknown user, review already answered)
//! are values: [`repo::WriteOutcome::Rejected`]. Only I/O and configuration
//! faults are errors ([`error::StoreError`]).
//!
//! ## Module Overview
//!
//! - [`store`]: relation I/O and the [`store::RecordStore`] handle
//! - [`codec`]: field layout of each entity
//! - [`integrity`]: reference checks, rejections, key cascades
//! - [`repo`]: per-entity repositories
//! - [`services`]: cross-entity operations
//! - [`model`]: entities and their validation
//! - [`config`]: data directory and tolerance settings
//! - [`auth`], [`geo`]: password hashing and geocoding collaborators
//! - [`error`]: error types

pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod geo;
pub mod integrity;
pub mod model;
pub mod repo;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_utils;
