use log::info;

use super::backend::RelationBackend;
use super::fs_backend::FsBackend;
use super::Relation;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::integrity::Integrity;
use crate::repo::{Favorites, Restaurants, Reviews, Table, Users};

/// Handle on the four relations of one data directory.
///
/// The location is fixed when the handle is built; no operation takes a path.
pub struct RecordStore<B: RelationBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    tolerance: f64,
}

impl RecordStore<FsBackend> {
    /// Open the store described by `config`, creating the data directory and
    /// any missing relation (header only). Existing files are not modified.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let root = config.data_dir()?;
        info!("opening record store at {}", root.display());
        let store = Self::with_backend(FsBackend::new(root), config.coordinate_tolerance);
        store.init()?;
        Ok(store)
    }
}

impl<B: RelationBackend> RecordStore<B> {
    pub fn with_backend(backend: B, tolerance: f64) -> Self {
        Self { backend, tolerance }
    }

    /// Make sure every relation exists.
    pub fn init(&self) -> Result<()> {
        for relation in Relation::ALL {
            self.backend.ensure(relation)?;
        }
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn integrity(&self) -> Integrity<'_, B> {
        Integrity::new(&self.backend, self.tolerance)
    }

    pub fn users(&self) -> Users<'_, B> {
        Table::new(&self.backend, self.tolerance)
    }

    pub fn restaurants(&self) -> Restaurants<'_, B> {
        Table::new(&self.backend, self.tolerance)
    }

    pub fn reviews(&self) -> Reviews<'_, B> {
        Table::new(&self.backend, self.tolerance)
    }

    pub fn favorites(&self) -> Favorites<'_, B> {
        Table::new(&self.backend, self.tolerance)
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl RecordStore<super::mem_backend::MemBackend> {
    pub fn in_memory() -> Self {
        Self::with_backend(
            super::mem_backend::MemBackend::new(),
            crate::config::DEFAULT_COORDINATE_TOLERANCE,
        )
    }
}
