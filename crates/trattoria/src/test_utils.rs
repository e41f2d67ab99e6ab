use crate::config::StoreConfig;
use crate::store::fs_backend::FsBackend;
use crate::store::RecordStore;
use std::path::PathBuf;
use tempfile::TempDir;

/// A store opened on a fresh temporary data directory.
pub struct TestEnv {
    // Deleted on drop, taking the data directory with it.
    pub _temp_dir: TempDir,
    pub store: RecordStore<FsBackend>,
    pub config: StoreConfig,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let config = StoreConfig::with_data_dir(&data_dir);
        let store = RecordStore::open(&config).expect("failed to open store");
        Self {
            _temp_dir: temp_dir,
            store,
            config,
            data_dir,
        }
    }
}
