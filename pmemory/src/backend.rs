//! Backend selection and default storage locations.

use std::path::PathBuf;
use std::sync::Arc;

use pchat::{HistoryPersistence, InMemoryHistoryPersistence};

use crate::backends::sqlite::default_sqlite_path;
use crate::error::MemoryError;

pub use crate::backends::filesystem::FilesystemHistoryStore;
pub use crate::backends::sqlite::{SQLITE_PATH_ENV, SqliteHistoryStore};

pub const DATA_DIR_ENV: &str = "PETCHAT_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryBackendConfig {
    Filesystem { root: PathBuf },
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for HistoryBackendConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

impl HistoryBackendConfig {
    /// Filesystem backend rooted at [`default_data_dir`].
    pub fn default_filesystem() -> Self {
        Self::Filesystem {
            root: default_data_dir(),
        }
    }
}

pub fn create_history_backend(
    config: HistoryBackendConfig,
) -> Result<Arc<dyn HistoryPersistence>, MemoryError> {
    match config {
        HistoryBackendConfig::Filesystem { root } => {
            Ok(Arc::new(FilesystemHistoryStore::new(root)?))
        }
        HistoryBackendConfig::Sqlite { path } => Ok(Arc::new(SqliteHistoryStore::new(path)?)),
        HistoryBackendConfig::InMemory => Ok(Arc::new(InMemoryHistoryPersistence::new())),
    }
}

pub fn create_default_history_backend() -> Result<Arc<dyn HistoryPersistence>, MemoryError> {
    create_history_backend(HistoryBackendConfig::default())
}

/// `$PETCHAT_DATA_DIR`, else `~/.petchat`, else `./.petchat`.
pub fn default_data_dir() -> PathBuf {
    if let Some(explicit) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".petchat");
    }

    PathBuf::from(".petchat")
}
