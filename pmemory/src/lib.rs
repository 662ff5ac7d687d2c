//! Durable history backends for the chat core.
//!
//! Both stores implement [`pchat::HistoryPersistence`], so either can be handed to
//! `ChatCoreBuilder::persistence`.
//!
//! ```rust
//! use pcommon::SessionId;
//! use pchat::{HistorySnapshot, Record};
//! use pmemory::SqliteHistoryStore;
//! use pprovider::{Message, Role};
//!
//! let store = SqliteHistoryStore::new_in_memory().expect("open store");
//! let session = SessionId::new("mochi");
//! assert_eq!(store.load(&session).expect("load"), None);
//!
//! let snapshot = HistorySnapshot {
//!     messages: vec![Message::new(Role::User, "hello")],
//!     records: vec![Record::new("hello", "purr", "ollama")],
//! };
//! store.save(&session, snapshot.clone()).expect("save");
//! assert_eq!(store.load(&session).expect("load"), Some(snapshot));
//! ```

mod backend;
mod backends;
mod codec;
mod error;

pub mod prelude {
    pub use crate::{
        FilesystemHistoryStore, HistoryBackendConfig, MemoryError, MemoryErrorKind,
        SqliteHistoryStore, create_default_history_backend, create_history_backend,
    };
}

pub use backend::{
    DATA_DIR_ENV, FilesystemHistoryStore, HistoryBackendConfig, SQLITE_PATH_ENV,
    SqliteHistoryStore, create_default_history_backend, create_history_backend, default_data_dir,
};
pub use codec::SNAPSHOT_FORMAT_VERSION;
pub use error::{MemoryError, MemoryErrorKind};
