use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pchat::{ChatError, ChatFuture, HistoryPersistence, HistorySnapshot};
use pcommon::SessionId;

use crate::codec::PersistedSnapshot;
use crate::error::MemoryError;

/// One pretty-printed JSON file per session under `<root>/sessions`.
#[derive(Debug)]
pub struct FilesystemHistoryStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemHistoryStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("sessions")).map_err(|error| {
            MemoryError::storage(format!("failed to create history store root: {error}"))
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_path(&self, session_id: &SessionId) -> PathBuf {
        self.root.join("sessions").join(format!(
            "{}.json",
            hex_encode(session_id.as_str().as_bytes())
        ))
    }

    pub fn save(
        &self,
        session_id: &SessionId,
        snapshot: HistorySnapshot,
    ) -> Result<(), MemoryError> {
        let persisted = PersistedSnapshot::from_snapshot(snapshot)?;
        let bytes = serde_json::to_vec_pretty(&persisted).map_err(|error| {
            MemoryError::storage(format!("failed to serialize history snapshot: {error}"))
        })?;

        let _guard = self
            .lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem history lock poisoned"))?;
        write_atomic(&self.session_path(session_id), &bytes)
    }

    pub fn load(&self, session_id: &SessionId) -> Result<Option<HistorySnapshot>, MemoryError> {
        let path = self.session_path(session_id);
        let bytes = {
            let _guard = self
                .lock
                .lock()
                .map_err(|_| MemoryError::storage("filesystem history lock poisoned"))?;
            if !path.exists() {
                return Ok(None);
            }
            fs::read(&path).map_err(|error| {
                MemoryError::storage(format!("failed to read history file: {error}"))
            })?
        };

        let persisted = serde_json::from_slice::<PersistedSnapshot>(&bytes).map_err(|error| {
            MemoryError::storage(format!("failed to deserialize history snapshot: {error}"))
        })?;
        persisted.into_snapshot().map(Some)
    }

    /// Returns whether a saved snapshot existed.
    pub fn remove(&self, session_id: &SessionId) -> Result<bool, MemoryError> {
        let path = self.session_path(session_id);
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem history lock poisoned"))?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|error| {
            MemoryError::storage(format!("failed to remove history file: {error}"))
        })?;
        Ok(true)
    }
}

impl HistoryPersistence for FilesystemHistoryStore {
    fn save_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
        snapshot: HistorySnapshot,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.save(session, snapshot)?) })
    }

    fn load_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
    ) -> ChatFuture<'a, Result<Option<HistorySnapshot>, ChatError>> {
        Box::pin(async move { Ok(self.load(session)?) })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let Some(parent) = path.parent() else {
        return Err(MemoryError::storage("history file missing parent directory"));
    };
    fs::create_dir_all(parent).map_err(|error| {
        MemoryError::storage(format!("failed to create parent directory: {error}"))
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|error| {
        MemoryError::storage(format!("failed to write temporary history file: {error}"))
    })?;

    if path.exists() {
        fs::remove_file(path).map_err(|error| {
            MemoryError::storage(format!("failed to replace existing history file: {error}"))
        })?;
    }
    fs::rename(&tmp, path)
        .map_err(|error| MemoryError::storage(format!("failed to finalize history file: {error}")))
}

fn hex_encode(input: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(input.len() * 2);
    for byte in input {
        output.push(DIGITS[usize::from(byte >> 4)] as char);
        output.push(DIGITS[usize::from(byte & 0x0f)] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::hex_encode;

    #[test]
    fn session_names_are_hex_encoded() {
        assert_eq!(hex_encode(b"mochi/1"), "6d6f6368692f31");
    }
}
