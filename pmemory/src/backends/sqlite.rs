use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pchat::{ChatError, ChatFuture, HistoryPersistence, HistorySnapshot, Record};
use pcommon::SessionId;
use pprovider::Message;
use rusqlite::{Connection, OptionalExtension, params};

use crate::codec::{decode_image, decode_system_time, encode_system_time, role_from_str};
use crate::error::MemoryError;

pub const SQLITE_PATH_ENV: &str = "PETCHAT_SQLITE_PATH";

/// Stores each session as ordered `messages` and `records` rows.
///
/// Saving replaces a session's rows inside one transaction, so a reader never
/// sees a half-written history.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    connection: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                MemoryError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            MemoryError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::with_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, MemoryError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            MemoryError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, MemoryError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                MemoryError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.connection
            .lock()
            .map_err(|_| MemoryError::storage("sqlite history lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                saved_at_secs INTEGER NOT NULL,
                saved_at_nanos INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                session_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                image_media_type TEXT,
                image_base64 TEXT,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                PRIMARY KEY (session_id, position)
            );

            CREATE TABLE IF NOT EXISTS records (
                session_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                request TEXT NOT NULL,
                response TEXT NOT NULL,
                provider_name TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                PRIMARY KEY (session_id, position)
            );
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    pub fn save(
        &self,
        session_id: &SessionId,
        snapshot: HistorySnapshot,
    ) -> Result<(), MemoryError> {
        let (saved_secs, saved_nanos) = encode_system_time(std::time::SystemTime::now())?;
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(|error| {
            MemoryError::storage(format!("failed to begin sqlite transaction: {error}"))
        })?;

        delete_session_rows(&tx, session_id)?;
        tx.execute(
            "INSERT INTO sessions (session_id, saved_at_secs, saved_at_nanos) VALUES (?1, ?2, ?3)",
            params![session_id.as_str(), saved_secs, saved_nanos],
        )
        .map_err(|error| MemoryError::storage(format!("failed to insert session row: {error}")))?;

        for (position, message) in snapshot.messages.into_iter().enumerate() {
            insert_message(&tx, session_id, position, message)?;
        }
        for (position, record) in snapshot.records.into_iter().enumerate() {
            insert_record(&tx, session_id, position, record)?;
        }

        tx.commit().map_err(|error| {
            MemoryError::storage(format!("failed to commit history snapshot: {error}"))
        })
    }

    pub fn load(&self, session_id: &SessionId) -> Result<Option<HistorySnapshot>, MemoryError> {
        let conn = self.connection()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE session_id = ?1 LIMIT 1",
                params![session_id.as_str()],
                |_| Ok(true),
            )
            .optional()
            .map_err(|error| MemoryError::storage(format!("failed to look up session: {error}")))?
            .unwrap_or(false);
        if !exists {
            return Ok(None);
        }

        Ok(Some(HistorySnapshot {
            messages: load_messages(&conn, session_id)?,
            records: load_records(&conn, session_id)?,
        }))
    }

    /// Returns whether a saved snapshot existed.
    pub fn remove(&self, session_id: &SessionId) -> Result<bool, MemoryError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(|error| {
            MemoryError::storage(format!("failed to begin sqlite transaction: {error}"))
        })?;
        let removed = delete_session_rows(&tx, session_id)?;
        tx.commit().map_err(|error| {
            MemoryError::storage(format!("failed to commit session removal: {error}"))
        })?;
        Ok(removed)
    }
}

impl HistoryPersistence for SqliteHistoryStore {
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

fn delete_session_rows(conn: &Connection, session_id: &SessionId) -> Result<bool, MemoryError> {
    for table in ["messages", "records"] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE session_id = ?1"),
            params![session_id.as_str()],
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to clear {table} rows: {error}"))
        })?;
    }

    let removed = conn
        .execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id.as_str()],
        )
        .map_err(|error| MemoryError::storage(format!("failed to clear session row: {error}")))?;
    Ok(removed > 0)
}

fn insert_message(
    conn: &Connection,
    session_id: &SessionId,
    position: usize,
    message: Message,
) -> Result<(), MemoryError> {
    let (secs, nanos) = encode_system_time(message.timestamp)?;
    let (media_type, encoded) = match &message.image {
        Some(image) => (Some(image.media_type.as_str()), Some(image.to_base64())),
        None => (None, None),
    };

    conn.execute(
        "
        INSERT INTO messages (
            session_id,
            position,
            role,
            content,
            image_media_type,
            image_base64,
            created_at_secs,
            created_at_nanos
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
        params![
            session_id.as_str(),
            position as i64,
            message.role.as_str(),
            &message.content,
            media_type,
            encoded,
            secs,
            nanos,
        ],
    )
    .map_err(|error| MemoryError::storage(format!("failed to insert history message: {error}")))?;
    Ok(())
}

fn insert_record(
    conn: &Connection,
    session_id: &SessionId,
    position: usize,
    record: Record,
) -> Result<(), MemoryError> {
    let (secs, nanos) = encode_system_time(record.timestamp)?;
    conn.execute(
        "
        INSERT INTO records (
            session_id,
            position,
            request,
            response,
            provider_name,
            created_at_secs,
            created_at_nanos
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            session_id.as_str(),
            position as i64,
            &record.request,
            &record.response,
            &record.provider_name,
            secs,
            nanos,
        ],
    )
    .map_err(|error| MemoryError::storage(format!("failed to insert turn record: {error}")))?;
    Ok(())
}

type MessageRow = (String, String, Option<String>, Option<String>, i64, i64);

fn load_messages(conn: &Connection, session_id: &SessionId) -> Result<Vec<Message>, MemoryError> {
    let mut statement = conn
        .prepare(
            "
            SELECT role, content, image_media_type, image_base64, created_at_secs, created_at_nanos
            FROM messages
            WHERE session_id = ?1
            ORDER BY position ASC
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to prepare message query: {error}"))
        })?;

    let rows = statement
        .query_map(params![session_id.as_str()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .map_err(|error| MemoryError::storage(format!("failed to query messages: {error}")))?;

    let mut messages = Vec::new();
    for row in rows {
        let (role, content, media_type, encoded, secs, nanos): MessageRow = row
            .map_err(|error| MemoryError::storage(format!("failed to read message row: {error}")))?;
        let mut message = Message::at(
            role_from_str(&role)?,
            content,
            decode_system_time(secs, nanos)?,
        );
        match (media_type, encoded) {
            (Some(media_type), Some(encoded)) => {
                message.image = Some(decode_image(media_type, &encoded)?);
            }
            (None, None) => {}
            _ => {
                return Err(MemoryError::storage(
                    "message image must include both media type and data",
                ));
            }
        }
        messages.push(message);
    }
    Ok(messages)
}

fn load_records(conn: &Connection, session_id: &SessionId) -> Result<Vec<Record>, MemoryError> {
    let mut statement = conn
        .prepare(
            "
            SELECT request, response, provider_name, created_at_secs, created_at_nanos
            FROM records
            WHERE session_id = ?1
            ORDER BY position ASC
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to prepare record query: {error}"))
        })?;

    let rows = statement
        .query_map(params![session_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })
        .map_err(|error| MemoryError::storage(format!("failed to query records: {error}")))?;

    let mut records = Vec::new();
    for row in rows {
        let (request, response, provider_name, secs, nanos) = row
            .map_err(|error| MemoryError::storage(format!("failed to read record row: {error}")))?;
        records.push(Record {
            request,
            response,
            provider_name,
            timestamp: decode_system_time(secs, nanos)?,
        });
    }
    Ok(records)
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os(SQLITE_PATH_ENV) {
        return PathBuf::from(explicit);
    }

    crate::backend::default_data_dir().join("history.sqlite3")
}
