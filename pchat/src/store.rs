//! Turn records and history persistence contracts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use pcommon::{BoxFuture, SessionId};
use pprovider::Message;

use crate::ChatError;

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

/// One completed turn. Written once, at turn completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub request: String,
    pub response: String,
    pub timestamp: SystemTime,
    pub provider_name: String,
}

impl Record {
    pub fn new(
        request: impl Into<String>,
        response: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            timestamp: SystemTime::now(),
            provider_name: provider_name.into(),
        }
    }
}

/// Append-only; `clear_context` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends continuation text to the response of the record at `index`.
    pub(crate) fn extend_response(&mut self, index: usize, text: &str) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        if !record.response.is_empty() {
            record.response.push('\n');
        }
        record.response.push_str(text);
        true
    }

    pub(crate) fn restore(&mut self, records: Vec<Record>) {
        self.records = records;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub messages: Vec<Message>,
    pub records: Vec<Record>,
}

pub trait HistoryPersistence: Send + Sync {
    fn save_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
        snapshot: HistorySnapshot,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    /// `None` when nothing was saved for `session`.
    fn load_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
    ) -> ChatFuture<'a, Result<Option<HistorySnapshot>, ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryHistoryPersistence {
    sessions: Mutex<HashMap<SessionId, HistorySnapshot>>,
}

impl InMemoryHistoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryPersistence for InMemoryHistoryPersistence {
    fn save_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
        snapshot: HistorySnapshot,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("history store lock poisoned"))?;
            sessions.insert(session.clone(), snapshot);
            Ok(())
        })
    }

    fn load_snapshot<'a>(
        &'a self,
        session: &'a SessionId,
    ) -> ChatFuture<'a, Result<Option<HistorySnapshot>, ChatError>> {
        Box::pin(async move {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("history store lock poisoned"))?;
            Ok(sessions.get(session).cloned())
        })
    }
}
