//! Serialized forms of history messages and turn records.
//!
//! Timestamps are stored as whole seconds plus nanoseconds since the unix
//! epoch so a restored [`Message`] compares equal to the saved one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pchat::{HistorySnapshot, Record};
use pprovider::{ImagePayload, Message, Role};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Bumped whenever the on-disk snapshot layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedSnapshot {
    pub version: u32,
    pub messages: Vec<PersistedMessage>,
    #[serde(default)]
    pub records: Vec<PersistedRecord>,
}

impl PersistedSnapshot {
    pub fn from_snapshot(snapshot: HistorySnapshot) -> Result<Self, MemoryError> {
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            messages: snapshot
                .messages
                .into_iter()
                .map(PersistedMessage::from_message)
                .collect::<Result<Vec<_>, _>>()?,
            records: snapshot
                .records
                .into_iter()
                .map(PersistedRecord::from_record)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn into_snapshot(self) -> Result<HistorySnapshot, MemoryError> {
        if self.version > SNAPSHOT_FORMAT_VERSION {
            return Err(MemoryError::storage(format!(
                "snapshot format version {} is newer than supported version {}",
                self.version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(HistorySnapshot {
            messages: self
                .messages
                .into_iter()
                .map(PersistedMessage::into_message)
                .collect::<Result<Vec<_>, _>>()?,
            records: self
                .records
                .into_iter()
                .map(PersistedRecord::into_record)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedImage {
    pub media_type: String,
    pub data_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PersistedImage>,
    pub created_at_secs: i64,
    pub created_at_nanos: i64,
}

impl PersistedMessage {
    pub fn from_message(message: Message) -> Result<Self, MemoryError> {
        let (created_at_secs, created_at_nanos) = encode_system_time(message.timestamp)?;
        Ok(Self {
            role: message.role.as_str().to_string(),
            image: message.image.map(|image| PersistedImage {
                data_base64: image.to_base64(),
                media_type: image.media_type,
            }),
            content: message.content,
            created_at_secs,
            created_at_nanos,
        })
    }

    pub fn into_message(self) -> Result<Message, MemoryError> {
        let mut message = Message::at(
            role_from_str(&self.role)?,
            self.content,
            decode_system_time(self.created_at_secs, self.created_at_nanos)?,
        );
        if let Some(image) = self.image {
            message.image = Some(decode_image(image.media_type, &image.data_base64)?);
        }
        Ok(message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedRecord {
    pub request: String,
    pub response: String,
    pub provider_name: String,
    pub created_at_secs: i64,
    pub created_at_nanos: i64,
}

impl PersistedRecord {
    pub fn from_record(record: Record) -> Result<Self, MemoryError> {
        let (created_at_secs, created_at_nanos) = encode_system_time(record.timestamp)?;
        Ok(Self {
            request: record.request,
            response: record.response,
            provider_name: record.provider_name,
            created_at_secs,
            created_at_nanos,
        })
    }

    pub fn into_record(self) -> Result<Record, MemoryError> {
        Ok(Record {
            request: self.request,
            response: self.response,
            provider_name: self.provider_name,
            timestamp: decode_system_time(self.created_at_secs, self.created_at_nanos)?,
        })
    }
}

pub(crate) fn decode_image(media_type: String, encoded: &str) -> Result<ImagePayload, MemoryError> {
    ImagePayload::from_base64(media_type, encoded).map_err(|error| {
        MemoryError::storage(format!("stored image is corrupt: {}", error.message))
    })
}

pub(crate) fn role_from_str(value: &str) -> Result<Role, MemoryError> {
    Role::parse(value)
        .ok_or_else(|| MemoryError::storage(format!("unknown history role value '{value}'")))
}

pub(crate) fn encode_system_time(value: SystemTime) -> Result<(i64, i64), MemoryError> {
    let duration = value.duration_since(UNIX_EPOCH).map_err(|error| {
        MemoryError::invalid_request(format!("timestamp predates unix epoch: {error}"))
    })?;
    let secs = i64::try_from(duration.as_secs())
        .map_err(|_| MemoryError::invalid_request("timestamp is too far in the future"))?;
    Ok((secs, i64::from(duration.subsec_nanos())))
}

pub(crate) fn decode_system_time(seconds: i64, nanos: i64) -> Result<SystemTime, MemoryError> {
    if seconds < 0 {
        return Err(MemoryError::storage(format!(
            "timestamp seconds must be non-negative, got {seconds}"
        )));
    }
    if !(0..1_000_000_000).contains(&nanos) {
        return Err(MemoryError::storage(format!(
            "timestamp nanos must be in [0, 1_000_000_000), got {nanos}"
        )));
    }
    Ok(UNIX_EPOCH + Duration::new(seconds as u64, nanos as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_keep_nanosecond_precision() {
        let at = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let (secs, nanos) = encode_system_time(at).expect("encode");
        assert_eq!((secs, nanos), (1_700_000_000, 123_456_789));
        assert_eq!(decode_system_time(secs, nanos).expect("decode"), at);
    }

    #[test]
    fn corrupt_timestamps_and_roles_are_rejected() {
        assert!(decode_system_time(-1, 0).is_err());
        assert!(decode_system_time(0, 1_000_000_000).is_err());
        assert!(role_from_str("tool").is_err());
    }

    #[test]
    fn newer_snapshot_versions_are_refused() {
        let persisted = PersistedSnapshot {
            version: SNAPSHOT_FORMAT_VERSION + 1,
            messages: Vec::new(),
            records: Vec::new(),
        };
        let error = persisted.into_snapshot().expect_err("future version");
        assert!(error.message.contains("newer than supported"));
    }
}
