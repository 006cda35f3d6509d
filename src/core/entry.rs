//! Purpose: Define the blog entry record and its store-assigned identifier.
//! Exports: `EntryId`, `BlogEntry`, `EntryFields`.
//! Role: Shared data model for the store, the HTTP surface, and the CLI.
//! Invariants: Ids render as 24 lowercase hex characters and never change once assigned.
//! Invariants: Ids serialize as plain text under the field name `id` everywhere.

use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

const ENTRY_ID_LEN: usize = 12;
const ENTRY_ID_HEX_LEN: usize = 2 * ENTRY_ID_LEN;

/// Opaque store-assigned identifier: a 4-byte unix-seconds prefix plus
/// 8 random bytes, rendered as 24 hex characters.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EntryId([u8; ENTRY_ID_LEN]);

impl EntryId {
    pub fn generate() -> Result<Self, Error> {
        let mut bytes = [0u8; ENTRY_ID_LEN];
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        bytes[..4].copy_from_slice(&(seconds as u32).to_be_bytes());
        getrandom::fill(&mut bytes[4..]).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("failed to gather id randomness: {err}"))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for EntryId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        let raw = value.as_bytes();
        if raw.len() != ENTRY_ID_HEX_LEN {
            return Err(malformed_id(value));
        }
        let mut bytes = [0u8; ENTRY_ID_LEN];
        for (slot, pair) in bytes.iter_mut().zip(raw.chunks_exact(2)) {
            let hi = hex_value(pair[0]).ok_or_else(|| malformed_id(value))?;
            let lo = hex_value(pair[1]).ok_or_else(|| malformed_id(value))?;
            *slot = hi << 4 | lo;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn malformed_id(value: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("malformed entry id: {value}"))
        .with_hint("Use the 24-character hex id shown by list output.")
}

/// One stored blog record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlogEntry {
    pub id: EntryId,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: u64,
}

/// The id-less field set produced by validation and consumed by the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryFields {
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: u64,
}

#[cfg(test)]
mod tests {
    use super::{BlogEntry, EntryId};

    #[test]
    fn generated_id_roundtrips_through_text() {
        let id = EntryId::generate().expect("generate");
        let text = id.to_string();
        assert_eq!(text.len(), 24);
        assert!(text.bytes().all(|byte| byte.is_ascii_hexdigit()));
        assert_eq!(text.parse::<EntryId>().expect("parse"), id);
    }

    #[test]
    fn uppercase_hex_parses_to_same_id() {
        let id: EntryId = "5d5be4ac80c3ff0f749c9fdf".parse().expect("parse");
        let upper: EntryId = "5D5BE4AC80C3FF0F749C9FDF".parse().expect("parse");
        assert_eq!(id, upper);
        assert_eq!(id.to_string(), "5d5be4ac80c3ff0f749c9fdf");
    }

    #[test]
    fn malformed_ids_are_usage_errors() {
        for raw in ["asdf", "", "5d5be4ac80c3ff0f749c9fdf0987sdf8907", "zz5be4ac80c3ff0f749c9fdf"] {
            let err = raw.parse::<EntryId>().expect_err("must reject");
            assert_eq!(err.kind(), crate::core::error::ErrorKind::Usage);
        }
    }

    #[test]
    fn entry_serializes_id_as_plain_text() {
        let entry = BlogEntry {
            id: "5d5be4ac80c3ff0f749c9fdf".parse().expect("parse"),
            title: "Canonical string reduction".to_string(),
            author: "Edsger W. Dijkstra".to_string(),
            url: "http://example.com/csr".to_string(),
            likes: 12,
        };
        let value = serde_json::to_value(&entry).expect("encode");
        assert_eq!(value["id"], "5d5be4ac80c3ff0f749c9fdf");
        assert_eq!(value["likes"], 12);

        let decoded: BlogEntry = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded, entry);
    }
}
