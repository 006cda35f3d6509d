//! Purpose: Validate and normalize candidate blog entries.
//! Exports: `normalize`.
//! Role: The single validation gate in front of every store write.
//! Invariants: No side effects; a candidate either yields a complete
//! `EntryFields` or a `Validation` error naming the offending field.

use crate::core::entry::EntryFields;
use crate::core::error::{Error, ErrorKind};
use serde_json::{Map, Value};

/// Checks required fields and fills defaults. `likes` defaults to 0 when
/// absent; when present it must be a non-negative integer.
pub fn normalize(candidate: &Value) -> Result<EntryFields, Error> {
    let object = candidate.as_object().ok_or_else(|| {
        Error::new(ErrorKind::Validation).with_message("entry must be a JSON object")
    })?;

    let title = required_text(object, "title")?;
    let author = required_text(object, "author")?;
    let url = required_text(object, "url")?;
    let likes = match object.get("likes") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            Error::new(ErrorKind::Validation)
                .with_message("likes must be a non-negative integer")
                .with_field("likes")
        })?,
    };

    Ok(EntryFields {
        title,
        author,
        url,
        likes,
    })
}

fn required_text(object: &Map<String, Value>, field: &str) -> Result<String, Error> {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(Value::String(_)) => Err(Error::new(ErrorKind::Validation)
            .with_message(format!("{field} must not be empty"))
            .with_field(field)),
        Some(_) => Err(Error::new(ErrorKind::Validation)
            .with_message(format!("{field} must be text"))
            .with_field(field)),
        None => Err(Error::new(ErrorKind::Validation)
            .with_message(format!("{field} is required"))
            .with_field(field)),
    }
}
