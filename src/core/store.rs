//! Purpose: Persist one blog collection as a single JSON file.
//! Exports: `BlogStore`.
//! Role: The concrete document store behind the HTTP handlers and CLI.
//! Invariants: The file is rewritten via temp-file-then-rename; a crash never
//! leaves a torn store.
//! Invariants: One process owns a store at a time (exclusive `.lock` sidecar).
//! Invariants: Entries keep insertion order; `list` exposes it unchanged.

use crate::core::entry::{BlogEntry, EntryFields, EntryId};
use crate::core::error::{Error, ErrorKind};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const STORE_FORMAT: &str = "bloglist/v1";

#[derive(Serialize)]
struct StoreFileRef<'a> {
    format: &'a str,
    entries: &'a [BlogEntry],
}

#[derive(Deserialize)]
struct StoreFile {
    format: String,
    entries: Vec<BlogEntry>,
}

#[derive(Debug)]
pub struct BlogStore {
    path: PathBuf,
    entries: Vec<BlogEntry>,
    // Held for the lifetime of the store; releasing it frees the collection
    // for the next process.
    _lock: File,
}

impl BlogStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| io_error("failed to create store directory", parent, err))?;
            }
        }

        let lock_path = lock_path_for(&path);
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| io_error("failed to open store lock", &lock_path, err))?;
        lock.try_lock_exclusive().map_err(|err| {
            if err.kind() == std::io::ErrorKind::WouldBlock {
                Error::new(ErrorKind::Busy)
                    .with_message("store is locked by another process")
                    .with_path(&path)
                    .with_hint("Stop the other bloglist process or point --store elsewhere.")
            } else {
                io_error("failed to lock store", &lock_path, err)
            }
        })?;

        let entries = match std::fs::read(&path) {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes).map_err(|err| {
                    Error::new(ErrorKind::Corrupt)
                        .with_message("store file is not a valid bloglist document")
                        .with_path(&path)
                        .with_source(err)
                })?;
                if file.format != STORE_FORMAT {
                    return Err(Error::new(ErrorKind::Corrupt)
                        .with_message(format!("unsupported store format: {}", file.format))
                        .with_path(&path));
                }
                file.entries
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(io_error("failed to read store file", &path, err)),
        };

        Ok(Self {
            path,
            entries,
            _lock: lock,
        })
    }

    pub fn list(&self) -> &[BlogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assigns a fresh id and appends the entry.
    pub fn insert(&mut self, fields: EntryFields) -> Result<BlogEntry, Error> {
        let mut id = EntryId::generate()?;
        while self.entries.iter().any(|entry| entry.id == id) {
            id = EntryId::generate()?;
        }
        let entry = BlogEntry {
            id,
            title: fields.title,
            author: fields.author,
            url: fields.url,
            likes: fields.likes,
        };
        self.entries.push(entry.clone());
        if let Err(err) = self.persist() {
            self.entries.pop();
            return Err(err);
        }
        Ok(entry)
    }

    /// Full replace: every field except the id is taken from `fields`.
    /// Returns `None` when no entry has this id.
    pub fn replace(&mut self, id: EntryId, fields: EntryFields) -> Result<Option<BlogEntry>, Error> {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return Ok(None);
        };
        let previous = self.entries[index].clone();
        let slot = &mut self.entries[index];
        slot.title = fields.title;
        slot.author = fields.author;
        slot.url = fields.url;
        slot.likes = fields.likes;
        let updated = slot.clone();
        if let Err(err) = self.persist() {
            self.entries[index] = previous;
            return Err(err);
        }
        Ok(Some(updated))
    }

    /// Idempotent: reports whether an entry was actually removed.
    pub fn remove(&mut self, id: EntryId) -> Result<bool, Error> {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return Ok(false);
        };
        let removed = self.entries.remove(index);
        if let Err(err) = self.persist() {
            self.entries.insert(index, removed);
            return Err(err);
        }
        Ok(true)
    }

    fn persist(&self) -> Result<(), Error> {
        let payload = StoreFileRef {
            format: STORE_FORMAT,
            entries: &self.entries,
        };
        let bytes = serde_json::to_vec_pretty(&payload).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode store file")
                .with_source(err)
        })?;

        let temp_path = temp_path_for(&self.path);
        let mut file = File::create(&temp_path)
            .map_err(|err| io_error("failed to create store temp file", &temp_path, err))?;
        file.write_all(&bytes)
            .map_err(|err| io_error("failed to write store temp file", &temp_path, err))?;
        file.sync_all()
            .map_err(|err| io_error("failed to sync store temp file", &temp_path, err))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|err| io_error("failed to replace store file", &self.path, err))
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".lock")
}

fn temp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn io_error(message: &str, path: &Path, err: std::io::Error) -> Error {
    let kind = match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    };
    Error::new(kind)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::BlogStore;
    use crate::core::entry::EntryFields;
    use crate::core::error::ErrorKind;

    fn fields(title: &str, likes: u64) -> EntryFields {
        EntryFields {
            title: title.to_string(),
            author: "Edsger W. Dijkstra".to_string(),
            url: "http://example.com".to_string(),
            likes,
        }
    }

    #[test]
    fn insert_persists_across_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("entries.json");

        let inserted = {
            let mut store = BlogStore::open(&path).expect("open");
            assert!(store.is_empty());
            store
                .insert(fields("Canonical string reduction", 12))
                .expect("insert")
        };

        let store = BlogStore::open(&path).expect("reopen");
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0], inserted);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = BlogStore::open(temp.path().join("entries.json")).expect("open");
        for title in ["first", "second", "third"] {
            store.insert(fields(title, 0)).expect("insert");
        }
        let titles: Vec<_> = store.list().iter().map(|entry| entry.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn replace_updates_fields_and_keeps_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = BlogStore::open(temp.path().join("entries.json")).expect("open");
        let entry = store.insert(fields("original", 12)).expect("insert");

        let updated = store
            .replace(entry.id, fields("original", 22))
            .expect("replace")
            .expect("present");
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.title, "original");
        assert_eq!(updated.likes, 22);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_missing_id_returns_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = BlogStore::open(temp.path().join("entries.json")).expect("open");
        let absent = "5d5be4ac80c3ff0f749c9fdf".parse().expect("id");
        let result = store.replace(absent, fields("anything", 0)).expect("replace");
        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = BlogStore::open(temp.path().join("entries.json")).expect("open");
        let entry = store.insert(fields("to delete", 0)).expect("insert");

        assert!(store.remove(entry.id).expect("remove"));
        assert!(!store.remove(entry.id).expect("second remove"));
        assert!(store.is_empty());
    }

    #[test]
    fn second_open_is_busy() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("entries.json");
        let _store = BlogStore::open(&path).expect("open");

        let err = BlogStore::open(&path).expect_err("locked");
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("entries.json");
        std::fs::write(&path, b"not json at all").expect("write");

        let err = BlogStore::open(&path).expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("entries.json");
        std::fs::write(&path, br#"{"format":"bloglist/v9","entries":[]}"#).expect("write");

        let err = BlogStore::open(&path).expect_err("format");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
