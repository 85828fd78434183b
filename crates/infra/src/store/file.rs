//! File-backed versioned store.
//!
//! Each key is one JSON document `<dir>/<key>.json` holding the revision and
//! the value. Writes go to a temp file in the same directory and are renamed
//! into place, so readers never observe a half-written document.
//!
//! Compare-and-swap holds an exclusive OS lock on `<dir>/<key>.lock` from the
//! revision read to the rename. Every store instance on the directory, in
//! this process or another, takes the same lock.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use fd_lock::RwLock as FileLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockledger_core::ExpectedVersion;

use super::r#trait::{check_revision, KeyValueStore, StoreError, Versioned};

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    revision: u64,
    value: JsonValue,
}

/// Directory of JSON documents, one per key.
#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_file(&self, key: &str) -> Result<FileLock<fs::File>, StoreError> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{key}.lock")))?;
        Ok(FileLock::new(file))
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn read_document(path: &Path) -> Result<Option<Document>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        Ok(Some(doc))
    }

    fn write_document(&self, path: &Path, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::now_v7()));

        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        let path = self.path_for(key)?;
        Ok(Self::read_document(&path)?.map(|doc| Versioned {
            revision: doc.revision,
            value: doc.value,
        }))
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let path = self.path_for(key)?;
        let mut lock = self.lock_file(key)?;
        let _guard = lock.write()?;

        let current = Self::read_document(&path)?
            .map(|doc| doc.revision)
            .unwrap_or(0);
        check_revision(key, expected, current)?;

        let revision = current + 1;
        self.write_document(&path, &Document { revision, value })?;
        Ok(revision)
    }
}
