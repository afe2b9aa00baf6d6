use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::io::lock::FileLock;
use crate::io::store::{Collections, Document, DocumentStore, StoreError, WriteBatch, documents_in};

/// A document store kept in a single JSON file.
///
/// Commits read the file, apply the batch in memory and replace the file
/// with a temp-file rename, all under an advisory lock. Readers therefore see
/// either the old contents or the new ones, never a partial batch.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with no collections if it does not exist yet
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        self.write_all(&Collections::new())
    }

    fn read_all(&self) -> Result<Collections, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Collections::new()),
            Err(e) => {
                return Err(StoreError::ReadError {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Collections::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write_all(&self, collections: &Collections) -> Result<(), StoreError> {
        let mut content = serde_json::to_string_pretty(collections)?;
        content.push('\n');
        atomic_write(&self.path, content.as_bytes()).map_err(|e| StoreError::WriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl DocumentStore for JsonFileStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(documents_in(&self.read_all()?, collection))
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let _lock = FileLock::acquire_default(&self.path)?;
        let mut collections = self.read_all()?;
        batch.apply_to(&mut collections);
        self.write_all(&collections)
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("board.json"));
        assert!(store.list("users/a/tasks").unwrap().is_empty());
    }

    #[test]
    fn commit_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.json");
        let store = JsonFileStore::new(&path);
        store.ensure_exists().unwrap();

        let mut batch = WriteBatch::new();
        batch.set("users/a/tags", "t1", &json!({"id": "t1"})).unwrap();
        store.commit(batch).unwrap();

        let reopened = JsonFileStore::new(&path);
        let docs = reopened.list("users/a/tags").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].data, json!({"id": "t1"}));
        // The lock file outlives the commit but no longer blocks anyone
        assert!(FileLock::path_for(&path).exists());
        let mut batch = WriteBatch::new();
        batch.set("users/a/tags", "t2", &json!({"id": "t2"})).unwrap();
        reopened.commit(batch).unwrap();
        assert_eq!(store.list("users/a/tags").unwrap().len(), 2);
    }

    #[test]
    fn corrupt_file_is_an_error_and_is_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.json");
        fs::write(&path, "not json {{{").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(store.list("c"), Err(StoreError::Corrupt { .. })));
        let mut batch = WriteBatch::new();
        batch.set("c", "k", &json!(1)).unwrap();
        assert!(store.commit(batch).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json {{{");
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }
}
