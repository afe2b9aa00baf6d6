use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::io::lock::LockError;

/// collection path -> document key -> document body
pub type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// A stored document: its key within the collection and its JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Value,
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Set {
        collection: String,
        key: String,
        data: Value,
    },
    Delete {
        collection: String,
        key: String,
    },
    /// Remove every document in the collection as it stands at commit time
    Clear { collection: String },
}

/// A group of deletes and writes that a store commits all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Queue a write of `data` under `collection/key`
    pub fn set<T: Serialize>(
        &mut self,
        collection: &str,
        key: &str,
        data: &T,
    ) -> Result<(), StoreError> {
        self.ops.push(BatchOp::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            data: serde_json::to_value(data)?,
        });
        Ok(())
    }

    /// Queue a delete of `collection/key`
    pub fn delete(&mut self, collection: &str, key: &str) {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
    }

    /// Queue removal of every document in `collection`. The store resolves
    /// the contents when the batch commits, not when it is built.
    pub fn clear(&mut self, collection: &str) {
        self.ops.push(BatchOp::Clear {
            collection: collection.to_string(),
        });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every op, in order, to an in-memory copy of the store
    pub fn apply_to(self, collections: &mut Collections) {
        for op in self.ops {
            match op {
                BatchOp::Set {
                    collection,
                    key,
                    data,
                } => {
                    collections.entry(collection).or_default().insert(key, data);
                }
                BatchOp::Delete { collection, key } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&key);
                        if docs.is_empty() {
                            collections.remove(&collection);
                        }
                    }
                }
                BatchOp::Clear { collection } => {
                    collections.remove(&collection);
                }
            }
        }
    }
}

/// A collection-oriented document store: no nesting, no native order,
/// and no transactions beyond single-batch atomicity.
pub trait DocumentStore: Send + Sync {
    /// All documents in a collection, in no particular order
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Commit a batch atomically: either every op lands or none does
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// All documents in a collection, ascending by a numeric field.
    /// Documents missing the field sort last.
    fn list_ordered(&self, collection: &str, field: &str) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.list(collection)?;
        docs.sort_by_key(|d| d.data.get(field).and_then(Value::as_u64).unwrap_or(u64::MAX));
        Ok(docs)
    }
}

pub(crate) fn documents_in(collections: &Collections, collection: &str) -> Vec<Document> {
    collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(key, data)| Document {
                    key: key.clone(),
                    data: data.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: Collections,
    fail_next: usize,
    commits: usize,
}

/// Process-local store. Batches are applied to a copy and swapped in,
/// so a failed commit leaves the previous contents visible.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Reject the next `n` commits with `StoreError::Rejected`
    pub fn fail_next_commits(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    /// Copy of everything currently stored
    pub fn snapshot(&self) -> Collections {
        self.lock().collections.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(documents_in(&self.lock().collections, collection))
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(StoreError::Rejected("injected failure".to_string()));
        }
        let mut next = state.collections.clone();
        batch.apply_to(&mut next);
        state.collections = next;
        state.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_set_and_delete_apply_in_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("c", "a", &json!({"n": 1})).unwrap();
        batch.set("c", "b", &json!({"n": 2})).unwrap();
        batch.delete("c", "a");
        assert_eq!(batch.len(), 3);
        store.commit(batch).unwrap();

        let docs = store.list("c").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "b");
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn failed_commit_leaves_previous_contents() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("c", "keep", &json!({"v": true})).unwrap();
        store.commit(batch).unwrap();

        store.fail_next_commits(1);
        let mut batch = WriteBatch::new();
        batch.delete("c", "keep");
        batch.set("c", "new", &json!({"v": false})).unwrap();
        assert!(matches!(store.commit(batch), Err(StoreError::Rejected(_))));

        let docs = store.list("c").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "keep");
    }

    #[test]
    fn list_ordered_sorts_by_numeric_field() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("c", "x", &json!({"order": 2})).unwrap();
        batch.set("c", "y", &json!({"order": 0})).unwrap();
        batch.set("c", "z", &json!({})).unwrap();
        batch.set("c", "w", &json!({"order": 1})).unwrap();
        store.commit(batch).unwrap();

        let keys: Vec<String> = store
            .list_ordered("c", "order")
            .unwrap()
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec!["y", "w", "x", "z"]);
    }

    #[test]
    fn clear_removes_documents_written_after_the_batch_was_built() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.clear("c");
        batch.set("c", "mine", &json!(1)).unwrap();

        let mut other = WriteBatch::new();
        other.set("c", "theirs", &json!(2)).unwrap();
        other.set("d", "untouched", &json!(3)).unwrap();
        store.commit(other).unwrap();
        store.commit(batch).unwrap();

        let keys: Vec<String> = store.list("c").unwrap().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["mine"]);
        assert_eq!(store.list("d").unwrap().len(), 1);
    }

    #[test]
    fn deleting_last_document_drops_collection() {
        let mut collections = Collections::new();
        let mut batch = WriteBatch::new();
        batch.set("c", "a", &json!(1)).unwrap();
        batch.delete("c", "a");
        batch.delete("missing", "a");
        batch.apply_to(&mut collections);
        assert!(collections.is_empty());
    }
}
