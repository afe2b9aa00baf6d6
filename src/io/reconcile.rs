//! Persistence reconciler: maps the two-level tree onto flat store records
//! and back.
//!
//! Saves are full rewrites: every existing record of the user is deleted and
//! the current state is written, all in one batch. Loads are two-pass: every
//! record is read and grouped first, and children are attached to their
//! parents only afterwards, because the store returns records in no
//! particular parent/child order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::io::store::{Document, DocumentStore, StoreError, WriteBatch};
use crate::model::record::{TagRecord, TaskRecord};
use crate::model::tag::{Tag, TagRegistry};
use crate::model::task::{MAX_TASK_ID, TaskTree};

/// Error type for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("save failed for user {user}: {source}")]
    SaveFailed {
        user: String,
        #[source]
        source: StoreError,
    },
    #[error("load failed for user {user}: {source}")]
    LoadFailed {
        user: String,
        #[source]
        source: StoreError,
    },
    #[error("record {key} in {collection} could not be decoded: {source}")]
    CorruptRecord {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything persisted for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub tree: TaskTree,
    pub tags: TagRegistry,
}

pub fn tasks_collection(user_id: &str) -> String {
    format!("users/{}/tasks", user_id)
}

pub fn tags_collection(user_id: &str) -> String {
    format!("users/{}/tags", user_id)
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Flatten a tree into records: top-level tasks with `parent_id: None` and
/// their position, each followed by its subtasks with the parent id and
/// their position among siblings.
pub fn flatten(tree: &TaskTree) -> Vec<TaskRecord> {
    tree.all_content()
        .into_iter()
        .map(|entry| match entry.parent_id {
            None => TaskRecord::top_level(entry.task, entry.order),
            Some(parent) => TaskRecord::child(entry.task, parent, entry.order),
        })
        .collect()
}

/// Replace everything stored for `user_id` with `tree` and `tags`, in a
/// single atomic batch. On failure the store keeps its previous contents.
pub fn save(
    store: &dyn DocumentStore,
    user_id: &str,
    tree: &TaskTree,
    tags: &TagRegistry,
) -> Result<(), PersistError> {
    let failed = |source| PersistError::SaveFailed {
        user: user_id.to_string(),
        source,
    };
    let tasks_col = tasks_collection(user_id);
    let tags_col = tags_collection(user_id);

    // Cleared inside the commit, so records another writer added since our
    // load are dropped too
    let mut batch = WriteBatch::new();
    batch.clear(&tasks_col);
    batch.clear(&tags_col);

    let records = flatten(tree);
    for record in &records {
        batch
            .set(&tasks_col, &record.id.to_string(), record)
            .map_err(failed)?;
    }
    for (order, tag) in tags.iter().enumerate() {
        batch
            .set(&tags_col, &tag.id, &TagRecord::new(tag, order))
            .map_err(failed)?;
    }

    tracing::debug!(
        user = user_id,
        tasks = records.len(),
        tags = tags.len(),
        ops = batch.len(),
        "committing full rewrite"
    );
    store.commit(batch).map_err(failed)
}

/// `save` for a whole snapshot
pub fn save_snapshot(
    store: &dyn DocumentStore,
    user_id: &str,
    snapshot: &Snapshot,
) -> Result<(), PersistError> {
    save(store, user_id, &snapshot.tree, &snapshot.tags)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read back everything stored for `user_id`.
pub fn load(store: &dyn DocumentStore, user_id: &str) -> Result<(TaskTree, TagRegistry), PersistError> {
    let failed = |source| PersistError::LoadFailed {
        user: user_id.to_string(),
        source,
    };
    let tasks_col = tasks_collection(user_id);
    let tags_col = tags_collection(user_id);

    let task_docs = store.list_ordered(&tasks_col, "order").map_err(failed)?;
    let tag_docs = store.list_ordered(&tags_col, "order").map_err(failed)?;

    let records: Vec<TaskRecord> = decode_all(&tasks_col, task_docs)?;
    let tag_records: Vec<TagRecord> = decode_all(&tags_col, tag_docs)?;

    let tree = rebuild_tree(records);
    let tags: TagRegistry = tag_records.into_iter().map(Tag::from).collect();
    tracing::debug!(
        user = user_id,
        tasks = tree.count_all(),
        tags = tags.len(),
        "loaded"
    );
    Ok((tree, tags))
}

/// `load` into a snapshot
pub fn load_snapshot(store: &dyn DocumentStore, user_id: &str) -> Result<Snapshot, PersistError> {
    let (tree, tags) = load(store, user_id)?;
    Ok(Snapshot { tree, tags })
}

/// Reconstruct the tree from flat records in two passes.
///
/// Pass one sorts records into top-level tasks and child groups keyed by
/// parent id. Pass two attaches each group, sorted by `order`, to its
/// parent. Records that cannot be placed are dropped with a warning:
/// children of a missing or non-top-level parent, repeated ids, and ids
/// above `MAX_TASK_ID`.
pub fn rebuild_tree(mut records: Vec<TaskRecord>) -> TaskTree {
    records.sort_by_key(|r| r.order);

    let mut seen = HashSet::new();
    let mut tops: Vec<TaskRecord> = Vec::new();
    let mut children: HashMap<String, Vec<TaskRecord>> = HashMap::new();

    for record in records {
        if record.id > MAX_TASK_ID {
            tracing::warn!(id = record.id, "dropping record with out-of-range id");
            continue;
        }
        match record.parent_id.clone() {
            None => {
                if seen.insert(record.id) {
                    tops.push(record);
                } else {
                    tracing::warn!(id = record.id, "dropping duplicate top-level record");
                }
            }
            Some(parent) => children.entry(parent).or_default().push(record),
        }
    }

    let mut tasks = Vec::with_capacity(tops.len());
    for record in &tops {
        let mut task = record.to_task();
        if let Some(mut group) = children.remove(&record.id.to_string()) {
            group.sort_by_key(|r| r.order);
            for child in group {
                if seen.insert(child.id) {
                    task.subtasks.push(Arc::new(child.to_task()));
                } else {
                    tracing::warn!(id = child.id, parent = record.id, "dropping duplicate child record");
                }
            }
        }
        tasks.push(task);
    }

    for (parent, orphans) in &children {
        tracing::warn!(
            parent = parent.as_str(),
            count = orphans.len(),
            "dropping orphaned child records"
        );
    }

    TaskTree::from_tasks(tasks)
}

fn decode_all<T: DeserializeOwned>(
    collection: &str,
    docs: Vec<Document>,
) -> Result<Vec<T>, PersistError> {
    docs.into_iter()
        .map(|doc| {
            serde_json::from_value(doc.data).map_err(|e| PersistError::CorruptRecord {
                collection: collection.to_string(),
                key: doc.key,
                source: e,
            })
        })
        .collect()
}
