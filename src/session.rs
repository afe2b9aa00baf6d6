//! One user's working session: the single writer of their tree and tags.
//!
//! A session exists only after a successful load, so nothing can be
//! mutated (and then saved over) before the stored state has been seen.
//! Every mutation that changes state schedules a background save of the
//! whole snapshot.

use std::sync::Arc;

use crate::io::reconcile::{self, PersistError, Snapshot};
use crate::io::saver::Saver;
use crate::io::store::DocumentStore;
use crate::model::tag::{Tag, TagRegistry};
use crate::model::task::{TagId, TaskId, TaskTree};
use crate::ops::ids::{IdAllocator, TagIdGenerator};
use crate::ops::task_ops::{self, Direction};
use crate::ops::view::{self, Projection, TagFilter};

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("task content cannot be empty")]
    EmptyContent,
    #[error("tag name cannot be empty")]
    EmptyTagName,
    #[error("unknown tag: {0}")]
    UnknownTag(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub struct Session {
    user_id: String,
    tree: TaskTree,
    tags: TagRegistry,
    filter: TagFilter,
    ids: IdAllocator,
    tag_ids: TagIdGenerator,
    saver: Saver,
}

impl Session {
    /// Load the user's state and start their background saver.
    pub fn open(store: Arc<dyn DocumentStore>, user_id: &str) -> Result<Self, SessionError> {
        let (tree, tags) = reconcile::load(store.as_ref(), user_id)?;
        let mut ids = IdAllocator::new();
        if let Some(max) = tree.max_id() {
            ids.observe(max);
        }
        tracing::debug!(user = user_id, tasks = tree.count_all(), "session opened");
        Ok(Session {
            user_id: user_id.to_string(),
            tree,
            tags,
            filter: TagFilter::new(),
            ids,
            tag_ids: TagIdGenerator::new(),
            saver: Saver::spawn(store, user_id),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }

    /// The filtered, completion-split view of the tree
    pub fn view(&self) -> Projection<'_> {
        view::project(&self.tree, &self.filter)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn add_task(&mut self, content: &str, tags: &[TagId]) -> Result<TaskId, SessionError> {
        let content = non_empty(content)?;
        self.check_tags(tags)?;
        let (next, id) = task_ops::add_top_level_task(&self.tree, &mut self.ids, content, tags);
        self.apply(next);
        Ok(id)
    }

    /// Returns `None` when the parent does not exist.
    pub fn add_subtask(
        &mut self,
        parent_id: TaskId,
        content: &str,
        insert_after: Option<TaskId>,
    ) -> Result<Option<TaskId>, SessionError> {
        let content = non_empty(content)?;
        let (next, id) =
            task_ops::add_subtask(&self.tree, &mut self.ids, parent_id, content, insert_after);
        self.apply(next);
        Ok(id)
    }

    /// Returns whether anything changed.
    pub fn edit(
        &mut self,
        id: TaskId,
        content: &str,
        parent_id: Option<TaskId>,
    ) -> Result<bool, SessionError> {
        let content = non_empty(content)?;
        let next = task_ops::edit_content(&self.tree, id, content, parent_id);
        Ok(self.apply(next))
    }

    pub fn delete(&mut self, id: TaskId, parent_id: Option<TaskId>) -> bool {
        let next = task_ops::delete_task(&self.tree, id, parent_id);
        self.apply(next)
    }

    pub fn toggle(&mut self, id: TaskId, parent_id: Option<TaskId>) -> bool {
        let next = task_ops::toggle_completion(&self.tree, id, parent_id);
        self.apply(next)
    }

    pub fn reorder(&mut self, id: TaskId, direction: Direction, parent_id: Option<TaskId>) -> bool {
        let next = task_ops::reorder(&self.tree, id, direction, parent_id);
        self.apply(next)
    }

    /// Replace a top-level task's tags. Every id must name an existing tag.
    pub fn retag(&mut self, id: TaskId, tags: &[TagId]) -> Result<bool, SessionError> {
        self.check_tags(tags)?;
        let next = task_ops::update_tags(&self.tree, id, tags);
        Ok(self.apply(next))
    }

    // -----------------------------------------------------------------------
    // Tags and filter
    // -----------------------------------------------------------------------

    pub fn create_tag(&mut self, name: &str, color: Option<&str>) -> Result<Tag, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyTagName);
        }
        let mut id = self.tag_ids.generate();
        while self.tags.contains(&id) {
            id = self.tag_ids.generate();
        }
        let tag = self.tags.create(id, name, color);
        self.schedule_save();
        Ok(tag)
    }

    /// Delete tags from the registry, every task and the filter, with a
    /// single save. Returns the tags that existed.
    pub fn delete_tags(&mut self, ids: &[TagId]) -> Vec<Tag> {
        let removed = self.tags.delete_many(ids);
        let removed_ids: Vec<TagId> = removed.iter().map(|t| t.id.clone()).collect();
        self.filter.remove_all(&removed_ids);
        self.tree = task_ops::strip_tags(&self.tree, &removed_ids);
        if !removed.is_empty() {
            self.schedule_save();
        }
        removed
    }

    pub fn toggle_filter(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.tags.contains(id) && !self.filter.selected().iter().any(|t| t == id) {
            return Err(SessionError::UnknownTag(id.to_string()));
        }
        self.filter.toggle(id);
        Ok(())
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
    }

    /// Wait for pending saves; reports the latest save failure.
    pub fn flush(&self) -> Result<(), SessionError> {
        Ok(self.saver.flush()?)
    }

    fn check_tags(&self, tags: &[TagId]) -> Result<(), SessionError> {
        match tags.iter().find(|t| !self.tags.contains(t)) {
            Some(unknown) => Err(SessionError::UnknownTag(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Install `next` if it differs from the current tree and schedule a save.
    fn apply(&mut self, next: TaskTree) -> bool {
        if next.shares_all_nodes(&self.tree) {
            return false;
        }
        self.tree = next;
        self.schedule_save();
        true
    }

    fn schedule_save(&self) {
        self.saver.schedule(Snapshot {
            tree: self.tree.clone(),
            tags: self.tags.clone(),
        });
    }
}

fn non_empty(content: &str) -> Result<&str, SessionError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(SessionError::EmptyContent)
    } else {
        Ok(trimmed)
    }
}
