//! Read-only projections of the task tree for presentation.

use std::sync::Arc;

use crate::model::task::{TagId, Task, TaskTree};

/// The tags currently selected as a filter. Empty means "show everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    selected: Vec<TagId>,
}

impl TagFilter {
    pub fn new() -> Self {
        TagFilter::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = TagId>) -> Self {
        let mut filter = TagFilter::new();
        for id in ids {
            if !filter.selected.contains(&id) {
                filter.selected.push(id);
            }
        }
        filter
    }

    /// Add the tag if absent, remove it if present
    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.selected.iter().position(|t| t == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
    }

    /// Drop the given ids from the selection
    pub fn remove_all(&mut self, ids: &[TagId]) {
        self.selected.retain(|t| !ids.contains(t));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> &[TagId] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether a task passes: empty filter, or any shared tag
    pub fn matches(&self, task: &Task) -> bool {
        self.selected.is_empty() || self.selected.iter().any(|id| task.has_tag(id))
    }
}

/// Filtered top-level tasks split by completion, original order preserved
#[derive(Debug, Clone, Default)]
pub struct Projection<'a> {
    pub active: Vec<&'a Arc<Task>>,
    pub completed: Vec<&'a Arc<Task>>,
}

impl Projection<'_> {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }
}

/// Filter top-level tasks by tag and partition them into active/completed.
pub fn project<'a>(tree: &'a TaskTree, filter: &TagFilter) -> Projection<'a> {
    let (completed, active) = tree
        .tasks()
        .iter()
        .filter(|t| filter.matches(t))
        .partition(|t| t.completed);
    Projection { active, completed }
}

/// Partition a task's subtasks into (active, completed), order preserved
pub fn split_subtasks(task: &Task) -> (Vec<&Arc<Task>>, Vec<&Arc<Task>>) {
    task.subtasks.iter().partition(|s| !s.completed)
}

/// A subtask accepts actions only while neither it nor its parent is completed.
pub fn is_actionable(subtask: &Task, parent: &Task) -> bool {
    !subtask.completed && !parent.completed
}
