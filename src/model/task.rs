use std::collections::HashSet;
use std::sync::Arc;

/// Task identifier. Allocated once, never reused.
pub type TaskId = u64;

/// Largest id a stored record may carry (the signed 64-bit range document
/// stores keep exactly). Records above it are dropped on load, so an
/// allocator seeded from loaded ids always has room to count upward.
pub const MAX_TASK_ID: TaskId = i64::MAX as TaskId;

/// Tag identifier (opaque string)
pub type TagId = String;

/// A node in the task tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    /// Task text (never empty once it reaches the tree)
    pub content: String,
    pub completed: bool,
    /// Ordered subtasks. Always empty for a subtask.
    pub subtasks: Vec<Arc<Task>>,
    /// Presentation palette index for top-level tasks
    pub gradient_index: Option<u8>,
    /// Tag ids in assignment order (top-level tasks only)
    pub tags: Vec<TagId>,
}

impl Task {
    /// Create a new, incomplete task with no subtasks or tags
    pub fn new(id: TaskId, content: impl Into<String>) -> Self {
        Task {
            id,
            content: content.into(),
            completed: false,
            subtasks: Vec::new(),
            gradient_index: None,
            tags: Vec::new(),
        }
    }

    /// Replace the subtasks (builder style)
    pub fn with_subtasks(mut self, subtasks: Vec<Task>) -> Self {
        self.subtasks = subtasks.into_iter().map(Arc::new).collect();
        self
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t == tag_id)
    }

    pub fn find_subtask(&self, id: TaskId) -> Option<&Task> {
        self.subtasks.iter().find(|s| s.id == id).map(|s| s.as_ref())
    }
}

/// Error type for tree invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("subtask {id} has its own subtasks (maximum depth is 1)")]
    TooDeep { id: TaskId },
}

/// One entry of a flattened tree: the task and its parent's id, if any
#[derive(Debug, Clone, Copy)]
pub struct FlatEntry<'a> {
    pub task: &'a Task,
    pub parent_id: Option<TaskId>,
    /// Position within the containing sibling list
    pub order: usize,
}

/// The ordered two-level tree of tasks.
///
/// Nodes are shared through `Arc`, so cloning a tree is cheap and a tree
/// derived by a mutation shares every untouched node with its source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTree {
    tasks: Vec<Arc<Task>>,
}

impl TaskTree {
    pub fn new() -> Self {
        TaskTree::default()
    }

    /// Build a tree from owned top-level tasks
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskTree {
            tasks: tasks.into_iter().map(Arc::new).collect(),
        }
    }

    pub(crate) fn from_shared(tasks: Vec<Arc<Task>>) -> Self {
        TaskTree { tasks }
    }

    /// Top-level tasks in order
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub(crate) fn tasks_cloned(&self) -> Vec<Arc<Task>> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn find_top_level(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id).map(|t| t.as_ref())
    }

    pub fn find_subtask(&self, parent_id: TaskId, id: TaskId) -> Option<&Task> {
        self.find_top_level(parent_id)?.find_subtask(id)
    }

    /// Look up a task by explicit address: `parent_id` absent means top level.
    pub fn find(&self, id: TaskId, parent_id: Option<TaskId>) -> Option<&Task> {
        match parent_id {
            None => self.find_top_level(id),
            Some(p) => self.find_subtask(p, id),
        }
    }

    /// Every task in pre-order, each paired with its parent id and sibling position.
    pub fn all_content(&self) -> Vec<FlatEntry<'_>> {
        let mut out = Vec::new();
        for (i, task) in self.tasks.iter().enumerate() {
            out.push(FlatEntry {
                task,
                parent_id: None,
                order: i,
            });
            for (j, sub) in task.subtasks.iter().enumerate() {
                out.push(FlatEntry {
                    task: sub,
                    parent_id: Some(task.id),
                    order: j,
                });
            }
        }
        out
    }

    /// Total number of tasks, subtasks included
    pub fn count_all(&self) -> usize {
        self.tasks.iter().map(|t| 1 + t.subtasks.len()).sum()
    }

    /// Largest id anywhere in the tree
    pub fn max_id(&self) -> Option<TaskId> {
        self.all_content().iter().map(|e| e.task.id).max()
    }

    /// True when both trees hold the very same top-level nodes, i.e. one
    /// was derived from the other by a mutation that changed nothing.
    pub fn shares_all_nodes(&self, other: &TaskTree) -> bool {
        self.tasks.len() == other.tasks.len()
            && self
                .tasks
                .iter()
                .zip(&other.tasks)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }

    /// Verify the structural invariants: unique ids, depth at most 1.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        for entry in self.all_content() {
            if !seen.insert(entry.task.id) {
                return Err(TreeError::DuplicateId(entry.task.id));
            }
            if entry.parent_id.is_some() && !entry.task.subtasks.is_empty() {
                return Err(TreeError::TooDeep { id: entry.task.id });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> TaskTree {
        let mut parent = Task::new(1, "Plan trip");
        parent.subtasks = vec![
            Arc::new(Task::new(2, "Book flights")),
            Arc::new(Task::new(3, "Book hotel")),
        ];
        TaskTree::from_tasks(vec![parent, Task::new(4, "Water plants")])
    }

    #[test]
    fn find_by_address() {
        let tree = sample_tree();
        assert_eq!(tree.find_top_level(4).unwrap().content, "Water plants");
        assert!(tree.find_top_level(2).is_none());
        assert_eq!(tree.find_subtask(1, 3).unwrap().content, "Book hotel");
        assert!(tree.find_subtask(4, 3).is_none());
        assert!(tree.find(2, None).is_none());
        assert!(tree.find(2, Some(1)).is_some());
    }

    #[test]
    fn all_content_is_preorder_with_parents() {
        let tree = sample_tree();
        let flat: Vec<(TaskId, Option<TaskId>, usize)> = tree
            .all_content()
            .iter()
            .map(|e| (e.task.id, e.parent_id, e.order))
            .collect();
        assert_eq!(
            flat,
            vec![(1, None, 0), (2, Some(1), 0), (3, Some(1), 1), (4, None, 1)]
        );
        assert_eq!(tree.count_all(), 4);
        assert_eq!(tree.max_id(), Some(4));
    }

    #[test]
    fn clones_share_nodes_but_rebuilt_trees_do_not() {
        let tree = sample_tree();
        assert!(tree.shares_all_nodes(&tree.clone()));
        assert!(!tree.shares_all_nodes(&sample_tree()));
        assert!(!tree.shares_all_nodes(&TaskTree::new()));
    }

    #[test]
    fn invariants_hold_for_valid_tree() {
        assert_eq!(sample_tree().check_invariants(), Ok(()));
        assert_eq!(TaskTree::new().check_invariants(), Ok(()));
    }

    #[test]
    fn invariants_catch_duplicate_ids() {
        let mut parent = Task::new(1, "a");
        parent.subtasks = vec![Arc::new(Task::new(1, "b"))];
        let tree = TaskTree::from_tasks(vec![parent]);
        assert_eq!(tree.check_invariants(), Err(TreeError::DuplicateId(1)));
    }

    #[test]
    fn invariants_catch_nesting_past_depth_one() {
        let mut sub = Task::new(2, "sub");
        sub.subtasks = vec![Arc::new(Task::new(3, "too deep"))];
        let mut parent = Task::new(1, "parent");
        parent.subtasks = vec![Arc::new(sub)];
        let tree = TaskTree::from_tasks(vec![parent]);
        assert_eq!(tree.check_invariants(), Err(TreeError::TooDeep { id: 2 }));
    }
}
