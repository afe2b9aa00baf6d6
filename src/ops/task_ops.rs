//! Tree mutation engine.
//!
//! Every operation takes the current tree by reference and returns a new
//! tree. Only the sibling lists on the path from the root to the changed node
//! are copied; every other node is shared with the input. Addressing is
//! explicit: `parent_id == None` targets a top-level task, `Some(p)` targets a
//! subtask of `p`. An address that matches nothing yields an unchanged tree.

use std::str::FromStr;
use std::sync::Arc;

use crate::model::task::{TagId, Task, TaskId, TaskTree};
use crate::ops::ids::IdAllocator;

/// Number of presentation palettes cycled through by top-level tasks
pub const GRADIENT_COUNT: u8 = 5;

/// Reorder direction within a sibling list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("invalid direction: {} (expected up or down)", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Append a new top-level task. Returns the new tree and the assigned id.
pub fn add_top_level_task(
    tree: &TaskTree,
    ids: &mut IdAllocator,
    content: &str,
    tags: &[TagId],
) -> (TaskTree, TaskId) {
    let id = ids.allocate();
    let mut task = Task::new(id, content);
    task.gradient_index = Some((tree.len() % GRADIENT_COUNT as usize) as u8);
    task.tags = dedup_tags(tags);

    let mut tasks = tree.tasks_cloned();
    tasks.push(Arc::new(task));
    (TaskTree::from_shared(tasks), id)
}

/// Add a subtask under `parent_id`.
///
/// With `insert_after`, the subtask goes right after that sibling, or at the
/// end when the sibling is not found. Without it, the subtask is prepended.
/// A missing parent leaves the tree unchanged and allocates no id.
pub fn add_subtask(
    tree: &TaskTree,
    ids: &mut IdAllocator,
    parent_id: TaskId,
    content: &str,
    insert_after: Option<TaskId>,
) -> (TaskTree, Option<TaskId>) {
    if tree.find_top_level(parent_id).is_none() {
        return (tree.clone(), None);
    }
    let id = ids.allocate();
    let subtask = Arc::new(Task::new(id, content));

    let new_tree = edit_siblings(tree, Some(parent_id), |siblings| {
        let pos = match insert_after {
            None => 0,
            Some(after) => siblings
                .iter()
                .position(|t| t.id == after)
                .map_or(siblings.len(), |i| i + 1),
        };
        siblings.insert(pos, subtask);
        true
    });
    (new_tree, Some(id))
}

// ---------------------------------------------------------------------------
// Edit / delete / toggle
// ---------------------------------------------------------------------------

/// Replace the content of the addressed task
pub fn edit_content(
    tree: &TaskTree,
    id: TaskId,
    new_content: &str,
    parent_id: Option<TaskId>,
) -> TaskTree {
    edit_node(tree, id, parent_id, |task| {
        if task.content == new_content {
            return false;
        }
        task.content = new_content.to_string();
        true
    })
}

/// Remove the addressed task. A top-level task takes its subtasks with it.
pub fn delete_task(tree: &TaskTree, id: TaskId, parent_id: Option<TaskId>) -> TaskTree {
    edit_siblings(tree, parent_id, |siblings| {
        match siblings.iter().position(|t| t.id == id) {
            Some(idx) => {
                siblings.remove(idx);
                true
            }
            None => false,
        }
    })
}

/// Flip `completed` on the addressed task only. Subtasks keep their own flags.
pub fn toggle_completion(tree: &TaskTree, id: TaskId, parent_id: Option<TaskId>) -> TaskTree {
    edit_node(tree, id, parent_id, |task| {
        task.completed = !task.completed;
        true
    })
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

/// Swap the addressed task with its neighbour in `direction`.
/// The first task cannot move up and the last cannot move down.
pub fn reorder(
    tree: &TaskTree,
    id: TaskId,
    direction: Direction,
    parent_id: Option<TaskId>,
) -> TaskTree {
    edit_siblings(tree, parent_id, |siblings| {
        let Some(idx) = siblings.iter().position(|t| t.id == id) else {
            return false;
        };
        let target = match direction {
            Direction::Up if idx > 0 => idx - 1,
            Direction::Down if idx + 1 < siblings.len() => idx + 1,
            _ => return false,
        };
        siblings.swap(idx, target);
        true
    })
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Replace a top-level task's tag set. Duplicates keep their first position.
pub fn update_tags(tree: &TaskTree, id: TaskId, tags: &[TagId]) -> TaskTree {
    let tags = dedup_tags(tags);
    edit_node(tree, id, None, |task| {
        if task.tags == tags {
            return false;
        }
        task.tags = tags;
        true
    })
}

/// Remove the given tag ids from every task in the tree.
/// Tasks that carry none of them are shared, not copied.
pub fn strip_tags(tree: &TaskTree, removed: &[TagId]) -> TaskTree {
    if removed.is_empty() {
        return tree.clone();
    }
    let carries = |task: &Task| task.tags.iter().any(|t| removed.contains(t));

    let mut changed = false;
    let mut tasks = tree.tasks_cloned();
    for slot in tasks.iter_mut() {
        if carries(slot) {
            Arc::make_mut(slot).tags.retain(|t| !removed.contains(t));
            changed = true;
        }
        if slot.subtasks.iter().any(|s| carries(s)) {
            let parent = Arc::make_mut(slot);
            for sub in parent.subtasks.iter_mut() {
                if carries(sub) {
                    Arc::make_mut(sub).tags.retain(|t| !removed.contains(t));
                }
            }
            changed = true;
        }
    }

    if changed {
        TaskTree::from_shared(tasks)
    } else {
        tree.clone()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `f` on a copy of the addressed sibling list. When `f` reports a
/// change, the copy is spliced into a new tree; otherwise the input is
/// returned as-is.
fn edit_siblings<F>(tree: &TaskTree, parent_id: Option<TaskId>, f: F) -> TaskTree
where
    F: FnOnce(&mut Vec<Arc<Task>>) -> bool,
{
    let mut tasks = tree.tasks_cloned();
    let changed = match parent_id {
        None => f(&mut tasks),
        Some(pid) => match tasks.iter().position(|t| t.id == pid) {
            Some(idx) => {
                let mut subtasks = tasks[idx].subtasks.clone();
                if f(&mut subtasks) {
                    Arc::make_mut(&mut tasks[idx]).subtasks = subtasks;
                    true
                } else {
                    false
                }
            }
            None => false,
        },
    };

    if changed {
        TaskTree::from_shared(tasks)
    } else {
        tree.clone()
    }
}

/// Run `f` on a copy of the addressed node
fn edit_node<F>(tree: &TaskTree, id: TaskId, parent_id: Option<TaskId>, f: F) -> TaskTree
where
    F: FnOnce(&mut Task) -> bool,
{
    edit_siblings(tree, parent_id, |siblings| {
        match siblings.iter().position(|t| t.id == id) {
            Some(idx) => {
                let mut node = Task::clone(&siblings[idx]);
                if f(&mut node) {
                    siblings[idx] = Arc::new(node);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    })
}

fn dedup_tags(tags: &[TagId]) -> Vec<TagId> {
    let mut out: Vec<TagId> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
