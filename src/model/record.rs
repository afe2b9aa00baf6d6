use serde::{Deserialize, Serialize};

use super::tag::Tag;
use super::task::{TagId, Task, TaskId};

/// Flat, store-side shape of one task.
///
/// The store has no nesting, so containment is carried by `parent_id`
/// (the parent's id as a string) and sibling position by `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub gradient_index: u8,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

impl TaskRecord {
    /// Record for a top-level task at position `order`
    pub fn top_level(task: &Task, order: usize) -> Self {
        TaskRecord {
            id: task.id,
            content: task.content.clone(),
            completed: task.completed,
            parent_id: None,
            order,
            gradient_index: task.gradient_index.unwrap_or(0),
            tags: task.tags.clone(),
        }
    }

    /// Record for a subtask of `parent_id` at position `order`.
    /// Subtasks never persist a palette index or tags.
    pub fn child(task: &Task, parent_id: TaskId, order: usize) -> Self {
        TaskRecord {
            id: task.id,
            content: task.content.clone(),
            completed: task.completed,
            parent_id: Some(parent_id.to_string()),
            order,
            gradient_index: 0,
            tags: Vec::new(),
        }
    }

    /// Rebuild the node, without children
    pub fn to_task(&self) -> Task {
        let mut task = Task::new(self.id, self.content.clone());
        task.completed = self.completed;
        if self.parent_id.is_none() {
            task.gradient_index = Some(self.gradient_index);
            task.tags = self.tags.clone();
        }
        task
    }
}

/// Flat, store-side shape of one tag. `order` keeps creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: TagId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub order: usize,
}

impl TagRecord {
    pub fn new(tag: &Tag, order: usize) -> Self {
        TagRecord {
            id: tag.id.clone(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            order,
        }
    }
}

impl From<TagRecord> for Tag {
    fn from(rec: TagRecord) -> Self {
        Tag {
            id: rec.id,
            name: rec.name,
            color: rec.color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_uses_camel_case_and_null_parent() {
        let mut task = Task::new(7, "Ship it");
        task.gradient_index = Some(3);
        task.tags = vec!["t1".into()];
        let json = serde_json::to_value(TaskRecord::top_level(&task, 2)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "content": "Ship it",
                "completed": false,
                "parentId": null,
                "order": 2,
                "gradientIndex": 3,
                "tags": ["t1"],
            })
        );
    }

    #[test]
    fn child_record_drops_tags_and_palette() {
        let mut sub = Task::new(9, "step");
        sub.tags = vec!["ignored".into()];
        sub.gradient_index = Some(4);
        let rec = TaskRecord::child(&sub, 7, 0);
        assert_eq!(rec.parent_id.as_deref(), Some("7"));
        assert_eq!(rec.gradient_index, 0);
        assert!(rec.tags.is_empty());
        assert_eq!(rec.to_task().gradient_index, None);
    }

    #[test]
    fn missing_optional_fields_default() {
        let rec: TaskRecord = serde_json::from_str(r#"{"id":1,"content":"x"}"#).unwrap();
        assert!(!rec.completed);
        assert_eq!(rec.parent_id, None);
        assert_eq!(rec.order, 0);
        assert!(rec.tags.is_empty());
    }
}
