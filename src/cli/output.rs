use serde::Serialize;

use crate::model::tag::{Tag, TagRegistry};
use crate::model::task::{Task, TaskId};
use crate::ops::view::{self, Projection};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: TaskId,
    pub content: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient_index: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub active: Vec<TaskJson>,
    pub completed: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TagJson {
    pub id: String,
    pub name: String,
    pub color: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task, tags: &TagRegistry) -> TaskJson {
    TaskJson {
        id: task.id,
        content: task.content.clone(),
        completed: task.completed,
        gradient_index: task.gradient_index,
        tags: task.tags.iter().map(|id| tag_label(id, tags)).collect(),
        subtasks: task.subtasks.iter().map(|s| task_to_json(s, tags)).collect(),
    }
}

pub fn listing_to_json(projection: &Projection<'_>, tags: &TagRegistry) -> ListJson {
    ListJson {
        active: projection.active.iter().map(|t| task_to_json(t, tags)).collect(),
        completed: projection.completed.iter().map(|t| task_to_json(t, tags)).collect(),
    }
}

pub fn tag_to_json(tag: &Tag) -> TagJson {
    TagJson {
        id: tag.id.clone(),
        name: tag.name.clone(),
        color: tag.color.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Tag name for display; falls back to the id for a tag no longer registered
fn tag_label(id: &str, tags: &TagRegistry) -> String {
    tags.get(id).map_or_else(|| id.to_string(), |t| t.name.clone())
}

fn check_char(completed: bool) -> char {
    if completed { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task, tags: &TagRegistry) -> String {
    let tags_str = if task.tags.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            task.tags
                .iter()
                .map(|t| format!("#{}", tag_label(t, tags)))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    format!(
        "[{}] {} {}{}",
        check_char(task.completed),
        task.id,
        task.content,
        tags_str
    )
}

/// Format a top-level task with its subtasks indented below it,
/// active subtasks first. Subtasks that accept no actions are marked `-`
/// when not themselves done.
pub fn format_task_tree(task: &Task, tags: &TagRegistry) -> Vec<String> {
    let mut lines = vec![format_task_line(task, tags)];
    let (active, completed) = view::split_subtasks(task);
    for sub in active.into_iter().chain(completed) {
        let mark = if sub.completed {
            'x'
        } else if view::is_actionable(sub, task) {
            ' '
        } else {
            '-'
        };
        lines.push(format!("    [{}] {} {}", mark, sub.id, sub.content));
    }
    lines
}

/// Format a whole listing: active tasks, then a completed section
pub fn format_listing(projection: &Projection<'_>, tags: &TagRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    for task in &projection.active {
        lines.extend(format_task_tree(task, tags));
    }
    if !projection.completed.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Completed ({})", projection.completed.len()));
        for task in &projection.completed {
            lines.extend(format_task_tree(task, tags));
        }
    }
    if lines.is_empty() {
        lines.push("No tasks.".to_string());
    }
    lines
}

pub fn format_tag_line(tag: &Tag) -> String {
    format!("{}  {}  {}", tag.id, tag.color, tag.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskTree;
    use crate::ops::view::{TagFilter, project};

    fn sample() -> (TaskTree, TagRegistry) {
        let mut tags = TagRegistry::new();
        tags.create("t1".into(), "travel", None);

        let mut trip = Task::new(100, "Plan trip");
        trip.tags = vec!["t1".into(), "gone".into()];
        let mut booked = Task::new(102, "Book hotel");
        booked.completed = true;
        let trip = trip.with_subtasks(vec![booked, Task::new(101, "Book flights")]);

        let mut done = Task::new(200, "Renew passport");
        done.completed = true;
        let done = done.with_subtasks(vec![Task::new(201, "Take photo")]);

        (
            TaskTree::from_tasks(vec![trip, Task::new(300, "Water plants"), done]),
            tags,
        )
    }

    #[test]
    fn listing_text() {
        let (tree, tags) = sample();
        let lines = format_listing(&project(&tree, &TagFilter::new()), &tags);
        insta::assert_snapshot!(lines.join("\n"), @r"
        [ ] 100 Plan trip #travel #gone
            [ ] 101 Book flights
            [x] 102 Book hotel
        [ ] 300 Water plants

        Completed (1)
        [x] 200 Renew passport
            [-] 201 Take photo
        ");
    }

    #[test]
    fn empty_listing() {
        let lines = format_listing(&project(&TaskTree::new(), &TagFilter::new()), &TagRegistry::new());
        assert_eq!(lines, vec!["No tasks."]);
    }

    #[test]
    fn listing_json_nests_subtasks_and_names_tags() {
        let (tree, tags) = sample();
        let filter = TagFilter::from_ids(["t1".to_string()]);
        let json = serde_json::to_value(listing_to_json(&project(&tree, &filter), &tags)).unwrap();
        assert_eq!(json["active"].as_array().unwrap().len(), 1);
        assert_eq!(json["active"][0]["tags"], serde_json::json!(["travel", "gone"]));
        assert_eq!(json["active"][0]["subtasks"][0]["content"], "Book hotel");
        assert!(json["completed"].as_array().unwrap().is_empty());
    }
}
