use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use taskai::io::file_store::JsonFileStore;
use taskai::io::reconcile::{self, tasks_collection};
use taskai::io::store::{DocumentStore, WriteBatch};
use taskai::model::tag::TagRegistry;
use taskai::model::task::{Task, TaskTree};
use taskai::ops::ids::IdAllocator;
use taskai::ops::task_ops::{self, Direction};
use taskai::session::Session;
use tempfile::TempDir;

fn frozen_clock() -> u64 {
    1_000
}

/// Two top-level tasks: the first with two subtasks (one done), the second with none.
fn sample_tree() -> TaskTree {
    let mut ids = IdAllocator::with_clock(frozen_clock);
    let tree = TaskTree::new();
    let (tree, first) = task_ops::add_top_level_task(&tree, &mut ids, "Launch blog", &[]);
    let (tree, second) = task_ops::add_top_level_task(&tree, &mut ids, "Renew insurance", &[]);
    let (tree, a) = task_ops::add_subtask(&tree, &mut ids, first, "Pick a theme", None);
    let (tree, _) = task_ops::add_subtask(&tree, &mut ids, first, "Write first post", a);
    let tree = task_ops::toggle_completion(&tree, a.unwrap(), Some(first));
    task_ops::toggle_completion(&tree, second, None)
}

/// (content, completed) for every task in pre-order, with the parent's content
fn shape(tree: &TaskTree) -> Vec<(String, bool, Option<String>)> {
    tree.all_content()
        .iter()
        .map(|e| {
            let parent = e
                .parent_id
                .and_then(|p| tree.find_top_level(p))
                .map(|p| p.content.clone());
            (e.task.content.clone(), e.task.completed, parent)
        })
        .collect()
}

#[test]
fn save_and_load_through_json_file() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileStore::new(tmp.path().join("board.json"));
    let tree = sample_tree();

    reconcile::save(&store, "ana", &tree, &TagRegistry::new()).unwrap();

    // A fresh handle reads only what reached the file
    let reopened = JsonFileStore::new(tmp.path().join("board.json"));
    let (loaded, tags) = reconcile::load(&reopened, "ana").unwrap();
    assert!(tags.is_empty());
    assert_eq!(loaded, tree);
    assert_eq!(
        shape(&loaded),
        vec![
            ("Launch blog".to_string(), false, None),
            ("Pick a theme".to_string(), true, Some("Launch blog".to_string())),
            ("Write first post".to_string(), false, Some("Launch blog".to_string())),
            ("Renew insurance".to_string(), true, None),
        ]
    );
}

#[test]
fn reordered_tree_round_trips_in_new_order() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileStore::new(tmp.path().join("board.json"));
    let tree = sample_tree();
    let second = tree.tasks()[1].id;
    let tree = task_ops::reorder(&tree, second, Direction::Up, None);

    reconcile::save(&store, "ana", &tree, &TagRegistry::new()).unwrap();
    let (loaded, _) = reconcile::load(&store, "ana").unwrap();
    let order: Vec<&str> = loaded.tasks().iter().map(|t| t.content.as_str()).collect();
    assert_eq!(order, vec!["Renew insurance", "Launch blog"]);
}

#[test]
fn hand_edited_file_with_orphans_still_loads() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("board.json");
    fs::write(
        &path,
        r#"{
  "users/ana/tasks": {
    "5": {"id": 5, "content": "child first", "parentId": "1", "order": 0},
    "1": {"id": 1, "content": "parent", "parentId": null, "order": 0},
    "9": {"id": 9, "content": "lost", "parentId": "77", "order": 0}
  }
}
"#,
    )
    .unwrap();
    let store = JsonFileStore::new(&path);
    let (tree, _) = reconcile::load(&store, "ana").unwrap();
    let expected = TaskTree::from_tasks(vec![{
        let mut parent = Task::new(1, "parent").with_subtasks(vec![Task::new(5, "child first")]);
        parent.gradient_index = Some(0);
        parent
    }]);
    assert_eq!(tree, expected);
}

#[test]
fn session_saves_reach_the_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("board.json");
    let store = Arc::new(JsonFileStore::new(&path));

    let mut session = Session::open(store.clone(), "ana").unwrap();
    let tag = session.create_tag("home", None).unwrap();
    let id = session.add_task("Fix sink", &[tag.id.clone()]).unwrap();
    session.flush().unwrap();
    drop(session);

    let docs = store.list(&tasks_collection("ana")).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].key, id.to_string());
    assert_eq!(docs[0].data["tags"], serde_json::json!([tag.id]));

    // Other users' collections are untouched by a full rewrite
    let mut batch = WriteBatch::new();
    batch
        .set(&tasks_collection("bo"), "1", &serde_json::json!({"id": 1, "content": "bo's"}))
        .unwrap();
    store.commit(batch).unwrap();
    let mut session = Session::open(store.clone(), "ana").unwrap();
    session.delete(id, None);
    session.flush().unwrap();
    assert!(store.list(&tasks_collection("ana")).unwrap().is_empty());
    assert_eq!(store.list(&tasks_collection("bo")).unwrap().len(), 1);
}
