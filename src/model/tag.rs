use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::task::TagId;

/// Swatches offered when creating a tag. The first is the default.
pub const TAG_PALETTE: [&str; 8] = [
    "#3B82F6", // blue
    "#10B981", // green
    "#F59E0B", // yellow
    "#EF4444", // red
    "#8B5CF6", // purple
    "#EC4899", // pink
    "#6366F1", // indigo
    "#F97316", // orange
];

/// A user-defined label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
}

/// The set of tags, kept in creation order.
///
/// The registry knows nothing about tasks: removing a tag from the tasks
/// that carry it is a separate pass (`ops::task_ops::strip_tags`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRegistry {
    tags: IndexMap<TagId, Tag>,
}

impl TagRegistry {
    pub fn new() -> Self {
        TagRegistry::default()
    }

    /// Create a tag under a freshly generated id and return a copy of it.
    /// `color` falls back to the first palette swatch.
    pub fn create(&mut self, id: TagId, name: &str, color: Option<&str>) -> Tag {
        let tag = Tag {
            id: id.clone(),
            name: name.trim().to_string(),
            color: color.unwrap_or(TAG_PALETTE[0]).to_string(),
        };
        self.tags.insert(id, tag.clone());
        tag
    }

    /// Insert an existing tag (e.g. one read back from the store).
    /// Replaces any tag with the same id in place.
    pub fn insert(&mut self, tag: Tag) {
        self.tags.insert(tag.id.clone(), tag);
    }

    /// Remove every listed tag. Unknown ids are ignored.
    /// Returns the tags that were actually removed.
    pub fn delete_many(&mut self, ids: &[TagId]) -> Vec<Tag> {
        ids.iter()
            .filter_map(|id| self.tags.shift_remove(id))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Tag> {
        self.tags.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tags.contains_key(id)
    }

    /// Find a tag by exact display name
    pub fn find_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<Tag> for TagRegistry {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut registry = TagRegistry::new();
        for tag in iter {
            registry.insert(tag);
        }
        registry
    }
}
