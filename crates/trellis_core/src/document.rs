//! Document-side record builders
//!
//! The diff stage describes nodes with separate style and custom (ext) maps;
//! [`DocumentNode`] turns them into records through the style filter, and
//! [`ListenerOps`] coalesces listener changes made during a layout pass.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::mutation::{CreateNode, ListenerUpdate, Tag, UpdateNode};
use crate::props::StyleFilter;
use crate::value::PropMap;

/// View name of text containers; their children render as spans
pub const TEXT_VIEW_NAME: &str = "Text";

/// View name of inline image spans
pub const IMAGE_VIEW_NAME: &str = "Image";

/// A document node as seen by the diff stage
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentNode {
    pub tag: Tag,
    pub parent_tag: Tag,
    pub index: i32,
    pub view_name: String,
    pub style: PropMap,
    pub ext: PropMap,
    pub parent_view_name: Option<String>,
}

impl DocumentNode {
    pub fn new(tag: Tag, parent_tag: Tag, index: i32, view_name: impl Into<String>) -> Self {
        Self {
            tag,
            parent_tag,
            index,
            view_name: view_name.into(),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: PropMap) -> Self {
        self.style = style;
        self
    }

    pub fn with_ext(mut self, ext: PropMap) -> Self {
        self.ext = ext;
        self
    }

    pub fn with_parent_view(mut self, view_name: impl Into<String>) -> Self {
        self.parent_view_name = Some(view_name.into());
        self
    }

    pub fn is_parent_text(&self) -> bool {
        self.parent_view_name.as_deref() == Some(TEXT_VIEW_NAME)
    }

    pub fn to_create(&self, filter: &StyleFilter) -> CreateNode {
        CreateNode {
            tag: self.tag,
            parent_tag: self.parent_tag,
            index: self.index,
            view_name: self.view_name.clone(),
            props: filter.merge(&self.style, &self.ext),
            is_parent_text: self.is_parent_text(),
        }
    }

    /// Update record for a style diff; custom props are always resent
    pub fn to_update(
        &self,
        filter: &StyleFilter,
        diff_style: &PropMap,
        deleted: &[String],
    ) -> UpdateNode {
        UpdateNode {
            tag: self.tag,
            parent_tag: self.parent_tag,
            index: self.index,
            view_name: self.view_name.clone(),
            diff_props: filter.merge(diff_style, &self.ext),
            deleted_props: deleted
                .iter()
                .filter(|key| filter.allows(key))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ListenerOp {
    add: bool,
    name: String,
}

/// Listener changes accumulated between layout passes
#[derive(Debug, Default)]
pub struct ListenerOps {
    ops: BTreeMap<Tag, Vec<ListenerOp>>,
}

impl ListenerOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, tag: Tag, name: impl Into<String>) {
        self.push(tag, true, name.into());
    }

    pub fn remove_listener(&mut self, tag: Tag, name: impl Into<String>) {
        self.push(tag, false, name.into());
    }

    fn push(&mut self, tag: Tag, add: bool, name: String) {
        self.ops.entry(tag).or_default().push(ListenerOp { add, name });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// One update per live tag, last op per event name wins
    ///
    /// Ops for tags that `is_alive` rejects are dropped.
    pub fn flush(&mut self, is_alive: impl Fn(Tag) -> bool) -> Vec<ListenerUpdate> {
        let ops = std::mem::take(&mut self.ops);
        ops.into_iter()
            .filter(|(tag, _)| {
                let alive = is_alive(*tag);
                if !alive {
                    tracing::debug!(tag, "listener ops for deleted node dropped");
                }
                alive
            })
            .map(|(tag, ops)| {
                let mut events = IndexMap::new();
                for op in ops {
                    events.insert(op.name, op.add);
                }
                ListenerUpdate { tag, events }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_create_filters_style_and_flags_spans() {
        let node = DocumentNode::new(2, 1, 0, "Image")
            .with_style(props! { "width" => 20.0, "flexShrink" => 1 })
            .with_ext(props! { "src" => "a.png" })
            .with_parent_view("Text");
        let create = node.to_create(&StyleFilter::default());
        assert!(create.is_parent_text);
        assert_eq!(create.props.len(), 2);
        assert!(create.props.contains_key("width"));
        assert!(!create.props.contains_key("flexShrink"));
    }

    #[test]
    fn test_update_filters_deleted_keys() {
        let node = DocumentNode::new(3, 1, 0, "View");
        let update = node.to_update(
            &StyleFilter::default(),
            &props! { "opacity" => 0.5 },
            &["flex".to_string(), "backgroundColor".to_string()],
        );
        assert_eq!(update.deleted_props, vec!["backgroundColor".to_string()]);
        assert_eq!(update.diff_props.len(), 1);
    }

    #[test]
    fn test_listener_ops_coalesce_per_tag() {
        let mut ops = ListenerOps::new();
        ops.add_listener(5, "scroll");
        ops.add_listener(4, "click");
        ops.remove_listener(5, "scroll");
        ops.add_listener(5, "layout");
        ops.add_listener(9, "click");

        let updates = ops.flush(|tag| tag != 9);
        assert!(ops.is_empty());
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].tag, 4);
        assert_eq!(updates[1].tag, 5);
        assert_eq!(updates[1].events.get("scroll"), Some(&false));
        assert_eq!(updates[1].events.get("layout"), Some(&true));
    }
}
