//! View registry
//!
//! Tag-indexed tree of live native widgets for one root. Entries live in a
//! slot map arena: a parent owns its ordered child list, while the child's
//! `parent` key is only used for navigation.
//!
//! ```text
//!   tags: Tag ──► ViewKey
//!                   │
//!   entries: SlotMap<ViewKey, ViewEntry>
//!                   ├─ parent:   Option<ViewKey>   (navigation only)
//!                   ├─ children: Vec<ViewKey>      (owned order)
//!                   └─ view:     Box<dyn NativeView>
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use trellis_core::{
    BridgeError, CreateNode, LayoutFrame, LayoutUpdate, ListenerUpdate, Move2Nodes, MoveNodes,
    Padding, PropMap, PropValue, Result, SpanPosition, Tag, UpdateNode,
};

use crate::native::{NativeView, NativeViewFactory, NullView};

/// View name of the root entry
pub const ROOT_VIEW_NAME: &str = "Root";

new_key_type! {
    pub struct ViewKey;
}

/// Application-level node wrapping one native widget
pub struct ViewEntry {
    pub tag: Tag,
    pub view_name: String,
    parent: Option<ViewKey>,
    children: Vec<ViewKey>,
    props: PropMap,
    frame: Option<LayoutFrame>,
    padding: Option<Padding>,
    span_position: Option<SpanPosition>,
    events: FxHashSet<String>,
    view: Box<dyn NativeView>,
}

impl ViewEntry {
    fn new(tag: Tag, view_name: &str, parent: Option<ViewKey>, view: Box<dyn NativeView>) -> Self {
        Self {
            tag,
            view_name: view_name.to_string(),
            parent,
            children: Vec::new(),
            props: PropMap::new(),
            frame: None,
            padding: None,
            span_position: None,
            events: FxHashSet::default(),
            view,
        }
    }

    pub fn props(&self) -> &PropMap {
        &self.props
    }

    pub fn frame(&self) -> Option<LayoutFrame> {
        self.frame
    }

    pub fn padding(&self) -> Option<Padding> {
        self.padding
    }

    pub fn span_position(&self) -> Option<SpanPosition> {
        self.span_position
    }
}

impl std::fmt::Debug for ViewEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewEntry")
            .field("tag", &self.tag)
            .field("view_name", &self.view_name)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// Structural copy of a subtree, for comparing trees
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSnapshot {
    pub tag: Tag,
    pub view_name: String,
    pub props: PropMap,
    pub frame: Option<LayoutFrame>,
    pub span_position: Option<SpanPosition>,
    pub events: Vec<String>,
    pub children: Vec<ViewSnapshot>,
}

/// Registry of live views for one root document
pub struct ViewRegistry {
    root_tag: Tag,
    root: ViewKey,
    entries: SlotMap<ViewKey, ViewEntry>,
    tags: FxHashMap<Tag, ViewKey>,
    /// Span positions measured before their view was created
    pending_positions: FxHashMap<Tag, SpanPosition>,
    factory: Box<dyn NativeViewFactory>,
}

impl ViewRegistry {
    /// Registry holding only the root entry `root_tag`
    pub fn new(root_tag: Tag, mut factory: Box<dyn NativeViewFactory>) -> Self {
        let view = factory
            .create_view(root_tag, ROOT_VIEW_NAME, false)
            .unwrap_or_else(|| Box::new(NullView));
        let mut entries = SlotMap::with_key();
        let root = entries.insert(ViewEntry::new(root_tag, ROOT_VIEW_NAME, None, view));
        let mut tags = FxHashMap::default();
        tags.insert(root_tag, root);
        Self {
            root_tag,
            root,
            entries,
            tags,
            pending_positions: FxHashMap::default(),
            factory,
        }
    }

    pub fn root_tag(&self) -> Tag {
        self.root_tag
    }

    /// Number of live entries, root included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tags.contains_key(&tag)
    }

    pub fn get(&self, tag: Tag) -> Option<&ViewEntry> {
        self.tags.get(&tag).and_then(|key| self.entries.get(*key))
    }

    fn key(&self, tag: Tag) -> Result<ViewKey> {
        self.tags.get(&tag).copied().ok_or(BridgeError::UnknownTag(tag))
    }

    // =========================================================================
    // Tree operations
    // =========================================================================

    /// Create a view and insert it under its parent
    ///
    /// The index is clamped into the parent's child range.
    pub fn create(&mut self, node: &CreateNode) -> Result<()> {
        if self.tags.contains_key(&node.tag) {
            return Err(BridgeError::DuplicateTag(node.tag));
        }
        let parent = self
            .tags
            .get(&node.parent_tag)
            .copied()
            .ok_or(BridgeError::ParentNotFound {
                tag: node.tag,
                parent: node.parent_tag,
            })?;

        let mut view = self
            .factory
            .create_view(node.tag, &node.view_name, node.is_parent_text)
            .ok_or_else(|| BridgeError::ViewCreationFailed {
                tag: node.tag,
                view_name: node.view_name.clone(),
            })?;
        for (key, value) in &node.props {
            view.set_prop(key, value);
        }
        view.on_props_end();

        let mut entry = ViewEntry::new(node.tag, &node.view_name, Some(parent), view);
        entry.props = node.props.clone();
        if let Some(position) = self.pending_positions.remove(&node.tag) {
            entry.view.set_span_position(position);
            entry.span_position = Some(position);
        }

        let key = self.entries.insert(entry);
        self.tags.insert(node.tag, key);
        self.attach(parent, key, node.index);
        Ok(())
    }

    /// Apply a prop diff; deleted keys are reset on the widget
    pub fn update(&mut self, node: &UpdateNode) -> Result<()> {
        let key = self.key(node.tag)?;
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(BridgeError::UnknownTag(node.tag));
        };
        for (prop, value) in &node.diff_props {
            entry.view.set_prop(prop, value);
            entry.props.insert(prop.clone(), value.clone());
        }
        for prop in &node.deleted_props {
            entry.view.reset_prop(prop);
            entry.props.shift_remove(prop);
        }
        entry.view.on_props_end();
        Ok(())
    }

    /// Remove a subtree, releasing children before their parent
    ///
    /// Returns the tags removed, in release order.
    pub fn remove(&mut self, tag: Tag) -> Result<Vec<Tag>> {
        let key = self.key(tag)?;
        if key == self.root {
            tracing::warn!(tag, "refusing to delete the root view");
            return Ok(Vec::new());
        }
        self.detach(key);

        let mut order = Vec::new();
        let mut stack = vec![(key, false)];
        while let Some((key, expanded)) = stack.pop() {
            if expanded {
                order.push(key);
                continue;
            }
            stack.push((key, true));
            if let Some(entry) = self.entries.get(key) {
                stack.extend(entry.children.iter().rev().map(|child| (*child, false)));
            }
        }

        let mut removed = Vec::with_capacity(order.len());
        for key in order {
            if let Some(mut entry) = self.entries.remove(key) {
                entry.view.release();
                self.tags.remove(&entry.tag);
                self.pending_positions.remove(&entry.tag);
                removed.push(entry.tag);
            }
        }
        Ok(removed)
    }

    /// Reorder children of one parent
    ///
    /// Nodes are placed in ascending index order regardless of input order.
    /// Missing tags and moves that would create a cycle are skipped and
    /// returned.
    pub fn move_children(&mut self, moves: &MoveNodes) -> Result<Vec<Tag>> {
        let parent = self.tags.get(&moves.parent_tag).copied().ok_or_else(|| {
            BridgeError::ParentNotFound {
                tag: moves.nodes.first().map(|n| n.tag).unwrap_or(moves.parent_tag),
                parent: moves.parent_tag,
            }
        })?;

        let mut nodes = moves.nodes.clone();
        nodes.sort_by_key(|node| node.index);

        let mut skipped = Vec::new();
        for node in nodes {
            match self.tags.get(&node.tag).copied() {
                Some(key) if !self.is_ancestor_or_self(key, parent) => {
                    self.detach(key);
                    self.attach(parent, key, node.index);
                }
                _ => skipped.push(node.tag),
            }
        }
        Ok(skipped)
    }

    /// Move a run of nodes from one parent to another, starting at `index`
    pub fn move2(&mut self, moves: &Move2Nodes) -> Result<Vec<Tag>> {
        let first = moves.tags.first().copied().unwrap_or(moves.to_parent_tag);
        if !self.tags.contains_key(&moves.from_parent_tag) {
            return Err(BridgeError::ParentNotFound {
                tag: first,
                parent: moves.from_parent_tag,
            });
        }
        let to = self
            .tags
            .get(&moves.to_parent_tag)
            .copied()
            .ok_or(BridgeError::ParentNotFound {
                tag: first,
                parent: moves.to_parent_tag,
            })?;

        // positions count every listed tag, skipped ones included
        let mut skipped = Vec::new();
        for (i, tag) in moves.tags.iter().enumerate() {
            match self.tags.get(tag).copied() {
                Some(key) if !self.is_ancestor_or_self(key, to) => {
                    self.detach(key);
                    self.attach(to, key, moves.index.saturating_add(i as i32));
                }
                _ => skipped.push(*tag),
            }
        }
        Ok(skipped)
    }

    pub fn set_frame(&mut self, layout: &LayoutUpdate) -> Result<()> {
        let key = self.key(layout.tag)?;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.view.set_frame(layout.frame, layout.padding);
            entry.frame = Some(layout.frame);
            if layout.padding.is_some() {
                entry.padding = layout.padding;
            }
        }
        Ok(())
    }

    /// Apply an inline position now, or when the view gets created
    pub fn set_span_position(&mut self, tag: Tag, position: SpanPosition) {
        match self.tags.get(&tag).and_then(|key| self.entries.get_mut(*key)) {
            Some(entry) => {
                entry.view.set_span_position(position);
                entry.span_position = Some(position);
            }
            None => {
                self.pending_positions.insert(tag, position);
            }
        }
    }

    pub fn update_event_listener(&mut self, update: &ListenerUpdate) -> Result<()> {
        let key = self.key(update.tag)?;
        if let Some(entry) = self.entries.get_mut(key) {
            for (name, enabled) in &update.events {
                entry.view.set_event_listener(name, *enabled);
                if *enabled {
                    entry.events.insert(name.clone());
                } else {
                    entry.events.remove(name);
                }
            }
        }
        Ok(())
    }

    /// Whether the document subscribed to `name` on `tag`
    pub fn check_registered_event(&self, tag: Tag, name: &str) -> bool {
        self.get(tag).is_some_and(|entry| entry.events.contains(name))
    }

    pub fn call_method(
        &mut self,
        tag: Tag,
        method: &str,
        params: &PropValue,
    ) -> Result<std::result::Result<PropValue, String>> {
        let key = self.key(tag)?;
        let entry = self.entries.get_mut(key).ok_or(BridgeError::UnknownTag(tag))?;
        Ok(entry.view.call_method(method, params))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn parent_of(&self, tag: Tag) -> Option<Tag> {
        let entry = self.get(tag)?;
        entry
            .parent
            .and_then(|key| self.entries.get(key))
            .map(|parent| parent.tag)
    }

    pub fn children_of(&self, tag: Tag) -> Option<Vec<Tag>> {
        let entry = self.get(tag)?;
        Some(
            entry
                .children
                .iter()
                .filter_map(|key| self.entries.get(*key).map(|child| child.tag))
                .collect(),
        )
    }

    /// Copy of the tree below the root
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot_of(self.root)
    }

    fn snapshot_of(&self, key: ViewKey) -> ViewSnapshot {
        let Some(entry) = self.entries.get(key) else {
            return ViewSnapshot {
                tag: 0,
                view_name: String::new(),
                props: PropMap::new(),
                frame: None,
                span_position: None,
                events: Vec::new(),
                children: Vec::new(),
            };
        };
        let mut events: Vec<String> = entry.events.iter().cloned().collect();
        events.sort();
        ViewSnapshot {
            tag: entry.tag,
            view_name: entry.view_name.clone(),
            props: entry.props.clone(),
            frame: entry.frame,
            span_position: entry.span_position,
            events,
            children: entry
                .children
                .iter()
                .map(|child| self.snapshot_of(*child))
                .collect(),
        }
    }

    /// Verify parent links against child lists
    ///
    /// Every non-root entry must appear exactly once in its parent's child
    /// list, and every child must point back at the list's owner.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        for (key, entry) in &self.entries {
            for child in &entry.children {
                match self.entries.get(*child) {
                    Some(c) if c.parent == Some(key) => {}
                    Some(c) => return Err(format!("child {} of {} links elsewhere", c.tag, entry.tag)),
                    None => return Err(format!("{} lists a dead child", entry.tag)),
                }
            }
            if key == self.root {
                continue;
            }
            let Some(parent) = entry.parent.and_then(|p| self.entries.get(p)) else {
                return Err(format!("{} has no live parent", entry.tag));
            };
            let count = parent.children.iter().filter(|c| **c == key).count();
            if count != 1 {
                return Err(format!("{} appears {} times under {}", entry.tag, count, parent.tag));
            }
        }
        if self.tags.len() != self.entries.len() {
            return Err("tag index out of sync".to_string());
        }
        Ok(())
    }

    /// Release every view, leaving only an empty root
    pub fn teardown(&mut self) {
        let children: Vec<Tag> = self.children_of(self.root_tag).unwrap_or_default();
        for tag in children {
            let _ = self.remove(tag);
        }
        self.pending_positions.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn attach(&mut self, parent: ViewKey, child: ViewKey, index: i32) {
        let child_tag = self.entries.get(child).map(|e| e.tag).unwrap_or_default();
        let Some(parent_entry) = self.entries.get_mut(parent) else {
            return;
        };
        let position = (index.max(0) as usize).min(parent_entry.children.len());
        parent_entry.children.insert(position, child);
        parent_entry.view.on_child_inserted(child_tag, position);
        if let Some(child_entry) = self.entries.get_mut(child) {
            child_entry.parent = Some(parent);
        }
    }

    fn detach(&mut self, child: ViewKey) {
        let Some(entry) = self.entries.get_mut(child) else {
            return;
        };
        let child_tag = entry.tag;
        let Some(parent) = entry.parent.take() else {
            return;
        };
        if let Some(parent_entry) = self.entries.get_mut(parent) {
            if let Some(position) = parent_entry.children.iter().position(|c| *c == child) {
                parent_entry.children.remove(position);
                parent_entry.view.on_child_removed(child_tag, position);
            }
        }
    }

    /// Whether `key` is `node` or one of its ancestors
    fn is_ancestor_or_self(&self, key: ViewKey, node: ViewKey) -> bool {
        let mut current = Some(node);
        while let Some(k) = current {
            if k == key {
                return true;
            }
            current = self.entries.get(k).and_then(|e| e.parent);
        }
        false
    }
}

impl Drop for ViewRegistry {
    fn drop(&mut self) {
        self.teardown();
        if let Some(root) = self.entries.get_mut(self.root) {
            root.view.release();
        }
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("root_tag", &self.root_tag)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{HeadlessViewFactory, NativeCall};
    use smallvec::smallvec;
    use trellis_core::{props, MoveNodeInfo};

    fn registry() -> (ViewRegistry, crate::native::CallLog) {
        let factory = HeadlessViewFactory::new();
        let calls = factory.calls();
        (ViewRegistry::new(0, Box::new(factory)), calls)
    }

    fn create(registry: &mut ViewRegistry, tag: Tag, parent: Tag, index: i32) {
        registry
            .create(&CreateNode::new(tag, parent, index, "View"))
            .unwrap();
    }

    #[test]
    fn test_create_and_query() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 1, 0);
        create(&mut registry, 3, 1, 0);
        assert_eq!(registry.children_of(1), Some(vec![3, 2]));
        assert_eq!(registry.parent_of(2), Some(1));
        assert_eq!(registry.parent_of(0), None);
        assert!(registry.check_consistency().is_ok());
    }

    #[test]
    fn test_create_errors() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        assert_eq!(
            registry.create(&CreateNode::new(1, 0, 0, "View")),
            Err(BridgeError::DuplicateTag(1))
        );
        assert_eq!(
            registry.create(&CreateNode::new(5, 9, 0, "View")),
            Err(BridgeError::ParentNotFound { tag: 5, parent: 9 })
        );
    }

    #[test]
    fn test_rejected_view_is_not_registered() {
        let factory = HeadlessViewFactory::new().reject("WebView");
        let mut registry = ViewRegistry::new(0, Box::new(factory));
        let err = registry.create(&CreateNode::new(1, 0, 0, "WebView")).unwrap_err();
        assert!(matches!(err, BridgeError::ViewCreationFailed { tag: 1, .. }));
        assert!(!registry.contains(1));
    }

    #[test]
    fn test_index_is_clamped() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 0, 50);
        create(&mut registry, 3, 0, -4);
        assert_eq!(registry.children_of(0), Some(vec![3, 1, 2]));
    }

    #[test]
    fn test_update_sets_and_resets() {
        let (mut registry, calls) = registry();
        registry
            .create(&CreateNode::new(1, 0, 0, "View").with_props(props! { "opacity" => 0.5 }))
            .unwrap();
        registry
            .update(
                &UpdateNode::new(1, 0, 0, "View")
                    .with_diff(props! { "backgroundColor" => 7u32 })
                    .with_deleted(["opacity"]),
            )
            .unwrap();
        let entry = registry.get(1).unwrap();
        assert!(entry.props().get("opacity").is_none());
        assert_eq!(entry.props().get("backgroundColor"), Some(&PropValue::Uint32(7)));
        assert!(calls.lock().contains(&NativeCall::ResetProp {
            tag: 1,
            key: "opacity".into()
        }));
        assert_eq!(
            registry.update(&UpdateNode::new(9, 0, 0, "View")),
            Err(BridgeError::UnknownTag(9))
        );
    }

    #[test]
    fn test_remove_subtree_releases_children_first() {
        let (mut registry, calls) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 1, 0);
        create(&mut registry, 3, 2, 0);
        let removed = registry.remove(1).unwrap();
        assert_eq!(removed, vec![3, 2, 1]);
        assert!(!registry.contains(1) && !registry.contains(2) && !registry.contains(3));
        assert_eq!(registry.children_of(0), Some(vec![]));

        let released: Vec<Tag> = calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NativeCall::Released { tag } => Some(*tag),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![3, 2, 1]);
        assert_eq!(registry.remove(1), Err(BridgeError::UnknownTag(1)));
        assert!(registry.check_consistency().is_ok());
    }

    #[test]
    fn test_move_orders_by_index() {
        let (mut registry, _) = registry();
        create(&mut registry, 2, 0, 0);
        create(&mut registry, 3, 0, 1);
        create(&mut registry, 4, 0, 2);
        let skipped = registry
            .move_children(&MoveNodes {
                parent_tag: 0,
                nodes: vec![
                    MoveNodeInfo { tag: 3, index: 1 },
                    MoveNodeInfo { tag: 2, index: 0 },
                    MoveNodeInfo { tag: 99, index: 2 },
                ],
            })
            .unwrap();
        assert_eq!(skipped, vec![99]);
        assert_eq!(registry.children_of(0), Some(vec![2, 3, 4]));
    }

    #[test]
    fn test_move_refuses_cycles() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 1, 0);
        let skipped = registry
            .move_children(&MoveNodes {
                parent_tag: 2,
                nodes: vec![MoveNodeInfo { tag: 1, index: 0 }],
            })
            .unwrap();
        assert_eq!(skipped, vec![1]);
        assert_eq!(registry.parent_of(1), Some(0));
        assert!(registry.check_consistency().is_ok());
    }

    #[test]
    fn test_move2_skipped_tag_keeps_its_slot() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 0, 1);
        create(&mut registry, 10, 1, 0);
        create(&mut registry, 11, 1, 1);
        for (i, tag) in [20, 21, 22].into_iter().enumerate() {
            create(&mut registry, tag, 2, i as i32);
        }
        let skipped = registry
            .move2(&Move2Nodes {
                tags: smallvec![10, 99, 11],
                from_parent_tag: 1,
                to_parent_tag: 2,
                index: 0,
            })
            .unwrap();
        assert_eq!(skipped, vec![99]);
        // 10 at 0, 11 at 2 rather than 1
        assert_eq!(registry.children_of(2), Some(vec![10, 20, 11, 21, 22]));
        assert!(registry.check_consistency().is_ok());
    }

    #[test]
    fn test_move2_between_parents() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 0, 1);
        create(&mut registry, 10, 1, 0);
        create(&mut registry, 11, 1, 1);
        create(&mut registry, 20, 2, 0);
        registry
            .move2(&Move2Nodes {
                tags: smallvec![10, 11],
                from_parent_tag: 1,
                to_parent_tag: 2,
                index: 0,
            })
            .unwrap();
        assert_eq!(registry.children_of(1), Some(vec![]));
        assert_eq!(registry.children_of(2), Some(vec![10, 11, 20]));
        assert!(registry.check_consistency().is_ok());

        let missing = Move2Nodes {
            tags: smallvec![20],
            from_parent_tag: 2,
            to_parent_tag: 77,
            index: 0,
        };
        assert!(matches!(
            registry.move2(&missing),
            Err(BridgeError::ParentNotFound { parent: 77, .. })
        ));
    }

    #[test]
    fn test_span_position_waits_for_create() {
        let (mut registry, _) = registry();
        registry.set_span_position(5, SpanPosition::new(3.0, 4.0));
        create(&mut registry, 5, 0, 0);
        assert_eq!(registry.get(5).unwrap().span_position(), Some(SpanPosition::new(3.0, 4.0)));
    }

    #[test]
    fn test_event_listeners() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        registry
            .update_event_listener(
                &ListenerUpdate::new(1)
                    .with_event("click", true)
                    .with_event("scroll", true),
            )
            .unwrap();
        assert!(registry.check_registered_event(1, "click"));
        registry
            .update_event_listener(&ListenerUpdate::new(1).with_event("click", false))
            .unwrap();
        assert!(!registry.check_registered_event(1, "click"));
        assert!(registry.check_registered_event(1, "scroll"));
        assert!(!registry.check_registered_event(42, "scroll"));
    }

    #[test]
    fn test_teardown_leaves_root() {
        let (mut registry, _) = registry();
        create(&mut registry, 1, 0, 0);
        create(&mut registry, 2, 1, 0);
        registry.teardown();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(0));
    }
}
