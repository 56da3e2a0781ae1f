//! Virtual node table
//!
//! Mirror of the document tree kept as records are queued. Measurement
//! requests arrive before `EndBatch` applies the records, so text layout
//! reads the props of text nodes and their span children from here rather
//! than from native widgets that may not exist yet.
//!
//! The table only mirrors what the registry will accept: a record the
//! registry would reject at `EndBatch` leaves the table untouched.

use rustc_hash::FxHashMap;
use trellis_core::{MutationRecord, PropMap, Tag};
use trellis_text::{SpanSource, TextLayoutJob};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VirtualNode {
    pub view_name: String,
    pub parent: Option<Tag>,
    pub children: Vec<Tag>,
    pub props: PropMap,
}

#[derive(Clone, Debug)]
pub struct VirtualNodeTable {
    /// Root view; never mirrored but always a valid parent
    root_tag: Tag,
    nodes: FxHashMap<Tag, VirtualNode>,
}

impl VirtualNodeTable {
    pub fn new(root_tag: Tag) -> Self {
        Self {
            root_tag,
            nodes: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, tag: Tag) -> Option<&VirtualNode> {
        self.nodes.get(&tag)
    }

    /// Mirror one queued record
    pub fn apply(&mut self, record: &MutationRecord) {
        match record {
            MutationRecord::Create(node) => {
                if self.knows(node.tag) || !self.knows(node.parent_tag) {
                    tracing::trace!(tag = node.tag, parent = node.parent_tag, "create not mirrored");
                    return;
                }
                self.nodes.insert(
                    node.tag,
                    VirtualNode {
                        view_name: node.view_name.clone(),
                        parent: Some(node.parent_tag),
                        children: Vec::new(),
                        props: node.props.clone(),
                    },
                );
                self.attach(node.parent_tag, node.tag, node.index);
            }
            MutationRecord::Update(node) => {
                if let Some(entry) = self.nodes.get_mut(&node.tag) {
                    for (key, value) in &node.diff_props {
                        entry.props.insert(key.clone(), value.clone());
                    }
                    for key in &node.deleted_props {
                        entry.props.shift_remove(key);
                    }
                }
            }
            MutationRecord::Move(moves) => {
                if !self.knows(moves.parent_tag) {
                    return;
                }
                let mut nodes = moves.nodes.clone();
                nodes.sort_by_key(|node| node.index);
                for node in nodes {
                    if self.can_move(node.tag, moves.parent_tag) {
                        self.detach(node.tag);
                        self.attach(moves.parent_tag, node.tag, node.index);
                    }
                }
            }
            MutationRecord::Move2(moves) => {
                if !self.knows(moves.from_parent_tag) || !self.knows(moves.to_parent_tag) {
                    return;
                }
                for (i, tag) in moves.tags.iter().enumerate() {
                    if self.can_move(*tag, moves.to_parent_tag) {
                        self.detach(*tag);
                        self.attach(moves.to_parent_tag, *tag, moves.index.saturating_add(i as i32));
                    }
                }
            }
            MutationRecord::Delete { tag } => self.remove(*tag),
            MutationRecord::UpdateLayout(_) | MutationRecord::UpdateEventListener(_) => {}
        }
    }

    /// Paragraph job for a text node and its span children
    pub fn measure_job(&self, tag: Tag) -> Option<TextLayoutJob> {
        let node = self.nodes.get(&tag)?;
        let children: Vec<SpanSource<'_>> = node
            .children
            .iter()
            .filter_map(|child| {
                self.nodes.get(child).map(|entry| SpanSource {
                    id: *child,
                    view_name: &entry.view_name,
                    props: &entry.props,
                })
            })
            .collect();
        Some(TextLayoutJob::from_node(&node.props, &children))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn knows(&self, tag: Tag) -> bool {
        tag == self.root_tag || self.nodes.contains_key(&tag)
    }

    /// Mirrored, and not `parent` or one of its ancestors
    fn can_move(&self, child: Tag, parent: Tag) -> bool {
        if !self.nodes.contains_key(&child) {
            return false;
        }
        let mut current = Some(parent);
        while let Some(tag) = current {
            if tag == child {
                return false;
            }
            current = self.nodes.get(&tag).and_then(|node| node.parent);
        }
        true
    }

    fn remove(&mut self, tag: Tag) {
        self.detach(tag);
        let mut stack = vec![tag];
        while let Some(tag) = stack.pop() {
            if let Some(node) = self.nodes.remove(&tag) {
                stack.extend(node.children);
            }
        }
    }

    fn attach(&mut self, parent: Tag, child: Tag, index: i32) {
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            let position = (index.max(0) as usize).min(parent_node.children.len());
            parent_node.children.insert(position, child);
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = Some(parent);
        }
    }

    fn detach(&mut self, child: Tag) {
        let parent = self.nodes.get(&child).and_then(|node| node.parent);
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent_node.children.retain(|c| *c != child);
        }
    }
}
