//! Mutation record model
//!
//! One record per tree edit, produced by the document diff stage and
//! consumed exactly once by the view manager of the target root.
//!
//! ```text
//! document diff ──► [MutationRecord] ──► backend ──► ViewManager queue ──► ViewRegistry
//! ```
//!
//! Within one batch a tag is created at most once, and no record may
//! reference a tag after its `Delete`.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::value::PropMap;

/// Identifier of a node within one root document
///
/// Tags are unique for the lifetime of a document and never reused.
pub type Tag = u32;

/// Identifier of an attached root surface
pub type RootId = u32;

// ============================================================================
// Geometry
// ============================================================================

/// Frame of a view in its parent's coordinate space (dp)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutFrame {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutFrame {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Scale every component (dp <-> px)
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Content padding reported by the layout engine (dp)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Padding {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }
}

// ============================================================================
// Records
// ============================================================================

/// Create a node and insert it under `parent_tag`
#[derive(Clone, Debug, PartialEq)]
pub struct CreateNode {
    pub tag: Tag,
    pub parent_tag: Tag,
    pub index: i32,
    pub view_name: String,
    pub props: PropMap,
    /// Parent is a text node, so this node renders as an inline span
    pub is_parent_text: bool,
}

impl CreateNode {
    pub fn new(tag: Tag, parent_tag: Tag, index: i32, view_name: impl Into<String>) -> Self {
        Self {
            tag,
            parent_tag,
            index,
            view_name: view_name.into(),
            props: PropMap::new(),
            is_parent_text: false,
        }
    }

    pub fn with_props(mut self, props: PropMap) -> Self {
        self.props = props;
        self
    }

    pub fn with_parent_text(mut self, is_parent_text: bool) -> Self {
        self.is_parent_text = is_parent_text;
        self
    }
}

/// Apply a property diff to an existing node
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateNode {
    pub tag: Tag,
    pub parent_tag: Tag,
    pub index: i32,
    pub view_name: String,
    pub diff_props: PropMap,
    /// Keys reset to their default value
    pub deleted_props: Vec<String>,
}

impl UpdateNode {
    pub fn new(tag: Tag, parent_tag: Tag, index: i32, view_name: impl Into<String>) -> Self {
        Self {
            tag,
            parent_tag,
            index,
            view_name: view_name.into(),
            diff_props: PropMap::new(),
            deleted_props: Vec::new(),
        }
    }

    pub fn with_diff(mut self, diff_props: PropMap) -> Self {
        self.diff_props = diff_props;
        self
    }

    pub fn with_deleted<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deleted_props = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Target position of one child in a sibling reorder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveNodeInfo {
    pub tag: Tag,
    pub index: i32,
}

/// Reorder existing children of one parent
#[derive(Clone, Debug, PartialEq)]
pub struct MoveNodes {
    pub parent_tag: Tag,
    pub nodes: Vec<MoveNodeInfo>,
}

/// Reparent a run of nodes, preserving their relative order
#[derive(Clone, Debug, PartialEq)]
pub struct Move2Nodes {
    pub tags: SmallVec<[Tag; 4]>,
    pub from_parent_tag: Tag,
    pub to_parent_tag: Tag,
    pub index: i32,
}

/// New frame for a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutUpdate {
    pub tag: Tag,
    pub frame: LayoutFrame,
    pub padding: Option<Padding>,
}

/// Subscribe/unsubscribe events on a node (`true` = subscribe)
#[derive(Clone, Debug, PartialEq)]
pub struct ListenerUpdate {
    pub tag: Tag,
    pub events: IndexMap<String, bool>,
}

impl ListenerUpdate {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            events: IndexMap::new(),
        }
    }

    pub fn with_event(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.events.insert(name.into(), enabled);
        self
    }
}

/// A single tree-edit instruction
#[derive(Clone, Debug, PartialEq)]
pub enum MutationRecord {
    Create(CreateNode),
    Update(UpdateNode),
    Move(MoveNodes),
    Move2(Move2Nodes),
    Delete { tag: Tag },
    UpdateLayout(LayoutUpdate),
    UpdateEventListener(ListenerUpdate),
}

/// Discriminant of a [`MutationRecord`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Move,
    Move2,
    Delete,
    UpdateLayout,
    UpdateEventListener,
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Move => "move",
            MutationKind::Move2 => "move2",
            MutationKind::Delete => "delete",
            MutationKind::UpdateLayout => "update_layout",
            MutationKind::UpdateEventListener => "update_event_listener",
        }
    }
}

impl MutationRecord {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRecord::Create(_) => MutationKind::Create,
            MutationRecord::Update(_) => MutationKind::Update,
            MutationRecord::Move(_) => MutationKind::Move,
            MutationRecord::Move2(_) => MutationKind::Move2,
            MutationRecord::Delete { .. } => MutationKind::Delete,
            MutationRecord::UpdateLayout(_) => MutationKind::UpdateLayout,
            MutationRecord::UpdateEventListener(_) => MutationKind::UpdateEventListener,
        }
    }

    /// Tag the record edits, when it edits a single node
    pub fn tag(&self) -> Option<Tag> {
        match self {
            MutationRecord::Create(node) => Some(node.tag),
            MutationRecord::Update(node) => Some(node.tag),
            MutationRecord::Delete { tag } => Some(*tag),
            MutationRecord::UpdateLayout(layout) => Some(layout.tag),
            MutationRecord::UpdateEventListener(listener) => Some(listener.tag),
            MutationRecord::Move(_) | MutationRecord::Move2(_) => None,
        }
    }

    /// Every tag the record touches, parents included
    pub fn referenced_tags(&self) -> SmallVec<[Tag; 4]> {
        let mut tags = SmallVec::new();
        match self {
            MutationRecord::Create(node) => {
                tags.push(node.tag);
                tags.push(node.parent_tag);
            }
            MutationRecord::Update(node) => tags.push(node.tag),
            MutationRecord::Move(moves) => {
                tags.push(moves.parent_tag);
                tags.extend(moves.nodes.iter().map(|info| info.tag));
            }
            MutationRecord::Move2(moves) => {
                tags.push(moves.from_parent_tag);
                tags.push(moves.to_parent_tag);
                tags.extend(moves.tags.iter().copied());
            }
            MutationRecord::Delete { tag } => tags.push(*tag),
            MutationRecord::UpdateLayout(layout) => tags.push(layout.tag),
            MutationRecord::UpdateEventListener(listener) => tags.push(listener.tag),
        }
        tags
    }
}

impl From<CreateNode> for MutationRecord {
    fn from(node: CreateNode) -> Self {
        MutationRecord::Create(node)
    }
}

impl From<UpdateNode> for MutationRecord {
    fn from(node: UpdateNode) -> Self {
        MutationRecord::Update(node)
    }
}

impl From<MoveNodes> for MutationRecord {
    fn from(moves: MoveNodes) -> Self {
        MutationRecord::Move(moves)
    }
}

impl From<Move2Nodes> for MutationRecord {
    fn from(moves: Move2Nodes) -> Self {
        MutationRecord::Move2(moves)
    }
}

impl From<LayoutUpdate> for MutationRecord {
    fn from(layout: LayoutUpdate) -> Self {
        MutationRecord::UpdateLayout(layout)
    }
}

impl From<ListenerUpdate> for MutationRecord {
    fn from(listener: ListenerUpdate) -> Self {
        MutationRecord::UpdateEventListener(listener)
    }
}

/// Check the per-batch invariants: one create per tag, nothing after a delete
///
/// Returns the first offending tag, if any.
pub fn validate_batch(records: &[MutationRecord]) -> Option<Tag> {
    let mut created = rustc_hash::FxHashSet::default();
    let mut deleted = rustc_hash::FxHashSet::default();
    for record in records {
        if let Some(tag) = record
            .referenced_tags()
            .into_iter()
            .find(|tag| deleted.contains(tag))
        {
            return Some(tag);
        }
        match record {
            MutationRecord::Create(node) => {
                if !created.insert(node.tag) {
                    return Some(node.tag);
                }
            }
            MutationRecord::Delete { tag } => {
                deleted.insert(*tag);
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use smallvec::smallvec;

    #[test]
    fn test_record_tags() {
        let create: MutationRecord = CreateNode::new(2, 1, 0, "View").into();
        assert_eq!(create.kind(), MutationKind::Create);
        assert_eq!(create.tag(), Some(2));
        assert_eq!(create.referenced_tags().as_slice(), &[2, 1]);

        let move2 = MutationRecord::Move2(Move2Nodes {
            tags: smallvec![5, 6],
            from_parent_tag: 1,
            to_parent_tag: 3,
            index: 0,
        });
        assert_eq!(move2.tag(), None);
        assert_eq!(move2.referenced_tags().as_slice(), &[1, 3, 5, 6]);
    }

    #[test]
    fn test_update_builder() {
        let update = UpdateNode::new(4, 1, 0, "Text")
            .with_diff(props! { "text" => "hi" })
            .with_deleted(["color"]);
        assert_eq!(update.deleted_props, vec!["color".to_string()]);
        assert_eq!(update.diff_props.len(), 1);
    }

    #[test]
    fn test_validate_batch_rejects_use_after_delete() {
        let records = vec![
            CreateNode::new(1, 0, 0, "View").into(),
            MutationRecord::Delete { tag: 1 },
            MutationRecord::UpdateLayout(LayoutUpdate {
                tag: 1,
                frame: LayoutFrame::default(),
                padding: None,
            }),
        ];
        assert_eq!(validate_batch(&records), Some(1));
    }

    #[test]
    fn test_validate_batch_rejects_double_create() {
        let records: Vec<MutationRecord> = vec![
            CreateNode::new(1, 0, 0, "View").into(),
            CreateNode::new(1, 0, 1, "View").into(),
        ];
        assert_eq!(validate_batch(&records), Some(1));

        let ok: Vec<MutationRecord> = vec![
            CreateNode::new(1, 0, 0, "View").into(),
            CreateNode::new(2, 1, 0, "View").into(),
        ];
        assert_eq!(validate_batch(&ok), None);
    }

    #[test]
    fn test_frame_scaling() {
        let frame = LayoutFrame::new(1.0, 2.0, 10.0, 20.0).scaled(2.0);
        assert_eq!(frame, LayoutFrame::new(2.0, 4.0, 20.0, 40.0));
    }
}
