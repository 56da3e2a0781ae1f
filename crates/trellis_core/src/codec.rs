//! Record <-> value codec for the serialized backend
//!
//! Each native method carries one payload value:
//!
//! | method                | payload                                                     |
//! |-----------------------|-------------------------------------------------------------|
//! | `createNode`          | `[{id, pId, index, name, props, isParentText}]`              |
//! | `updateNode`          | `[{id, pId, index, name, props, deleteProps}]`               |
//! | `moveNode`            | `{pid, nodes: [{id, index}]}`                                |
//! | `moveNode2`           | `{ids, fromPid, toPid, index}`                               |
//! | `deleteNode`          | `[id]`                                                       |
//! | `updateLayout`        | `[{id, left, top, width, height, paddingLeft..}]` in px      |
//! | `updateEventListener` | `[{id, props: {event: bool}}]`                               |

use indexmap::IndexMap;

use crate::mutation::{
    CreateNode, LayoutFrame, LayoutUpdate, ListenerUpdate, Move2Nodes, MoveNodeInfo, MoveNodes,
    MutationKind, MutationRecord, Padding, Tag, UpdateNode,
};
use crate::value::{PropMap, PropValue};
use crate::wire::{WireError, WireResult};

// Payload keys
const ID: &str = "id";
const PID: &str = "pId";
const INDEX: &str = "index";
const NAME: &str = "name";
const PROPS: &str = "props";
const DELETE_PROPS: &str = "deleteProps";
const IS_PARENT_TEXT: &str = "isParentText";
const MOVE_PID: &str = "pid";
const NODES: &str = "nodes";
const IDS: &str = "ids";
const FROM_PID: &str = "fromPid";
const TO_PID: &str = "toPid";
const LEFT: &str = "left";
const TOP: &str = "top";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const PADDING_KEYS: [&str; 4] = ["paddingLeft", "paddingTop", "paddingRight", "paddingBottom"];

/// Methods invoked across the serialized boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeMethod {
    CreateNode,
    UpdateNode,
    MoveNode,
    MoveNode2,
    DeleteNode,
    UpdateLayout,
    UpdateEventListener,
}

impl NativeMethod {
    pub const ALL: [NativeMethod; 7] = [
        NativeMethod::CreateNode,
        NativeMethod::UpdateNode,
        NativeMethod::MoveNode,
        NativeMethod::MoveNode2,
        NativeMethod::DeleteNode,
        NativeMethod::UpdateLayout,
        NativeMethod::UpdateEventListener,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NativeMethod::CreateNode => "createNode",
            NativeMethod::UpdateNode => "updateNode",
            NativeMethod::MoveNode => "moveNode",
            NativeMethod::MoveNode2 => "moveNode2",
            NativeMethod::DeleteNode => "deleteNode",
            NativeMethod::UpdateLayout => "updateLayout",
            NativeMethod::UpdateEventListener => "updateEventListener",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.name() == name)
    }

    pub fn for_kind(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Create => NativeMethod::CreateNode,
            MutationKind::Update => NativeMethod::UpdateNode,
            MutationKind::Move => NativeMethod::MoveNode,
            MutationKind::Move2 => NativeMethod::MoveNode2,
            MutationKind::Delete => NativeMethod::DeleteNode,
            MutationKind::UpdateLayout => NativeMethod::UpdateLayout,
            MutationKind::UpdateEventListener => NativeMethod::UpdateEventListener,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_create(nodes: &[CreateNode]) -> PropValue {
    PropValue::Array(
        nodes
            .iter()
            .map(|node| {
                let mut object = node_header(node.tag, node.parent_tag, node.index, &node.view_name);
                object.insert(PROPS.into(), PropValue::Object(node.props.clone()));
                object.insert(IS_PARENT_TEXT.into(), PropValue::Bool(node.is_parent_text));
                PropValue::Object(object)
            })
            .collect(),
    )
}

pub fn encode_update(nodes: &[UpdateNode]) -> PropValue {
    PropValue::Array(
        nodes
            .iter()
            .map(|node| {
                let mut object = node_header(node.tag, node.parent_tag, node.index, &node.view_name);
                object.insert(PROPS.into(), PropValue::Object(node.diff_props.clone()));
                object.insert(
                    DELETE_PROPS.into(),
                    PropValue::Array(
                        node.deleted_props
                            .iter()
                            .map(|key| PropValue::String(key.clone()))
                            .collect(),
                    ),
                );
                PropValue::Object(object)
            })
            .collect(),
    )
}

pub fn encode_move(moves: &MoveNodes) -> PropValue {
    let mut object = PropMap::new();
    object.insert(MOVE_PID.into(), PropValue::Uint32(moves.parent_tag));
    object.insert(
        NODES.into(),
        PropValue::Array(
            moves
                .nodes
                .iter()
                .map(|info| {
                    let mut node = PropMap::new();
                    node.insert(ID.into(), PropValue::Uint32(info.tag));
                    node.insert(INDEX.into(), PropValue::Int32(info.index));
                    PropValue::Object(node)
                })
                .collect(),
        ),
    );
    PropValue::Object(object)
}

pub fn encode_move2(moves: &Move2Nodes) -> PropValue {
    let mut object = PropMap::new();
    object.insert(
        IDS.into(),
        PropValue::Array(moves.tags.iter().map(|tag| PropValue::Uint32(*tag)).collect()),
    );
    object.insert(FROM_PID.into(), PropValue::Uint32(moves.from_parent_tag));
    object.insert(TO_PID.into(), PropValue::Uint32(moves.to_parent_tag));
    object.insert(INDEX.into(), PropValue::Int32(moves.index));
    PropValue::Object(object)
}

pub fn encode_delete(tags: &[Tag]) -> PropValue {
    PropValue::Array(tags.iter().map(|tag| PropValue::Uint32(*tag)).collect())
}

/// Layout payload in px (`dp * density`)
pub fn encode_layout(layouts: &[LayoutUpdate], density: f32) -> PropValue {
    let px = |dp: f32| PropValue::Double(f64::from(dp) * f64::from(density));
    PropValue::Array(
        layouts
            .iter()
            .map(|layout| {
                let mut object = PropMap::new();
                object.insert(ID.into(), PropValue::Uint32(layout.tag));
                object.insert(LEFT.into(), px(layout.frame.left));
                object.insert(TOP.into(), px(layout.frame.top));
                object.insert(WIDTH.into(), px(layout.frame.width));
                object.insert(HEIGHT.into(), px(layout.frame.height));
                if let Some(padding) = layout.padding {
                    let values = [padding.left, padding.top, padding.right, padding.bottom];
                    for (key, value) in PADDING_KEYS.iter().zip(values) {
                        object.insert((*key).into(), px(value));
                    }
                }
                PropValue::Object(object)
            })
            .collect(),
    )
}

pub fn encode_listeners(listeners: &[ListenerUpdate]) -> PropValue {
    PropValue::Array(
        listeners
            .iter()
            .map(|listener| {
                let events: PropMap = listener
                    .events
                    .iter()
                    .map(|(name, add)| (name.clone(), PropValue::Bool(*add)))
                    .collect();
                let mut object = PropMap::new();
                object.insert(ID.into(), PropValue::Uint32(listener.tag));
                object.insert(PROPS.into(), PropValue::Object(events));
                PropValue::Object(object)
            })
            .collect(),
    )
}

fn node_header(tag: Tag, parent_tag: Tag, index: i32, view_name: &str) -> PropMap {
    let mut object = PropMap::new();
    object.insert(ID.into(), PropValue::Uint32(tag));
    object.insert(PID.into(), PropValue::Uint32(parent_tag));
    object.insert(INDEX.into(), PropValue::Int32(index));
    object.insert(NAME.into(), PropValue::String(view_name.to_string()));
    object
}

// ============================================================================
// Decoding
// ============================================================================

/// Rebuild the records carried by one method payload
///
/// Any missing key or mistyped field fails the whole payload.
pub fn decode_payload(
    method: NativeMethod,
    payload: PropValue,
    density: f32,
) -> WireResult<Vec<MutationRecord>> {
    match method {
        NativeMethod::CreateNode => each_object(payload, decode_create),
        NativeMethod::UpdateNode => each_object(payload, decode_update),
        NativeMethod::MoveNode => decode_move(&into_object(payload)?).map(|record| vec![record]),
        NativeMethod::MoveNode2 => decode_move2(&into_object(payload)?).map(|record| vec![record]),
        NativeMethod::DeleteNode => into_array(payload)?
            .iter()
            .map(|id| as_tag(id, ID).map(|tag| MutationRecord::Delete { tag }))
            .collect(),
        NativeMethod::UpdateLayout => each_object(payload, |object| decode_layout(object, density)),
        NativeMethod::UpdateEventListener => each_object(payload, decode_listener),
    }
}

fn each_object(
    payload: PropValue,
    decode: impl Fn(&PropMap) -> WireResult<MutationRecord>,
) -> WireResult<Vec<MutationRecord>> {
    into_array(payload)?
        .iter()
        .map(|item| {
            let object = item
                .as_object()
                .ok_or_else(|| shape(format!("expected node object, got {}", item.type_name())))?;
            decode(object)
        })
        .collect()
}

fn decode_create(object: &PropMap) -> WireResult<MutationRecord> {
    Ok(MutationRecord::Create(CreateNode {
        tag: tag_field(object, ID)?,
        parent_tag: tag_field(object, PID)?,
        index: i32_field(object, INDEX)?,
        view_name: string_field(object, NAME)?,
        props: optional_object(object, PROPS)?,
        is_parent_text: match object.get(IS_PARENT_TEXT) {
            None | Some(PropValue::Null) | Some(PropValue::Undefined) => false,
            Some(value) => value
                .as_bool()
                .ok_or_else(|| mistyped(IS_PARENT_TEXT, value))?,
        },
    }))
}

fn decode_update(object: &PropMap) -> WireResult<MutationRecord> {
    let deleted_props = match object.get(DELETE_PROPS) {
        None | Some(PropValue::Null) | Some(PropValue::Undefined) => Vec::new(),
        Some(PropValue::Array(keys)) => keys
            .iter()
            .map(|key| {
                key.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| mistyped(DELETE_PROPS, key))
            })
            .collect::<WireResult<Vec<_>>>()?,
        Some(other) => return Err(mistyped(DELETE_PROPS, other)),
    };
    Ok(MutationRecord::Update(UpdateNode {
        tag: tag_field(object, ID)?,
        parent_tag: tag_field(object, PID)?,
        index: i32_field(object, INDEX)?,
        view_name: string_field(object, NAME)?,
        diff_props: optional_object(object, PROPS)?,
        deleted_props,
    }))
}

fn decode_move(object: &PropMap) -> WireResult<MutationRecord> {
    let nodes = array_field(object, NODES)?
        .iter()
        .map(|node| {
            let node = node.as_object().ok_or_else(|| mistyped(NODES, node))?;
            Ok(MoveNodeInfo {
                tag: tag_field(node, ID)?,
                index: i32_field(node, INDEX)?,
            })
        })
        .collect::<WireResult<Vec<_>>>()?;
    Ok(MutationRecord::Move(MoveNodes {
        parent_tag: tag_field(object, MOVE_PID)?,
        nodes,
    }))
}

fn decode_move2(object: &PropMap) -> WireResult<MutationRecord> {
    let tags = array_field(object, IDS)?
        .iter()
        .map(|id| as_tag(id, IDS))
        .collect::<WireResult<_>>()?;
    Ok(MutationRecord::Move2(Move2Nodes {
        tags,
        from_parent_tag: tag_field(object, FROM_PID)?,
        to_parent_tag: tag_field(object, TO_PID)?,
        index: i32_field(object, INDEX)?,
    }))
}

fn decode_layout(object: &PropMap, density: f32) -> WireResult<MutationRecord> {
    let dp = |key: &str| -> WireResult<f32> {
        let value = field(object, key)?;
        let px = value.as_f64().ok_or_else(|| mistyped(key, value))?;
        Ok((px / f64::from(density)) as f32)
    };
    let padding = if PADDING_KEYS.iter().any(|key| object.contains_key(*key)) {
        Some(Padding::new(
            dp(PADDING_KEYS[0])?,
            dp(PADDING_KEYS[1])?,
            dp(PADDING_KEYS[2])?,
            dp(PADDING_KEYS[3])?,
        ))
    } else {
        None
    };
    Ok(MutationRecord::UpdateLayout(LayoutUpdate {
        tag: tag_field(object, ID)?,
        frame: LayoutFrame::new(dp(LEFT)?, dp(TOP)?, dp(WIDTH)?, dp(HEIGHT)?),
        padding,
    }))
}

fn decode_listener(object: &PropMap) -> WireResult<MutationRecord> {
    let events = optional_object(object, PROPS)?
        .into_iter()
        .map(|(name, value)| match value.as_bool() {
            Some(add) => Ok((name, add)),
            None => Err(mistyped(PROPS, &value)),
        })
        .collect::<WireResult<IndexMap<_, _>>>()?;
    Ok(MutationRecord::UpdateEventListener(ListenerUpdate {
        tag: tag_field(object, ID)?,
        events,
    }))
}

// ============================================================================
// Field helpers
// ============================================================================

fn shape(message: String) -> WireError {
    WireError::Shape(message)
}

fn mistyped(key: &str, value: &PropValue) -> WireError {
    shape(format!("'{}' has unexpected type {}", key, value.type_name()))
}

fn into_array(payload: PropValue) -> WireResult<Vec<PropValue>> {
    match payload {
        PropValue::Array(items) => Ok(items),
        other => Err(shape(format!("expected array payload, got {}", other.type_name()))),
    }
}

fn into_object(payload: PropValue) -> WireResult<PropMap> {
    match payload {
        PropValue::Object(map) => Ok(map),
        other => Err(shape(format!("expected object payload, got {}", other.type_name()))),
    }
}

fn field<'a>(object: &'a PropMap, key: &str) -> WireResult<&'a PropValue> {
    object
        .get(key)
        .ok_or_else(|| shape(format!("missing '{}'", key)))
}

fn as_tag(value: &PropValue, key: &str) -> WireResult<Tag> {
    value.as_u32().ok_or_else(|| mistyped(key, value))
}

fn tag_field(object: &PropMap, key: &str) -> WireResult<Tag> {
    as_tag(field(object, key)?, key)
}

fn i32_field(object: &PropMap, key: &str) -> WireResult<i32> {
    let value = field(object, key)?;
    value.as_i32().ok_or_else(|| mistyped(key, value))
}

fn string_field(object: &PropMap, key: &str) -> WireResult<String> {
    let value = field(object, key)?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| mistyped(key, value))
}

fn array_field<'a>(object: &'a PropMap, key: &str) -> WireResult<&'a [PropValue]> {
    let value = field(object, key)?;
    value.as_array().ok_or_else(|| mistyped(key, value))
}

fn optional_object(object: &PropMap, key: &str) -> WireResult<PropMap> {
    match object.get(key) {
        None | Some(PropValue::Null) | Some(PropValue::Undefined) => Ok(PropMap::new()),
        Some(PropValue::Object(map)) => Ok(map.clone()),
        Some(other) => Err(mistyped(key, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::wire::{self, WIRE_VERSION};
    use smallvec::smallvec;

    fn through_wire(method: NativeMethod, payload: PropValue, density: f32) -> Vec<MutationRecord> {
        let bytes = wire::encode(WIRE_VERSION, &payload);
        let value = wire::decode(WIRE_VERSION, &bytes).unwrap();
        decode_payload(method, value, density).unwrap()
    }

    #[test]
    fn test_method_names() {
        for method in NativeMethod::ALL {
            assert_eq!(NativeMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(NativeMethod::from_name("endBatch"), None);
        assert_eq!(
            NativeMethod::for_kind(MutationKind::Move2),
            NativeMethod::MoveNode2
        );
    }

    #[test]
    fn test_create_and_update_records() {
        let create = CreateNode::new(2, 1, -1, "Text")
            .with_props(props! { "text" => "hi", "fontSize" => 14.0 })
            .with_parent_text(true);
        let records = through_wire(
            NativeMethod::CreateNode,
            encode_create(std::slice::from_ref(&create)),
            1.0,
        );
        assert_eq!(records, vec![MutationRecord::Create(create)]);

        let update = UpdateNode::new(2, 1, 0, "Text")
            .with_diff(props! { "color" => 0xff00ffu32 })
            .with_deleted(["fontSize"]);
        let records = through_wire(
            NativeMethod::UpdateNode,
            encode_update(std::slice::from_ref(&update)),
            1.0,
        );
        assert_eq!(records, vec![MutationRecord::Update(update)]);
    }

    #[test]
    fn test_move_records() {
        let moves = MoveNodes {
            parent_tag: 1,
            nodes: vec![
                MoveNodeInfo { tag: 3, index: 1 },
                MoveNodeInfo { tag: 2, index: 0 },
            ],
        };
        assert_eq!(
            through_wire(NativeMethod::MoveNode, encode_move(&moves), 1.0),
            vec![MutationRecord::Move(moves)]
        );

        let moves2 = Move2Nodes {
            tags: smallvec![4, 5],
            from_parent_tag: 1,
            to_parent_tag: 2,
            index: 3,
        };
        assert_eq!(
            through_wire(NativeMethod::MoveNode2, encode_move2(&moves2), 1.0),
            vec![MutationRecord::Move2(moves2)]
        );
    }

    #[test]
    fn test_layout_travels_in_px() {
        let layout = LayoutUpdate {
            tag: 7,
            frame: LayoutFrame::new(1.5, 2.0, 100.25, 33.3),
            padding: Some(Padding::new(1.0, 2.0, 3.0, 4.0)),
        };
        let payload = encode_layout(&[layout], 3.0);
        let width = payload.as_array().unwrap()[0].get("width").unwrap().as_f64();
        assert_eq!(width, Some(300.75));

        let records = through_wire(NativeMethod::UpdateLayout, payload, 3.0);
        assert_eq!(records, vec![MutationRecord::UpdateLayout(layout)]);
    }

    #[test]
    fn test_delete_and_listeners() {
        assert_eq!(
            through_wire(NativeMethod::DeleteNode, encode_delete(&[4, 9]), 1.0),
            vec![
                MutationRecord::Delete { tag: 4 },
                MutationRecord::Delete { tag: 9 }
            ]
        );

        let mut events = IndexMap::new();
        events.insert("scroll".to_string(), true);
        events.insert("click".to_string(), false);
        let listener = ListenerUpdate { tag: 3, events };
        assert_eq!(
            through_wire(
                NativeMethod::UpdateEventListener,
                encode_listeners(std::slice::from_ref(&listener)),
                1.0
            ),
            vec![MutationRecord::UpdateEventListener(listener)]
        );
    }

    #[test]
    fn test_malformed_payloads_fail_whole() {
        let payload = PropValue::Array(vec![
            PropValue::Uint32(1),
            PropValue::String("two".into()),
        ]);
        assert!(decode_payload(NativeMethod::DeleteNode, payload, 1.0).is_err());

        let missing_name = PropValue::Array(vec![PropValue::Object(props! {
            "id" => 1u32, "pId" => 0u32, "index" => 0,
        })]);
        assert_eq!(
            decode_payload(NativeMethod::CreateNode, missing_name, 1.0),
            Err(WireError::Shape("missing 'name'".into()))
        );

        assert!(decode_payload(NativeMethod::MoveNode, PropValue::Null, 1.0).is_err());
    }
}
