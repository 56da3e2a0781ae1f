//! Trellis Core
//!
//! Shared vocabulary of the Trellis render bridge, which connects a
//! script-driven document engine to a retained native widget tree:
//!
//! - **Mutation records**: tree edits produced by the document diff stage
//! - **Property values**: ordered, dynamically typed prop maps
//! - **Events**: native events and callback completions flowing back
//! - **Measurement**: request/result types for the blocking text measure
//! - **Wire format**: versioned binary encoding for the serialized backend
//! - **Configuration**: `BridgeConfig` presets loadable from TOML
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{codec, props, wire, CreateNode, MutationRecord, WIRE_VERSION};
//!
//! let create = CreateNode::new(1, 0, 0, "Text").with_props(props! { "text" => "hello" });
//!
//! let bytes = wire::encode(WIRE_VERSION, &codec::encode_create(&[create.clone()]));
//! let payload = wire::decode(WIRE_VERSION, &bytes).unwrap();
//! let records = codec::decode_payload(codec::NativeMethod::CreateNode, payload, 1.0).unwrap();
//!
//! assert_eq!(records, vec![MutationRecord::Create(create)]);
//! ```

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod measure;
pub mod mutation;
pub mod props;
pub mod value;
pub mod wire;

pub use codec::NativeMethod;
pub use config::{BackendKind, BridgeConfig};
pub use document::{DocumentNode, ListenerOps, IMAGE_VIEW_NAME, TEXT_VIEW_NAME};
pub use error::{BridgeError, Result};
pub use event::{
    is_gesture_event, CallbackCompletion, CallbackStatus, DocumentMessage, UiEvent,
};
pub use measure::{MeasureMode, MeasureRequest, MeasureSize, SpanPosition};
pub use mutation::{
    validate_batch, CreateNode, LayoutFrame, LayoutUpdate, ListenerUpdate, Move2Nodes,
    MoveNodeInfo, MoveNodes, MutationKind, MutationRecord, Padding, RootId, Tag, UpdateNode,
};
pub use props::{is_text_dirty, StyleFilter};
pub use value::{PropMap, PropValue};
pub use wire::{WireError, WIRE_VERSION};
