//! Serialized backend
//!
//! Each call becomes `(method name, root id, bytes)`. The bytes are a
//! versioned wire buffer holding the call's payload; the endpoint on the
//! far side decodes them back into records before they are queued:
//!
//! ```text
//! SerializedBackend                  SerializedEndpoint
//! ─────────────────                  ──────────────────
//! codec::encode_*  ──► wire::encode ──► wire::decode ──► codec::decode_payload
//!                                                         │
//!                                                         ▼
//!                                                    UI thread queue
//! ```
//!
//! A buffer that fails to decode is rejected as a whole; none of its
//! records reach the UI side.

use std::sync::Arc;

use trellis_core::{
    codec, wire, BackendKind, BridgeError, CreateNode, LayoutUpdate, ListenerUpdate,
    MeasureMode, MeasureRequest, MeasureSize, Move2Nodes, MoveNodes, NativeMethod, PropValue,
    Result, RootId, Tag, UpdateNode,
};

use super::{post_end_batch, post_records, DispatchBackend};
use crate::measure::MeasureChannel;
use crate::root::{RootHandle, RootTable};
use crate::ui_thread::TaskRunner;

// ============================================================================
// Endpoint
// ============================================================================

/// Receiving side of the serialized boundary
///
/// Shared by every serialized root; lookups go through the root table so a
/// buffer for a detached root is refused before it is decoded.
pub struct SerializedEndpoint {
    runner: Arc<dyn TaskRunner>,
    roots: Arc<RootTable>,
    measure: Arc<MeasureChannel>,
    wire_version: u32,
}

impl SerializedEndpoint {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        roots: Arc<RootTable>,
        measure: Arc<MeasureChannel>,
        wire_version: u32,
    ) -> Self {
        Self {
            runner,
            roots,
            measure,
            wire_version,
        }
    }

    pub fn wire_version(&self) -> u32 {
        self.wire_version
    }

    fn root(&self, root_id: RootId) -> Result<RootHandle> {
        self.roots.handle(root_id).ok_or_else(|| {
            tracing::warn!(root_id, "call for detached root dropped");
            BridgeError::RootDetached(root_id)
        })
    }

    /// Decode one buffer and queue its records
    pub fn call_native_method(&self, method: &str, root_id: RootId, bytes: &[u8]) -> Result<()> {
        let Some(native_method) = NativeMethod::from_name(method) else {
            tracing::error!(method, root_id, "unknown native method");
            return Err(BridgeError::BackendMismatch(format!("unknown method '{method}'")));
        };
        let root = self.root(root_id)?;
        let density = root
            .upgrade()
            .map(|root| root.density())
            .ok_or(BridgeError::RootDetached(root_id))?;

        let records = wire::decode(self.wire_version, bytes)
            .and_then(|payload| codec::decode_payload(native_method, payload, density));
        match records {
            Ok(records) => {
                tracing::trace!(method, root_id, count = records.len(), "payload decoded");
                post_records(self.runner.as_ref(), root_id, &root, records)
            }
            Err(err) => {
                tracing::error!(method, root_id, bytes = bytes.len(), "payload rejected: {}", err);
                Err(err.into())
            }
        }
    }

    pub fn end_batch(&self, root_id: RootId) -> Result<()> {
        let root = self.root(root_id)?;
        post_end_batch(self.runner.as_ref(), root_id, &root)
    }

    /// Blocking measurement with lengths in device pixels and raw mode codes
    pub fn measure_text(
        &self,
        root_id: RootId,
        tag: Tag,
        width: f32,
        width_mode: i32,
        height: f32,
        height_mode: i32,
    ) -> Result<i64> {
        let root = self.root(root_id)?;
        let request = MeasureRequest::new(root_id, tag)
            .with_width(width, MeasureMode::from_code(width_mode))
            .with_height(height, MeasureMode::from_code(height_mode));
        self.measure.request(self.runner.as_ref(), &root, request)
    }
}

impl std::fmt::Debug for SerializedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedEndpoint")
            .field("wire_version", &self.wire_version)
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Encodes every call into a wire buffer for the endpoint
pub struct SerializedBackend {
    root_id: RootId,
    root: RootHandle,
    endpoint: Arc<SerializedEndpoint>,
}

impl SerializedBackend {
    pub fn new(root_id: RootId, root: RootHandle, endpoint: Arc<SerializedEndpoint>) -> Self {
        Self {
            root_id,
            root,
            endpoint,
        }
    }

    fn density(&self) -> Result<f32> {
        self.root
            .upgrade()
            .map(|root| root.density())
            .ok_or(BridgeError::RootDetached(self.root_id))
    }

    /// A re-attached root with the same id is a different document
    fn ensure_alive(&self) -> Result<()> {
        if self.root.strong_count() == 0 {
            tracing::warn!(root_id = self.root_id, "root detached, call dropped");
            return Err(BridgeError::RootDetached(self.root_id));
        }
        Ok(())
    }

    fn call(&self, method: NativeMethod, payload: PropValue) -> Result<()> {
        self.ensure_alive()?;
        let bytes = wire::encode(self.endpoint.wire_version(), &payload);
        tracing::trace!(method = method.name(), root_id = self.root_id, bytes = bytes.len(), "call");
        self.endpoint
            .call_native_method(method.name(), self.root_id, &bytes)
    }
}

impl DispatchBackend for SerializedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Serialized
    }

    fn root_id(&self) -> RootId {
        self.root_id
    }

    fn create_node(&self, nodes: Vec<CreateNode>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.call(NativeMethod::CreateNode, codec::encode_create(&nodes))
    }

    fn update_node(&self, nodes: Vec<UpdateNode>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.call(NativeMethod::UpdateNode, codec::encode_update(&nodes))
    }

    fn move_node(&self, moves: MoveNodes) -> Result<()> {
        self.call(NativeMethod::MoveNode, codec::encode_move(&moves))
    }

    fn move_node2(&self, moves: Move2Nodes) -> Result<()> {
        self.call(NativeMethod::MoveNode2, codec::encode_move2(&moves))
    }

    fn delete_node(&self, tags: Vec<Tag>) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }
        self.call(NativeMethod::DeleteNode, codec::encode_delete(&tags))
    }

    fn update_layout(&self, layouts: Vec<LayoutUpdate>) -> Result<()> {
        if layouts.is_empty() {
            return Ok(());
        }
        let density = self.density()?;
        self.call(NativeMethod::UpdateLayout, codec::encode_layout(&layouts, density))
    }

    fn update_event_listener(&self, listeners: Vec<ListenerUpdate>) -> Result<()> {
        if listeners.is_empty() {
            return Ok(());
        }
        self.call(
            NativeMethod::UpdateEventListener,
            codec::encode_listeners(&listeners),
        )
    }

    fn end_batch(&self) -> Result<()> {
        self.ensure_alive()?;
        self.endpoint.end_batch(self.root_id)
    }

    fn measure(&self, request: &MeasureRequest) -> Result<MeasureSize> {
        let density = self.density()?;
        let px = request.scaled(density);
        let packed = self.endpoint.measure_text(
            self.root_id,
            px.tag,
            px.width,
            px.width_mode.code(),
            px.height,
            px.height_mode.code(),
        )?;
        Ok(MeasureSize::unpack(packed).scaled(1.0 / density))
    }
}

impl std::fmt::Debug for SerializedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedBackend")
            .field("root_id", &self.root_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UiContext;
    use crate::event_bridge::RecordingSink;
    use crate::native::HeadlessViewFactory;
    use crate::root::RootDocument;
    use crate::ui_thread::InlineRunner;
    use std::time::Duration;
    use trellis_core::{props, WIRE_VERSION};
    use trellis_text::TextMeasurementEngine;

    fn setup() -> (Arc<InlineRunner>, Arc<SerializedEndpoint>, RootHandle, Arc<RootTable>) {
        let mut ctx = UiContext::new(TextMeasurementEngine::new(), Box::new(RecordingSink::new()));
        ctx.attach(0, Box::new(HeadlessViewFactory::new()));
        let runner = Arc::new(InlineRunner::new(ctx));
        let roots = Arc::new(RootTable::new());
        let root = roots
            .attach(RootDocument::new(0, 1.0, BackendKind::Serialized))
            .unwrap();
        let endpoint = Arc::new(SerializedEndpoint::new(
            runner.clone(),
            Arc::clone(&roots),
            Arc::new(MeasureChannel::new(Duration::from_secs(1))),
            WIRE_VERSION,
        ));
        (runner, endpoint, root, roots)
    }

    fn view_count(runner: &InlineRunner) -> usize {
        let (tx, rx) = std::sync::mpsc::channel();
        runner.post(Box::new(move |ctx| {
            let _ = tx.send(ctx.manager(0).map(|m| m.registry().len()).unwrap_or(0));
        }));
        rx.recv().unwrap()
    }

    #[test]
    fn test_create_through_wire() {
        let (runner, endpoint, root, _roots) = setup();
        let backend = SerializedBackend::new(0, root, endpoint);
        backend
            .create_node(vec![
                CreateNode::new(1, 0, 0, "View").with_props(props! { "opacity" => 0.5 }),
                CreateNode::new(2, 1, 0, "Text").with_props(props! { "text" => "hi" }),
            ])
            .unwrap();
        backend.end_batch().unwrap();
        // root plus two views
        assert_eq!(view_count(&runner), 3);
    }

    #[test]
    fn test_version_mismatch_rejects_buffer() {
        let (runner, endpoint, _root, _roots) = setup();
        let payload = codec::encode_create(&[CreateNode::new(1, 0, 0, "View")]);
        let bytes = wire::encode(WIRE_VERSION + 1, &payload);
        let result = endpoint.call_native_method("createNode", 0, &bytes);
        assert!(matches!(result, Err(BridgeError::BackendMismatch(_))));
        endpoint.end_batch(0).unwrap();
        assert_eq!(view_count(&runner), 1);
    }

    #[test]
    fn test_unknown_method_and_detached_root() {
        let (_runner, endpoint, _root, roots) = setup();
        let bytes = wire::encode(WIRE_VERSION, &PropValue::Array(Vec::new()));
        assert!(matches!(
            endpoint.call_native_method("frobnicate", 0, &bytes),
            Err(BridgeError::BackendMismatch(_))
        ));
        roots.detach(0).unwrap();
        assert_eq!(
            endpoint.call_native_method("deleteNode", 0, &bytes),
            Err(BridgeError::RootDetached(0))
        );
    }
}
