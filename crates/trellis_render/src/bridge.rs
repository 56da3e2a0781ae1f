//! Render bridge facade
//!
//! [`RenderBridge`] wires the pieces together for a host: one UI-side task
//! runner, the table of attached roots, the measurement channel and one
//! dispatch backend per root.
//!
//! ```text
//!              document thread                 │          UI thread
//! ─────────────────────────────────────────────┼──────────────────────────────
//! bridge.backend(root) ── create/update/... ───┼──► UiContext ─► ViewManager
//!                       ── measure (blocking) ─┼──► TextMeasurementEngine
//! DocumentMessage  ◄────────── EventBridge ◄───┼─── native events, callbacks
//! ```
//!
//! Roots are owned by the bridge; backends and queued tasks only hold weak
//! handles, so detaching a root turns every later call for it into a logged
//! no-op.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use trellis_core::{
    BackendKind, BridgeConfig, BridgeError, DocumentMessage, PropValue, Result, RootId, Tag,
    UiEvent,
};
use trellis_text::TextMeasurementEngine;

use crate::backend::{DirectBackend, DispatchBackend, SerializedBackend, SerializedEndpoint};
use crate::context::UiContext;
use crate::event_bridge::DocumentSink;
use crate::measure::MeasureChannel;
use crate::native::NativeViewFactory;
use crate::registry::ViewSnapshot;
use crate::root::{RootDocument, RootTable};
use crate::ui_thread::{call_sync, InlineRunner, TaskRunner, UiThread};

/// Upper bound for blocking tree queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RenderBridge {
    config: BridgeConfig,
    runner: Arc<dyn TaskRunner>,
    roots: Arc<RootTable>,
    measure: Arc<MeasureChannel>,
    endpoint: Arc<SerializedEndpoint>,
    backends: RwLock<FxHashMap<RootId, Arc<dyn DispatchBackend>>>,
}

impl RenderBridge {
    /// Bridge with a dedicated UI thread
    pub fn new(config: BridgeConfig, sink: Box<dyn DocumentSink>) -> Result<Self> {
        config.validate()?;
        let context = UiContext::new(TextMeasurementEngine::new(), sink);
        let ui = UiThread::spawn(context)
            .map_err(|err| BridgeError::Config(format!("failed to spawn UI thread: {err}")))?;
        Ok(Self::with_runner(config, Arc::new(ui)))
    }

    /// Bridge running UI tasks on the posting thread
    pub fn inline(config: BridgeConfig, sink: Box<dyn DocumentSink>) -> Result<Self> {
        config.validate()?;
        let context = UiContext::new(TextMeasurementEngine::new(), sink);
        Ok(Self::with_runner(config, Arc::new(InlineRunner::new(context))))
    }

    /// Bridge over a host-provided runner
    pub fn with_runner(config: BridgeConfig, runner: Arc<dyn TaskRunner>) -> Self {
        let roots = Arc::new(RootTable::new());
        let measure = Arc::new(MeasureChannel::new(config.measure_timeout()));
        let endpoint = Arc::new(SerializedEndpoint::new(
            Arc::clone(&runner),
            Arc::clone(&roots),
            Arc::clone(&measure),
            config.wire_version,
        ));
        Self {
            config,
            runner,
            roots,
            measure,
            endpoint,
            backends: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Receiving side of serialized backends, for hosts feeding raw buffers
    pub fn endpoint(&self) -> &Arc<SerializedEndpoint> {
        &self.endpoint
    }

    pub fn roots(&self) -> &RootTable {
        &self.roots
    }

    // ========================================================================
    // Root lifetime
    // ========================================================================

    /// Attach a root using the configured backend
    pub fn attach_root(
        &self,
        root_id: RootId,
        factory: Box<dyn NativeViewFactory>,
    ) -> Result<Arc<dyn DispatchBackend>> {
        self.attach_root_with(root_id, factory, self.config.backend)
    }

    pub fn attach_root_with(
        &self,
        root_id: RootId,
        factory: Box<dyn NativeViewFactory>,
        kind: BackendKind,
    ) -> Result<Arc<dyn DispatchBackend>> {
        let root = self
            .roots
            .attach(RootDocument::new(root_id, self.config.density, kind))?;
        if !self.runner.post(Box::new(move |ctx| ctx.attach(root_id, factory))) {
            let _ = self.roots.detach(root_id);
            return Err(BridgeError::RootDetached(root_id));
        }

        let backend: Arc<dyn DispatchBackend> = match kind {
            BackendKind::Direct => Arc::new(DirectBackend::new(
                root_id,
                root,
                Arc::clone(&self.runner),
                Arc::clone(&self.measure),
            )),
            BackendKind::Serialized => Arc::new(SerializedBackend::new(
                root_id,
                root,
                Arc::clone(&self.endpoint),
            )),
        };
        self.backends.write().insert(root_id, Arc::clone(&backend));
        tracing::debug!(root_id, backend = ?kind, density = self.config.density, "root attached");
        Ok(backend)
    }

    /// Detach a root: pending measurements return, queued work is dropped
    /// and the views are released on the UI thread
    pub fn detach_root(&self, root_id: RootId) -> Result<()> {
        self.roots.detach(root_id)?;
        let cancelled = self.measure.cancel_root(root_id);
        self.backends.write().remove(&root_id);
        // posted directly: the root handle is already dead
        self.runner.post(Box::new(move |ctx| {
            ctx.detach(root_id);
        }));
        tracing::debug!(root_id, cancelled, "root detached");
        Ok(())
    }

    pub fn backend(&self, root_id: RootId) -> Option<Arc<dyn DispatchBackend>> {
        self.backends.read().get(&root_id).cloned()
    }

    // ========================================================================
    // UI-side entry points
    // ========================================================================

    /// Route a native event through the event bridge
    pub fn dispatch_event(&self, event: UiEvent) -> bool {
        if !self.roots.contains(event.root_id) {
            tracing::debug!(root_id = event.root_id, event = %event.name, "root detached, event dropped");
            return false;
        }
        self.runner.post(Box::new(move |ctx| {
            ctx.dispatch_event(event);
        }))
    }

    /// The root surface changed size (dp)
    pub fn update_root_size(&self, root_id: RootId, width: f32, height: f32) -> Result<()> {
        self.send(DocumentMessage::RootResized {
            root_id,
            width,
            height,
        })
    }

    /// A native view changed size on its own (dp)
    pub fn update_node_size(&self, root_id: RootId, tag: Tag, width: f32, height: f32) -> Result<()> {
        self.send(DocumentMessage::NodeResized {
            root_id,
            tag,
            width,
            height,
        })
    }

    fn send(&self, message: DocumentMessage) -> Result<()> {
        let root_id = message.root_id();
        if !self.roots.contains(root_id) {
            return Err(BridgeError::RootDetached(root_id));
        }
        self.runner.post(Box::new(move |ctx| ctx.send(message)));
        Ok(())
    }

    /// Invoke a widget method; the result arrives as a callback completion
    pub fn call_view_method(
        &self,
        root_id: RootId,
        tag: Tag,
        method: impl Into<String>,
        params: PropValue,
        cb_id: u32,
    ) -> Result<()> {
        if !self.roots.contains(root_id) {
            return Err(BridgeError::RootDetached(root_id));
        }
        let method = method.into();
        self.runner.post(Box::new(move |ctx| {
            ctx.call_view_method(root_id, tag, &method, &params, cb_id)
        }));
        Ok(())
    }

    // ========================================================================
    // Blocking queries
    // ========================================================================

    /// Run `f` on the UI side and wait for its result
    pub fn with_ui<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut UiContext) -> R + Send + 'static,
    {
        call_sync(self.runner.as_ref(), QUERY_TIMEOUT, f)
    }

    pub fn view_parent(&self, root_id: RootId, tag: Tag) -> Option<Tag> {
        self.with_ui(move |ctx| ctx.manager(root_id)?.registry().parent_of(tag))
            .flatten()
    }

    pub fn view_children(&self, root_id: RootId, tag: Tag) -> Option<Vec<Tag>> {
        self.with_ui(move |ctx| ctx.manager(root_id)?.registry().children_of(tag))
            .flatten()
    }

    /// Copy of a root's applied view tree
    pub fn snapshot(&self, root_id: RootId) -> Option<ViewSnapshot> {
        self.with_ui(move |ctx| ctx.manager(root_id).map(|m| m.registry().snapshot()))
            .flatten()
    }
}

impl Drop for RenderBridge {
    fn drop(&mut self) {
        let attached: Vec<RootId> = self.backends.read().keys().copied().collect();
        for root_id in attached {
            let _ = self.detach_root(root_id);
        }
    }
}

impl std::fmt::Debug for RenderBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBridge")
            .field("config", &self.config)
            .field("roots", &self.roots.len())
            .field("measure", &self.measure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bridge::RecordingSink;
    use crate::native::HeadlessViewFactory;
    use trellis_core::{event::names, CreateNode, ListenerUpdate};

    fn bridge(sink: &RecordingSink) -> RenderBridge {
        RenderBridge::inline(BridgeConfig::testing(), Box::new(sink.clone())).unwrap()
    }

    #[test]
    fn test_attach_twice_is_refused() {
        let sink = RecordingSink::new();
        let bridge = bridge(&sink);
        bridge.attach_root(0, Box::new(HeadlessViewFactory::new())).unwrap();
        let again = bridge.attach_root(0, Box::new(HeadlessViewFactory::new()));
        assert!(matches!(again, Err(BridgeError::RootAlreadyAttached(0))));
    }

    #[test]
    fn test_tree_queries() {
        let sink = RecordingSink::new();
        let bridge = bridge(&sink);
        let backend = bridge.attach_root(0, Box::new(HeadlessViewFactory::new())).unwrap();
        backend
            .create_node(vec![
                CreateNode::new(1, 0, 0, "View"),
                CreateNode::new(2, 1, 0, "View"),
                CreateNode::new(3, 1, 1, "View"),
            ])
            .unwrap();
        backend.end_batch().unwrap();

        assert_eq!(bridge.view_parent(0, 2), Some(1));
        assert_eq!(bridge.view_children(0, 1), Some(vec![2, 3]));
        assert_eq!(bridge.view_parent(0, 42), None);
        assert_eq!(bridge.snapshot(0).map(|s| s.children.len()), Some(1));
    }

    #[test]
    fn test_detached_root_drops_calls() {
        let sink = RecordingSink::new();
        let bridge = bridge(&sink);
        let backend = bridge.attach_root(0, Box::new(HeadlessViewFactory::new())).unwrap();
        bridge.detach_root(0).unwrap();

        assert_eq!(
            backend.create_node(vec![CreateNode::new(1, 0, 0, "View")]),
            Err(BridgeError::RootDetached(0))
        );
        assert!(bridge.backend(0).is_none());
        assert!(bridge.snapshot(0).is_none());
        assert!(!bridge.dispatch_event(UiEvent::new(0, 1, names::CLICK)));
        assert_eq!(bridge.update_root_size(0, 1.0, 1.0), Err(BridgeError::RootDetached(0)));
        assert_eq!(bridge.detach_root(0), Err(BridgeError::RootDetached(0)));
    }

    #[test]
    fn test_events_and_resizes_reach_document() {
        let sink = RecordingSink::new();
        let bridge = bridge(&sink);
        let backend = bridge.attach_root(0, Box::new(HeadlessViewFactory::new())).unwrap();
        backend.create_node(vec![CreateNode::new(1, 0, 0, "View")]).unwrap();
        backend
            .update_event_listener(vec![ListenerUpdate::new(1).with_event(names::SCROLL, true)])
            .unwrap();
        backend.end_batch().unwrap();

        assert!(bridge.dispatch_event(UiEvent::new(0, 1, names::SCROLL)));
        bridge.update_root_size(0, 320.0, 480.0).unwrap();
        bridge.update_node_size(0, 1, 10.0, 10.0).unwrap();
        bridge
            .call_view_method(0, 1, "focus", PropValue::Null, 7)
            .unwrap();

        let messages = sink.take();
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], DocumentMessage::Event(_)));
        assert!(matches!(messages[1], DocumentMessage::RootResized { width, .. } if width == 320.0));
        assert!(matches!(messages[2], DocumentMessage::NodeResized { tag: 1, .. }));
        assert!(matches!(&messages[3], DocumentMessage::Callback(cb) if cb.cb_id == 7));
    }
}
