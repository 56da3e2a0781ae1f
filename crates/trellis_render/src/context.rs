//! UI-side state
//!
//! [`UiContext`] owns everything that lives on the UI thread: one
//! [`ViewManager`] per attached root, the shared text engine and the
//! [`EventBridge`]. It is only ever reached through UI tasks.

use rustc_hash::FxHashMap;
use trellis_core::{
    CallbackCompletion, CallbackStatus, DocumentMessage, MeasureRequest, MeasureSize,
    MutationRecord, PropValue, RootId, Tag, UiEvent,
};
use trellis_text::TextMeasurementEngine;

use crate::event_bridge::{DocumentSink, EventBridge};
use crate::manager::{BatchReport, ViewManager};
use crate::native::NativeViewFactory;

pub struct UiContext {
    managers: FxHashMap<RootId, ViewManager>,
    text_engine: TextMeasurementEngine,
    events: EventBridge,
}

impl UiContext {
    pub fn new(text_engine: TextMeasurementEngine, sink: Box<dyn DocumentSink>) -> Self {
        Self {
            managers: FxHashMap::default(),
            text_engine,
            events: EventBridge::new(sink),
        }
    }

    pub fn attach(&mut self, root_id: RootId, factory: Box<dyn NativeViewFactory>) {
        let manager = ViewManager::new(root_id, factory, self.text_engine.clone());
        if self.managers.insert(root_id, manager).is_some() {
            tracing::warn!(root_id, "root re-attached, previous views released");
        }
        tracing::debug!(root_id, "root attached");
    }

    /// Tear a root down, dropping its queued records
    pub fn detach(&mut self, root_id: RootId) -> bool {
        match self.managers.remove(&root_id) {
            Some(mut manager) => {
                manager.teardown();
                tracing::debug!(root_id, "root detached");
                true
            }
            None => false,
        }
    }

    pub fn manager(&self, root_id: RootId) -> Option<&ViewManager> {
        self.managers.get(&root_id)
    }

    pub fn manager_mut(&mut self, root_id: RootId) -> Option<&mut ViewManager> {
        self.managers.get_mut(&root_id)
    }

    pub fn roots(&self) -> Vec<RootId> {
        let mut roots: Vec<RootId> = self.managers.keys().copied().collect();
        roots.sort_unstable();
        roots
    }

    pub fn events(&self) -> &EventBridge {
        &self.events
    }

    pub fn add_mutations(&mut self, root_id: RootId, records: Vec<MutationRecord>) {
        match self.managers.get_mut(&root_id) {
            Some(manager) => manager.add_mutations(records),
            None => tracing::warn!(root_id, dropped = records.len(), "records for unknown root dropped"),
        }
    }

    pub fn end_batch(&mut self, root_id: RootId) -> Option<BatchReport> {
        self.managers
            .get_mut(&root_id)
            .map(ViewManager::apply_mutations)
    }

    /// Measure with lengths in device pixels, answering packed pixels
    ///
    /// Any failure answers zero so the layout pass can continue.
    pub fn measure_packed(&mut self, request: &MeasureRequest, density: f32) -> i64 {
        let Some(manager) = self.managers.get_mut(&request.root_id) else {
            return 0;
        };
        match manager.measure_text(&request.scaled(1.0 / density)) {
            Ok(measurement) => measurement.size().scaled(density).pack(),
            Err(err) => {
                tracing::warn!(root_id = request.root_id, tag = request.tag, "{}", err);
                MeasureSize::ZERO.pack()
            }
        }
    }

    pub fn dispatch_event(&mut self, event: UiEvent) -> bool {
        let registry = self.managers.get(&event.root_id).map(ViewManager::registry);
        self.events.dispatch_event(registry, event)
    }

    pub fn send(&mut self, message: DocumentMessage) {
        if !self.managers.contains_key(&message.root_id()) {
            tracing::debug!(root_id = message.root_id(), "root detached, message dropped");
            return;
        }
        self.events.send(message);
    }

    /// Invoke a widget method and report the result as a callback completion
    pub fn call_view_method(
        &mut self,
        root_id: RootId,
        tag: Tag,
        method: &str,
        params: &PropValue,
        cb_id: u32,
    ) {
        let Some(manager) = self.managers.get_mut(&root_id) else {
            tracing::debug!(root_id, tag, method, "root detached, call dropped");
            return;
        };
        let (status, result) = match manager.call_view_method(tag, method, params) {
            Ok(Ok(value)) => (CallbackStatus::Ok, value),
            Ok(Err(message)) => (CallbackStatus::Failed, PropValue::String(message)),
            Err(err) => (CallbackStatus::Failed, PropValue::String(err.to_string())),
        };
        self.events.send(DocumentMessage::Callback(CallbackCompletion {
            root_id,
            tag,
            cb_id,
            method: method.to_string(),
            status,
            result,
        }));
    }
}

impl std::fmt::Debug for UiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiContext")
            .field("roots", &self.roots())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
