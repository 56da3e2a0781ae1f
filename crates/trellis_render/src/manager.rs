//! View manager (mutation batcher)
//!
//! Per-root state machine that queues mutation records and applies them
//! in arrival order:
//!
//! ```text
//!            add_mutations            apply_mutations
//!   Idle ───────────────► Accumulating ───────────────► Applying
//!    ▲                                                     │
//!    └──────────── end-batch callbacks ◄───────────────────┘
//! ```
//!
//! Errors raised by a single record are logged and skipped; the rest of
//! the batch still applies.

use std::collections::BTreeMap;

use trellis_core::{
    validate_batch, BridgeError, MeasureRequest, MutationRecord, PropValue, Result, RootId, Tag,
};
use trellis_text::{MeasureConstraint, TextMeasurement, TextMeasurementEngine};

use crate::native::NativeViewFactory;
use crate::registry::ViewRegistry;
use crate::virtual_nodes::VirtualNodeTable;

/// Batching state of one root
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchState {
    #[default]
    Idle,
    Accumulating,
    Applying,
}

/// Outcome of one `apply_mutations` pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub applied: usize,
    pub errors: Vec<BridgeError>,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Callback run after every applied batch
pub type EndBatchCallback = Box<dyn FnMut() + Send>;

/// Id returned by [`ViewManager::add_end_batch_callback`]
pub type CallbackId = u64;

pub struct ViewManager {
    root_id: RootId,
    state: BatchState,
    pending: Vec<MutationRecord>,
    registry: ViewRegistry,
    virtual_nodes: VirtualNodeTable,
    end_batch_callbacks: BTreeMap<CallbackId, EndBatchCallback>,
    next_callback_id: CallbackId,
    text_engine: TextMeasurementEngine,
}

impl ViewManager {
    /// Manager whose root view has tag `root_id`
    pub fn new(
        root_id: RootId,
        factory: Box<dyn NativeViewFactory>,
        text_engine: TextMeasurementEngine,
    ) -> Self {
        Self {
            root_id,
            state: BatchState::Idle,
            pending: Vec::new(),
            registry: ViewRegistry::new(root_id, factory),
            virtual_nodes: VirtualNodeTable::new(root_id),
            end_batch_callbacks: BTreeMap::new(),
            next_callback_id: 1,
            text_engine,
        }
    }

    pub fn root_id(&self) -> RootId {
        self.root_id
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ViewRegistry {
        &mut self.registry
    }

    pub fn virtual_nodes(&self) -> &VirtualNodeTable {
        &self.virtual_nodes
    }

    /// Queue records for the next `apply_mutations`
    pub fn add_mutations(&mut self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        if let Some(tag) = validate_batch(&records) {
            tracing::warn!(root_id = self.root_id, tag, "batch reuses a created or deleted tag");
        }
        for record in &records {
            self.virtual_nodes.apply(record);
        }
        self.pending.extend(records);
        self.state = BatchState::Accumulating;
    }

    /// Apply every queued record in order, then run end-batch callbacks
    pub fn apply_mutations(&mut self) -> BatchReport {
        self.state = BatchState::Applying;
        let records = std::mem::take(&mut self.pending);
        let mut report = BatchReport::default();

        for record in &records {
            tracing::trace!(root_id = self.root_id, kind = record.kind().name(), tag = ?record.tag(), "apply");
            match self.apply_record(record) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    tracing::warn!(root_id = self.root_id, kind = record.kind().name(), "{}", err);
                    report.errors.push(err);
                }
            }
        }

        self.state = BatchState::Idle;
        tracing::debug!(
            root_id = self.root_id,
            applied = report.applied,
            skipped = report.skipped(),
            "batch applied"
        );
        self.notify_end_batch_callbacks();
        report
    }

    fn apply_record(&mut self, record: &MutationRecord) -> Result<()> {
        match record {
            MutationRecord::Create(node) => self.registry.create(node),
            MutationRecord::Update(node) => self.registry.update(node),
            MutationRecord::Move(moves) => {
                let skipped = self.registry.move_children(moves)?;
                if !skipped.is_empty() {
                    tracing::warn!(parent = moves.parent_tag, ?skipped, "move skipped nodes");
                }
                Ok(())
            }
            MutationRecord::Move2(moves) => {
                let skipped = self.registry.move2(moves)?;
                if !skipped.is_empty() {
                    tracing::warn!(parent = moves.to_parent_tag, ?skipped, "move2 skipped nodes");
                }
                Ok(())
            }
            MutationRecord::Delete { tag } => self.registry.remove(*tag).map(|_| ()),
            MutationRecord::UpdateLayout(layout) => self.registry.set_frame(layout),
            MutationRecord::UpdateEventListener(update) => self.registry.update_event_listener(update),
        }
    }

    /// Drop queued records without applying them
    pub fn cancel_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.state = BatchState::Idle;
        dropped
    }

    // =========================================================================
    // End-batch callbacks
    // =========================================================================

    pub fn add_end_batch_callback(&mut self, callback: impl FnMut() + Send + 'static) -> CallbackId {
        let id = self.next_callback_id;
        self.next_callback_id += 1;
        self.end_batch_callbacks.insert(id, Box::new(callback));
        id
    }

    /// Unknown or already removed ids are ignored
    pub fn remove_end_batch_callback(&mut self, id: CallbackId) {
        self.end_batch_callbacks.remove(&id);
    }

    /// Run callbacks in registration order
    pub fn notify_end_batch_callbacks(&mut self) {
        for callback in self.end_batch_callbacks.values_mut() {
            callback();
        }
    }

    // =========================================================================
    // Measurement and widget calls
    // =========================================================================

    /// Measure a text node (dp), writing image span positions back
    pub fn measure_text(&mut self, request: &MeasureRequest) -> Result<TextMeasurement> {
        let job = self
            .virtual_nodes
            .measure_job(request.tag)
            .ok_or(BridgeError::UnknownTag(request.tag))?;
        let measurement = self
            .text_engine
            .measure(&job, &MeasureConstraint::from(request));

        for (id, position) in job.image_ids().into_iter().zip(&measurement.image_positions) {
            if let Some(tag) = id {
                self.registry.set_span_position(tag, *position);
            }
        }
        Ok(measurement)
    }

    pub fn call_view_method(
        &mut self,
        tag: Tag,
        method: &str,
        params: &PropValue,
    ) -> Result<std::result::Result<PropValue, String>> {
        self.registry.call_method(tag, method, params)
    }

    /// Release every view and forget queued state
    pub fn teardown(&mut self) {
        let dropped = self.cancel_pending();
        if dropped > 0 {
            tracing::warn!(root_id = self.root_id, dropped, "pending records dropped on teardown");
        }
        self.end_batch_callbacks.clear();
        self.virtual_nodes.clear();
        self.registry.teardown();
    }
}

impl std::fmt::Debug for ViewManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewManager")
            .field("root_id", &self.root_id)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
