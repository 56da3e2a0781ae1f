//! In-process backend

use std::sync::Arc;

use trellis_core::{
    BackendKind, BridgeError, CreateNode, LayoutUpdate, ListenerUpdate, MeasureRequest,
    MeasureSize, Move2Nodes, MoveNodes, MutationRecord, Result, RootId, Tag, UpdateNode,
};

use super::{post_end_batch, post_records, DispatchBackend};
use crate::measure::MeasureChannel;
use crate::root::RootHandle;
use crate::ui_thread::TaskRunner;

/// Hands typed records straight to the UI thread
pub struct DirectBackend {
    root_id: RootId,
    root: RootHandle,
    runner: Arc<dyn TaskRunner>,
    measure: Arc<MeasureChannel>,
}

impl DirectBackend {
    pub fn new(
        root_id: RootId,
        root: RootHandle,
        runner: Arc<dyn TaskRunner>,
        measure: Arc<MeasureChannel>,
    ) -> Self {
        Self {
            root_id,
            root,
            runner,
            measure,
        }
    }

    fn post(&self, records: Vec<MutationRecord>) -> Result<()> {
        post_records(self.runner.as_ref(), self.root_id, &self.root, records)
    }
}

impl DispatchBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn root_id(&self) -> RootId {
        self.root_id
    }

    fn create_node(&self, nodes: Vec<CreateNode>) -> Result<()> {
        self.post(nodes.into_iter().map(MutationRecord::Create).collect())
    }

    fn update_node(&self, nodes: Vec<UpdateNode>) -> Result<()> {
        self.post(nodes.into_iter().map(MutationRecord::Update).collect())
    }

    fn move_node(&self, moves: MoveNodes) -> Result<()> {
        self.post(vec![MutationRecord::Move(moves)])
    }

    fn move_node2(&self, moves: Move2Nodes) -> Result<()> {
        self.post(vec![MutationRecord::Move2(moves)])
    }

    fn delete_node(&self, tags: Vec<Tag>) -> Result<()> {
        self.post(tags.into_iter().map(|tag| MutationRecord::Delete { tag }).collect())
    }

    fn update_layout(&self, layouts: Vec<LayoutUpdate>) -> Result<()> {
        self.post(layouts.into_iter().map(MutationRecord::UpdateLayout).collect())
    }

    fn update_event_listener(&self, listeners: Vec<ListenerUpdate>) -> Result<()> {
        self.post(
            listeners
                .into_iter()
                .map(MutationRecord::UpdateEventListener)
                .collect(),
        )
    }

    fn end_batch(&self) -> Result<()> {
        post_end_batch(self.runner.as_ref(), self.root_id, &self.root)
    }

    fn measure(&self, request: &MeasureRequest) -> Result<MeasureSize> {
        let density = self
            .root
            .upgrade()
            .map(|root| root.density())
            .ok_or(BridgeError::RootDetached(self.root_id))?;
        let request = MeasureRequest {
            root_id: self.root_id,
            ..request.scaled(density)
        };
        let packed = self.measure.request(self.runner.as_ref(), &self.root, request)?;
        Ok(MeasureSize::unpack(packed).scaled(1.0 / density))
    }
}

impl std::fmt::Debug for DirectBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectBackend")
            .field("root_id", &self.root_id)
            .finish_non_exhaustive()
    }
}
