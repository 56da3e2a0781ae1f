//! Dispatch backends
//!
//! One contract, two deliveries of the same mutation stream:
//!
//! - [`DirectBackend`]: records are handed to the UI thread as typed
//!   values, in process
//! - [`SerializedBackend`]: every call is encoded into a versioned binary
//!   buffer and pushed through a [`SerializedEndpoint`], the way a foreign
//!   boundary would carry it
//!
//! Both are chosen per root at attach time and must leave identical view
//! trees behind for identical input.

mod direct;
mod serialized;

pub use direct::DirectBackend;
pub use serialized::{SerializedBackend, SerializedEndpoint};

use trellis_core::{
    BackendKind, BridgeError, CreateNode, LayoutUpdate, ListenerUpdate, MeasureRequest,
    MeasureSize, Move2Nodes, MoveNodes, MutationKind, MutationRecord, Result, RootId, Tag,
    UpdateNode,
};

use crate::context::UiContext;
use crate::root::RootHandle;
use crate::ui_thread::TaskRunner;

/// Delivery of one root's mutation stream to the UI side
///
/// Calls other than [`measure`](DispatchBackend::measure) are fire and
/// forget: they queue work and return. Nothing is applied until
/// [`end_batch`](DispatchBackend::end_batch).
pub trait DispatchBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn root_id(&self) -> RootId;

    fn create_node(&self, nodes: Vec<CreateNode>) -> Result<()>;

    fn update_node(&self, nodes: Vec<UpdateNode>) -> Result<()>;

    fn move_node(&self, moves: MoveNodes) -> Result<()>;

    fn move_node2(&self, moves: Move2Nodes) -> Result<()>;

    fn delete_node(&self, tags: Vec<Tag>) -> Result<()>;

    fn update_layout(&self, layouts: Vec<LayoutUpdate>) -> Result<()>;

    fn update_event_listener(&self, listeners: Vec<ListenerUpdate>) -> Result<()>;

    /// Apply everything queued so far and run end-batch callbacks
    fn end_batch(&self) -> Result<()>;

    /// Blocking measurement of a text node, lengths in dp
    fn measure(&self, request: &MeasureRequest) -> Result<MeasureSize>;

    /// Measurement for the layout pass: any failure measures as zero
    fn measure_or_zero(&self, request: &MeasureRequest) -> MeasureSize {
        self.measure(request).unwrap_or(MeasureSize::ZERO)
    }

    /// Send a mixed record list, grouping consecutive records of one kind
    fn submit(&self, records: Vec<MutationRecord>) -> Result<()> {
        let mut records = records.into_iter().peekable();
        while let Some(first) = records.next() {
            let kind = first.kind();
            let mut group = vec![first];
            if groups(kind) {
                while let Some(next) = records.next_if(|r| r.kind() == kind) {
                    group.push(next);
                }
            }
            dispatch_group(self, kind, group)?;
        }
        Ok(())
    }
}

fn dispatch_group<B>(backend: &B, kind: MutationKind, group: Vec<MutationRecord>) -> Result<()>
where
    B: DispatchBackend + ?Sized,
{
    match kind {
        MutationKind::Create => backend.create_node(
            group
                .into_iter()
                .filter_map(|r| match r {
                    MutationRecord::Create(node) => Some(node),
                    _ => None,
                })
                .collect(),
        ),
        MutationKind::Update => backend.update_node(
            group
                .into_iter()
                .filter_map(|r| match r {
                    MutationRecord::Update(node) => Some(node),
                    _ => None,
                })
                .collect(),
        ),
        MutationKind::Delete => backend.delete_node(
            group
                .into_iter()
                .filter_map(|r| match r {
                    MutationRecord::Delete { tag } => Some(tag),
                    _ => None,
                })
                .collect(),
        ),
        MutationKind::UpdateLayout => backend.update_layout(
            group
                .into_iter()
                .filter_map(|r| match r {
                    MutationRecord::UpdateLayout(layout) => Some(layout),
                    _ => None,
                })
                .collect(),
        ),
        MutationKind::UpdateEventListener => backend.update_event_listener(
            group
                .into_iter()
                .filter_map(|r| match r {
                    MutationRecord::UpdateEventListener(listener) => Some(listener),
                    _ => None,
                })
                .collect(),
        ),
        MutationKind::Move | MutationKind::Move2 => {
            for record in group {
                match record {
                    MutationRecord::Move(moves) => backend.move_node(moves)?,
                    MutationRecord::Move2(moves) => backend.move_node2(moves)?,
                    _ => {}
                }
            }
            Ok(())
        }
    }
}

/// Kinds whose backend call carries a list
fn groups(kind: MutationKind) -> bool {
    !matches!(kind, MutationKind::Move | MutationKind::Move2)
}

/// Post a task for a root, dropping it if the root is gone by the time it runs
pub(crate) fn post_to_root(
    runner: &dyn TaskRunner,
    root_id: RootId,
    root: &RootHandle,
    task: impl FnOnce(&mut UiContext) + Send + 'static,
) -> Result<()> {
    if root.upgrade().is_none() {
        tracing::warn!(root_id, "root detached, call dropped");
        return Err(BridgeError::RootDetached(root_id));
    }
    let handle = root.clone();
    let posted = runner.post(Box::new(move |ctx| {
        if handle.upgrade().is_none() {
            tracing::warn!(root_id, "root detached before the task ran, dropped");
            return;
        }
        task(ctx);
    }));
    if posted {
        Ok(())
    } else {
        Err(BridgeError::RootDetached(root_id))
    }
}

/// Queue records on the UI side
pub(crate) fn post_records(
    runner: &dyn TaskRunner,
    root_id: RootId,
    root: &RootHandle,
    records: Vec<MutationRecord>,
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    post_to_root(runner, root_id, root, move |ctx| ctx.add_mutations(root_id, records))
}

pub(crate) fn post_end_batch(runner: &dyn TaskRunner, root_id: RootId, root: &RootHandle) -> Result<()> {
    post_to_root(runner, root_id, root, move |ctx| {
        ctx.end_batch(root_id);
    })
}
