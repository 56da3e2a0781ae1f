//! Trellis Render
//!
//! Applies document-side mutation records to a retained native widget tree.
//!
//! # Features
//!
//! - **View Registry**: tag -> native view table with parent/child links
//! - **Batching**: records accumulate per root and apply atomically on end-batch
//! - **Dispatch Backends**: direct (typed, in process) and serialized (binary wire)
//! - **Text Measurement**: blocking, bounded round trip into the text engine
//! - **Event Bridge**: subscription-filtered native events back to the document
//! - **Root Lifetime**: weak handles; calls for detached roots become no-ops
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{props, BridgeConfig, CreateNode, MeasureMode, MeasureRequest};
//! use trellis_render::{HeadlessViewFactory, RecordingSink, RenderBridge};
//!
//! let bridge = RenderBridge::inline(BridgeConfig::testing(), Box::new(RecordingSink::new())).unwrap();
//! let backend = bridge.attach_root(0, Box::new(HeadlessViewFactory::new())).unwrap();
//!
//! backend
//!     .create_node(vec![CreateNode::new(1, 0, 0, "Text").with_props(props! { "text" => "hello" })])
//!     .unwrap();
//! let size = backend
//!     .measure(&MeasureRequest::new(0, 1).with_width(200.0, MeasureMode::AtMost))
//!     .unwrap();
//! assert!(size.width > 0.0 && size.height > 0.0);
//!
//! backend.end_batch().unwrap();
//! assert_eq!(bridge.view_children(0, 0), Some(vec![1]));
//! ```

pub mod backend;
pub mod bridge;
pub mod context;
pub mod event_bridge;
pub mod logging;
pub mod manager;
pub mod measure;
pub mod native;
pub mod registry;
pub mod root;
pub mod ui_thread;
pub mod virtual_nodes;

pub use backend::{DirectBackend, DispatchBackend, SerializedBackend, SerializedEndpoint};
pub use bridge::RenderBridge;
pub use context::UiContext;
pub use event_bridge::{ChannelSink, DocumentSink, EventBridge, RecordingSink};
pub use logging::init_tracing;
pub use manager::{BatchReport, BatchState, CallbackId, EndBatchCallback, ViewManager};
pub use measure::MeasureChannel;
pub use native::{
    CallLog, HeadlessViewFactory, NativeCall, NativeView, NativeViewFactory, NullView,
};
pub use registry::{ViewEntry, ViewRegistry, ViewSnapshot, ROOT_VIEW_NAME};
pub use root::{RootDocument, RootHandle, RootTable};
pub use ui_thread::{call_sync, InlineRunner, TaskRunner, UiTask, UiThread};
pub use virtual_nodes::{VirtualNode, VirtualNodeTable};
