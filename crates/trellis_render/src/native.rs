//! Native widget seam
//!
//! The registry never talks to a toolkit directly. Each root is attached
//! with a [`NativeViewFactory`] that turns view names into [`NativeView`]
//! handles. [`HeadlessViewFactory`] records every call instead of drawing,
//! for tests and tooling.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{LayoutFrame, Padding, PropValue, SpanPosition, Tag};

/// Handle to one native widget
///
/// All methods run on the UI thread.
pub trait NativeView: Send {
    fn set_prop(&mut self, key: &str, value: &PropValue);

    /// Restore the toolkit default for a deleted prop
    fn reset_prop(&mut self, key: &str);

    /// Called once after a group of prop changes
    fn on_props_end(&mut self) {}

    fn set_frame(&mut self, frame: LayoutFrame, padding: Option<Padding>);

    /// Position inside the parent paragraph, for inline image spans
    fn set_span_position(&mut self, _position: SpanPosition) {}

    fn set_event_listener(&mut self, _name: &str, _enabled: bool) {}

    fn on_child_inserted(&mut self, _child: Tag, _index: usize) {}

    fn on_child_removed(&mut self, _child: Tag, _index: usize) {}

    /// Invoke a widget method; the error string is reported to the caller
    fn call_method(&mut self, method: &str, _params: &PropValue) -> Result<PropValue, String> {
        Err(format!("method '{method}' is not supported"))
    }

    /// The widget is being destroyed; children are released first
    fn release(&mut self) {}
}

/// Creates native widgets for one root
pub trait NativeViewFactory: Send {
    /// `None` when the toolkit has no widget for `view_name`
    fn create_view(
        &mut self,
        tag: Tag,
        view_name: &str,
        is_parent_text: bool,
    ) -> Option<Box<dyn NativeView>>;
}

/// A widget that ignores everything
#[derive(Debug, Default)]
pub struct NullView;

impl NativeView for NullView {
    fn set_prop(&mut self, _key: &str, _value: &PropValue) {}

    fn reset_prop(&mut self, _key: &str) {}

    fn set_frame(&mut self, _frame: LayoutFrame, _padding: Option<Padding>) {}
}

// ============================================================================
// Headless toolkit
// ============================================================================

/// One call made on a headless widget
#[derive(Clone, Debug, PartialEq)]
pub enum NativeCall {
    Created { tag: Tag, view_name: String },
    SetProp { tag: Tag, key: String, value: PropValue },
    ResetProp { tag: Tag, key: String },
    Frame { tag: Tag, frame: LayoutFrame },
    SpanPosition { tag: Tag, position: SpanPosition },
    Listener { tag: Tag, name: String, enabled: bool },
    ChildInserted { parent: Tag, child: Tag, index: usize },
    ChildRemoved { parent: Tag, child: Tag },
    Method { tag: Tag, method: String },
    Released { tag: Tag },
}

impl NativeCall {
    pub fn tag(&self) -> Tag {
        match self {
            NativeCall::Created { tag, .. }
            | NativeCall::SetProp { tag, .. }
            | NativeCall::ResetProp { tag, .. }
            | NativeCall::Frame { tag, .. }
            | NativeCall::SpanPosition { tag, .. }
            | NativeCall::Listener { tag, .. }
            | NativeCall::Method { tag, .. }
            | NativeCall::Released { tag } => *tag,
            NativeCall::ChildInserted { parent, .. } | NativeCall::ChildRemoved { parent, .. } => {
                *parent
            }
        }
    }
}

/// Shared log of headless calls
pub type CallLog = Arc<Mutex<Vec<NativeCall>>>;

/// Factory producing recording widgets
///
/// View names listed with [`HeadlessViewFactory::reject`] fail creation.
#[derive(Debug, Default)]
pub struct HeadlessViewFactory {
    calls: CallLog,
    rejected: Vec<String>,
}

impl HeadlessViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory appending to an existing log
    pub fn with_log(calls: CallLog) -> Self {
        Self {
            calls,
            rejected: Vec::new(),
        }
    }

    pub fn reject(mut self, view_name: impl Into<String>) -> Self {
        self.rejected.push(view_name.into());
        self
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

impl NativeViewFactory for HeadlessViewFactory {
    fn create_view(
        &mut self,
        tag: Tag,
        view_name: &str,
        _is_parent_text: bool,
    ) -> Option<Box<dyn NativeView>> {
        if self.rejected.iter().any(|name| name == view_name) {
            return None;
        }
        self.calls.lock().push(NativeCall::Created {
            tag,
            view_name: view_name.to_string(),
        });
        Some(Box::new(HeadlessView {
            tag,
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Recording widget; methods echo their params back
struct HeadlessView {
    tag: Tag,
    calls: CallLog,
}

impl HeadlessView {
    fn record(&self, call: NativeCall) {
        self.calls.lock().push(call);
    }
}

impl NativeView for HeadlessView {
    fn set_prop(&mut self, key: &str, value: &PropValue) {
        self.record(NativeCall::SetProp {
            tag: self.tag,
            key: key.to_string(),
            value: value.clone(),
        });
    }

    fn reset_prop(&mut self, key: &str) {
        self.record(NativeCall::ResetProp {
            tag: self.tag,
            key: key.to_string(),
        });
    }

    fn set_frame(&mut self, frame: LayoutFrame, _padding: Option<Padding>) {
        self.record(NativeCall::Frame {
            tag: self.tag,
            frame,
        });
    }

    fn set_span_position(&mut self, position: SpanPosition) {
        self.record(NativeCall::SpanPosition {
            tag: self.tag,
            position,
        });
    }

    fn set_event_listener(&mut self, name: &str, enabled: bool) {
        self.record(NativeCall::Listener {
            tag: self.tag,
            name: name.to_string(),
            enabled,
        });
    }

    fn on_child_inserted(&mut self, child: Tag, index: usize) {
        self.record(NativeCall::ChildInserted {
            parent: self.tag,
            child,
            index,
        });
    }

    fn on_child_removed(&mut self, child: Tag, _index: usize) {
        self.record(NativeCall::ChildRemoved {
            parent: self.tag,
            child,
        });
    }

    fn call_method(&mut self, method: &str, params: &PropValue) -> Result<PropValue, String> {
        self.record(NativeCall::Method {
            tag: self.tag,
            method: method.to_string(),
        });
        Ok(params.clone())
    }

    fn release(&mut self) {
        self.record(NativeCall::Released { tag: self.tag });
    }
}
