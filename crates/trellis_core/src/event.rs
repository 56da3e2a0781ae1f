//! Messages flowing from the UI surface back to the document engine
//!
//! Native input is reduced to [`UiEvent`]s; asynchronous method results
//! and surface size changes travel alongside them as [`DocumentMessage`]s.

use crate::mutation::{RootId, Tag};
use crate::value::PropValue;

/// Well-known event names
pub mod names {
    pub const CLICK: &str = "click";
    pub const LONG_CLICK: &str = "longclick";
    pub const PRESS_IN: &str = "pressin";
    pub const PRESS_OUT: &str = "pressout";
    pub const TOUCH_DOWN: &str = "touchstart";
    pub const TOUCH_MOVE: &str = "touchmove";
    pub const TOUCH_END: &str = "touchend";
    pub const TOUCH_CANCEL: &str = "touchcancel";
    pub const SCROLL: &str = "scroll";
    pub const LAYOUT: &str = "layout";
    pub const ATTACHED_TO_WINDOW: &str = "attachedtowindow";
    pub const DETACHED_FROM_WINDOW: &str = "detachedfromwindow";
}

const GESTURE_EVENTS: [&str; 8] = [
    names::CLICK,
    names::LONG_CLICK,
    names::PRESS_IN,
    names::PRESS_OUT,
    names::TOUCH_DOWN,
    names::TOUCH_MOVE,
    names::TOUCH_END,
    names::TOUCH_CANCEL,
];

/// Gesture-class events are always forwarded, subscribed or not
pub fn is_gesture_event(name: &str) -> bool {
    GESTURE_EVENTS.contains(&name)
}

/// A native event addressed to a document node
#[derive(Clone, Debug, PartialEq)]
pub struct UiEvent {
    pub root_id: RootId,
    pub tag: Tag,
    pub name: String,
    pub params: PropValue,
    pub capture: bool,
    pub bubble: bool,
}

impl UiEvent {
    pub fn new(root_id: RootId, tag: Tag, name: impl Into<String>) -> Self {
        Self {
            root_id,
            tag,
            name: name.into(),
            params: PropValue::Null,
            capture: false,
            bubble: true,
        }
    }

    pub fn with_params(mut self, params: PropValue) -> Self {
        self.params = params;
        self
    }

    pub fn with_phases(mut self, capture: bool, bubble: bool) -> Self {
        self.capture = capture;
        self.bubble = bubble;
        self
    }

    pub fn is_gesture(&self) -> bool {
        is_gesture_event(&self.name)
    }
}

/// Outcome of an asynchronous view method call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackStatus {
    Ok,
    /// The target view was gone or the method is not supported
    Failed,
}

impl CallbackStatus {
    /// Status code as seen by the document engine
    pub fn code(&self) -> i32 {
        match self {
            CallbackStatus::Ok => 0,
            CallbackStatus::Failed => -1,
        }
    }
}

/// Completion of a `call_view_method` keyed by the caller's `cb_id`
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackCompletion {
    pub root_id: RootId,
    pub tag: Tag,
    pub cb_id: u32,
    pub method: String,
    pub status: CallbackStatus,
    pub result: PropValue,
}

/// Everything the UI side reports to the document engine
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentMessage {
    Event(UiEvent),
    Callback(CallbackCompletion),
    RootResized {
        root_id: RootId,
        width: f32,
        height: f32,
    },
    NodeResized {
        root_id: RootId,
        tag: Tag,
        width: f32,
        height: f32,
    },
}

impl DocumentMessage {
    pub fn root_id(&self) -> RootId {
        match self {
            DocumentMessage::Event(event) => event.root_id,
            DocumentMessage::Callback(completion) => completion.root_id,
            DocumentMessage::RootResized { root_id, .. } => *root_id,
            DocumentMessage::NodeResized { root_id, .. } => *root_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_classification() {
        assert!(is_gesture_event("click"));
        assert!(is_gesture_event(names::TOUCH_CANCEL));
        assert!(!is_gesture_event(names::SCROLL));
        assert!(!is_gesture_event("Click"));
    }

    #[test]
    fn test_event_builder() {
        let event = UiEvent::new(1, 7, names::SCROLL)
            .with_params(PropValue::Double(12.0))
            .with_phases(true, false);
        assert!(!event.is_gesture());
        assert!(event.capture);
        assert!(!event.bubble);
        assert_eq!(DocumentMessage::Event(event).root_id(), 1);
    }

    #[test]
    fn test_callback_status_codes() {
        assert_eq!(CallbackStatus::Ok.code(), 0);
        assert_eq!(CallbackStatus::Failed.code(), -1);
    }
}
