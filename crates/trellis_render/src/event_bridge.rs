//! Event bridge
//!
//! Forwards native events and callback completions to the document engine.
//! A non-gesture event only crosses when the document subscribed to it on
//! that view, so scroll and layout storms on unobserved views never reach
//! the script side.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{DocumentMessage, UiEvent};

use crate::registry::ViewRegistry;

/// Receiver of document-bound messages, called on the UI thread
pub trait DocumentSink: Send {
    fn deliver(&mut self, message: DocumentMessage);
}

/// Sink forwarding into an mpsc channel read by the document thread
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<DocumentMessage>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DocumentMessage>) -> Self {
        Self { sender }
    }
}

impl DocumentSink for ChannelSink {
    fn deliver(&mut self, message: DocumentMessage) {
        if self.sender.send(message).is_err() {
            tracing::debug!("document receiver gone, message dropped");
        }
    }
}

/// Sink keeping every message, for tests and tooling
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<DocumentMessage>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<DocumentMessage> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<DocumentMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl DocumentSink for RecordingSink {
    fn deliver(&mut self, message: DocumentMessage) {
        self.messages.lock().push(message);
    }
}

/// Filters and forwards UI-side messages
pub struct EventBridge {
    sink: Box<dyn DocumentSink>,
    forwarded: u64,
    dropped: u64,
}

impl EventBridge {
    pub fn new(sink: Box<dyn DocumentSink>) -> Self {
        Self {
            sink,
            forwarded: 0,
            dropped: 0,
        }
    }

    /// Forward an input event if its root is alive and the view listens
    ///
    /// Gesture events skip the subscription check; the document side
    /// resolves them against its own gesture handlers.
    pub fn dispatch_event(&mut self, registry: Option<&ViewRegistry>, event: UiEvent) -> bool {
        let Some(registry) = registry else {
            tracing::debug!(root_id = event.root_id, event = %event.name, "root detached, event dropped");
            self.dropped += 1;
            return false;
        };
        if !registry.contains(event.tag) {
            tracing::debug!(tag = event.tag, event = %event.name, "event for unknown view dropped");
            self.dropped += 1;
            return false;
        }
        if !event.is_gesture() && !registry.check_registered_event(event.tag, &event.name) {
            tracing::debug!(tag = event.tag, event = %event.name, "unsubscribed event dropped");
            self.dropped += 1;
            return false;
        }
        self.forwarded += 1;
        self.sink.deliver(DocumentMessage::Event(event));
        true
    }

    /// Deliver a message that needs no subscription check
    pub fn send(&mut self, message: DocumentMessage) {
        self.forwarded += 1;
        self.sink.deliver(message);
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("forwarded", &self.forwarded)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::HeadlessViewFactory;
    use trellis_core::{event::names, CreateNode, ListenerUpdate};

    fn registry() -> ViewRegistry {
        let mut registry = ViewRegistry::new(0, Box::new(HeadlessViewFactory::new()));
        registry.create(&CreateNode::new(1, 0, 0, "View")).unwrap();
        registry
            .update_event_listener(&ListenerUpdate::new(1).with_event(names::SCROLL, true))
            .unwrap();
        registry
    }

    #[test]
    fn test_subscribed_events_pass() {
        let sink = RecordingSink::new();
        let mut bridge = EventBridge::new(Box::new(sink.clone()));
        let registry = registry();

        assert!(bridge.dispatch_event(Some(&registry), UiEvent::new(0, 1, names::SCROLL)));
        assert!(!bridge.dispatch_event(Some(&registry), UiEvent::new(0, 1, names::LAYOUT)));
        assert_eq!(sink.messages().len(), 1);
        assert_eq!((bridge.forwarded(), bridge.dropped()), (1, 1));
    }

    #[test]
    fn test_gestures_bypass_subscription() {
        let sink = RecordingSink::new();
        let mut bridge = EventBridge::new(Box::new(sink.clone()));
        let registry = registry();
        assert!(bridge.dispatch_event(Some(&registry), UiEvent::new(0, 1, names::CLICK)));
        assert!(!bridge.dispatch_event(Some(&registry), UiEvent::new(0, 9, names::CLICK)));
    }

    #[test]
    fn test_detached_root_drops_events() {
        let sink = RecordingSink::new();
        let mut bridge = EventBridge::new(Box::new(sink.clone()));
        assert!(!bridge.dispatch_event(None, UiEvent::new(0, 1, names::CLICK)));
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink = ChannelSink::new(tx);
        sink.deliver(DocumentMessage::RootResized {
            root_id: 1,
            width: 10.0,
            height: 20.0,
        });
        assert_eq!(rx.recv().unwrap().root_id(), 1);
    }
}
