//! Blocking measurement round trip
//!
//! Measurement is the one synchronous hop from the document thread to the
//! UI thread. Requests in flight are tracked in a table keyed by
//! `(root_id, tag)` holding the request id and the reply sender:
//!
//! ```text
//! document thread                      UI thread
//! ───────────────                      ─────────
//! request() ── insert (root, tag) ──┐
//!           ── post measure task ───┼──► measure_packed()
//!           ◄─ recv_timeout ────────┘    complete(): remove entry, send
//! ```
//!
//! A second request for a tag already in flight is refused. Detaching a
//! root removes its entries, which drops the reply senders and wakes the
//! waiting caller at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use trellis_core::{BridgeError, MeasureRequest, Result, RootId, Tag};

use crate::root::RootHandle;
use crate::ui_thread::TaskRunner;

struct PendingMeasure {
    request_id: u64,
    reply: SyncSender<i64>,
}

/// Table of measurements in flight
pub struct MeasureChannel {
    pending: Mutex<FxHashMap<(RootId, Tag), PendingMeasure>>,
    next_request: AtomicU64,
    timeout: Duration,
}

impl MeasureChannel {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(FxHashMap::default()),
            next_request: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Measure on the UI side; lengths in device pixels, result packed
    pub fn request(
        self: &Arc<Self>,
        runner: &dyn TaskRunner,
        root: &RootHandle,
        request: MeasureRequest,
    ) -> Result<i64> {
        let density = root
            .upgrade()
            .map(|root| root.density())
            .ok_or(BridgeError::RootDetached(request.root_id))?;
        if runner.is_ui_thread() {
            tracing::warn!(tag = request.tag, "measurement requested from the UI thread, refused");
            return Err(BridgeError::MeasureInFlight {
                root_id: request.root_id,
                tag: request.tag,
            });
        }

        let key = (request.root_id, request.tag);
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (reply, receiver) = mpsc::sync_channel(1);
        {
            let mut pending = self.pending.lock();
            if pending.contains_key(&key) {
                return Err(BridgeError::MeasureInFlight {
                    root_id: request.root_id,
                    tag: request.tag,
                });
            }
            pending.insert(key, PendingMeasure { request_id, reply });
        }

        let channel = Arc::clone(self);
        let handle = root.clone();
        let posted = runner.post(Box::new(move |ctx| {
            let packed = if handle.upgrade().is_some() {
                ctx.measure_packed(&request, density)
            } else {
                0
            };
            channel.complete(key, request_id, packed);
        }));
        if !posted {
            self.forget(key, request_id);
            return Err(BridgeError::RootDetached(request.root_id));
        }

        match receiver.recv_timeout(self.timeout) {
            Ok(packed) => Ok(packed),
            Err(RecvTimeoutError::Timeout) => {
                self.forget(key, request_id);
                let err = BridgeError::MeasureTimeout {
                    root_id: request.root_id,
                    tag: request.tag,
                };
                tracing::error!(timeout_ms = self.timeout.as_millis() as u64, "{}", err);
                Err(err)
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!(root_id = request.root_id, tag = request.tag, "measurement cancelled");
                Err(BridgeError::RootDetached(request.root_id))
            }
        }
    }

    /// Answer a request, unless it timed out or was cancelled meanwhile
    fn complete(&self, key: (RootId, Tag), request_id: u64, packed: i64) {
        let entry = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(entry) if entry.request_id == request_id => pending.remove(&key),
                _ => None,
            }
        };
        if let Some(entry) = entry {
            let _ = entry.reply.send(packed);
        }
    }

    fn forget(&self, key: (RootId, Tag), request_id: u64) {
        let mut pending = self.pending.lock();
        if pending.get(&key).is_some_and(|entry| entry.request_id == request_id) {
            pending.remove(&key);
        }
    }

    /// Cancel every measurement of a root; waiting callers return at once
    pub fn cancel_root(&self, root_id: RootId) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|(root, _), _| *root != root_id);
        before - pending.len()
    }
}

impl std::fmt::Debug for MeasureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureChannel")
            .field("in_flight", &self.in_flight())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UiContext;
    use crate::event_bridge::RecordingSink;
    use crate::native::HeadlessViewFactory;
    use crate::root::{RootDocument, RootTable};
    use crate::ui_thread::{InlineRunner, UiThread};
    use std::thread;
    use trellis_core::{props, BackendKind, CreateNode, MeasureMode, MeasureSize};
    use trellis_text::TextMeasurementEngine;

    fn context() -> UiContext {
        let mut ctx = UiContext::new(TextMeasurementEngine::new(), Box::new(RecordingSink::new()));
        ctx.attach(1, Box::new(HeadlessViewFactory::new()));
        ctx.add_mutations(
            1,
            vec![CreateNode::new(5, 1, 0, "Text")
                .with_props(props! { "text" => "hello" })
                .into()],
        );
        ctx
    }

    #[test]
    fn test_request_round_trip() {
        let roots = RootTable::new();
        let root = roots.attach(RootDocument::new(1, 1.0, BackendKind::Direct)).unwrap();
        let runner = InlineRunner::new(context());
        let channel = Arc::new(MeasureChannel::new(Duration::from_secs(1)));

        let request = MeasureRequest::new(1, 5).with_width(300.0, MeasureMode::Exact);
        let packed = channel.request(&runner, &root, request).unwrap();
        assert_eq!(MeasureSize::unpack(packed).width, 300.0);
        assert_eq!(channel.in_flight(), 0);
    }

    #[test]
    fn test_detached_root_is_refused() {
        let roots = RootTable::new();
        let root = roots.attach(RootDocument::new(1, 1.0, BackendKind::Direct)).unwrap();
        roots.detach(1).unwrap();
        let runner = InlineRunner::new(context());
        let channel = Arc::new(MeasureChannel::new(Duration::from_secs(1)));
        let result = channel.request(&runner, &root, MeasureRequest::new(1, 5));
        assert_eq!(result, Err(BridgeError::RootDetached(1)));
    }

    #[test]
    fn test_timeout_and_in_flight_guard() {
        let roots = RootTable::new();
        let root = roots.attach(RootDocument::new(1, 1.0, BackendKind::Direct)).unwrap();
        let ui = Arc::new(UiThread::spawn(context()).unwrap());
        let channel = Arc::new(MeasureChannel::new(Duration::from_millis(150)));

        // keep the UI thread busy past the timeout
        ui.post(Box::new(|_| thread::sleep(Duration::from_millis(600))));

        let waiter = {
            let ui = Arc::clone(&ui);
            let channel = Arc::clone(&channel);
            let root = root.clone();
            thread::spawn(move || channel.request(ui.as_ref(), &root, MeasureRequest::new(1, 5)))
        };
        while channel.in_flight() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        let second = channel.request(ui.as_ref(), &root, MeasureRequest::new(1, 5));
        assert_eq!(second, Err(BridgeError::MeasureInFlight { root_id: 1, tag: 5 }));

        let first = waiter.join().unwrap();
        assert_eq!(first, Err(BridgeError::MeasureTimeout { root_id: 1, tag: 5 }));
        assert_eq!(channel.in_flight(), 0);
    }

    #[test]
    fn test_cancel_root_wakes_waiter() {
        let roots = RootTable::new();
        let root = roots.attach(RootDocument::new(1, 1.0, BackendKind::Direct)).unwrap();
        let ui = Arc::new(UiThread::spawn(context()).unwrap());
        let channel = Arc::new(MeasureChannel::new(Duration::from_secs(10)));

        ui.post(Box::new(|_| thread::sleep(Duration::from_millis(200))));
        let waiter = {
            let ui = Arc::clone(&ui);
            let channel = Arc::clone(&channel);
            let root = root.clone();
            thread::spawn(move || channel.request(ui.as_ref(), &root, MeasureRequest::new(1, 5)))
        };
        while channel.in_flight() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(channel.cancel_root(1), 1);
        assert_eq!(waiter.join().unwrap(), Err(BridgeError::RootDetached(1)));
    }
}
