//! UI thread task queue
//!
//! Everything that touches native widgets runs as a [`UiTask`] on the UI
//! side. Tasks run strictly in the order they were posted, which is what
//! keeps a measurement from observing a half-applied batch: a measure task
//! posted after an `EndBatch` task runs after the whole batch.
//!
//! Two runners implement [`TaskRunner`]:
//! - [`UiThread`]: a dedicated thread draining an mpsc queue
//! - [`InlineRunner`]: runs tasks on the posting thread, for hosts that
//!   already serialize calls and for deterministic tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::UiContext;

/// Unit of work executed with the UI context
pub type UiTask = Box<dyn FnOnce(&mut UiContext) + Send>;

/// Queue of UI tasks
pub trait TaskRunner: Send + Sync {
    /// Enqueue a task; `false` when the runner has shut down
    fn post(&self, task: UiTask) -> bool;

    /// Whether the calling thread is the one running tasks
    fn is_ui_thread(&self) -> bool;
}

/// Run `f` on the UI side and wait up to `timeout` for its result
///
/// Returns `None` on timeout, on shutdown, or when called from the UI
/// thread itself (which would wait on its own queue).
pub fn call_sync<R, F>(runner: &dyn TaskRunner, timeout: Duration, f: F) -> Option<R>
where
    R: Send + 'static,
    F: FnOnce(&mut UiContext) -> R + Send + 'static,
{
    if runner.is_ui_thread() {
        tracing::warn!("blocking UI call issued from the UI thread, refused");
        return None;
    }
    let (tx, rx) = mpsc::sync_channel(1);
    let posted = runner.post(Box::new(move |ctx| {
        let _ = tx.send(f(ctx));
    }));
    if !posted {
        return None;
    }
    rx.recv_timeout(timeout).ok()
}

// ============================================================================
// Dedicated thread
// ============================================================================

/// UI thread draining a task queue until shut down
pub struct UiThread {
    sender: Mutex<Option<Sender<UiTask>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    shutdown: Arc<AtomicBool>,
}

impl UiThread {
    /// Start the thread; `context` moves onto it
    pub fn spawn(mut context: UiContext) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<UiTask>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("trellis-ui".to_string())
            .spawn(move || {
                tracing::debug!("ui thread started");
                while let Ok(task) = receiver.recv() {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    task(&mut context);
                }
                tracing::debug!("ui thread stopped");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread_id: handle.thread().id(),
            thread: Mutex::new(Some(handle)),
            shutdown,
        })
    }

    /// Stop accepting tasks, skip queued ones and join the thread
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.sender.lock().take();
        if self.is_ui_thread() {
            return;
        }
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl TaskRunner for UiThread {
    fn post(&self, task: UiTask) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        }
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Inline runner
// ============================================================================

/// Runs tasks on whichever thread posts them
///
/// Tasks posted while another task runs are queued and drained by the
/// running thread, so ordering matches the dedicated thread.
pub struct InlineRunner {
    queue: Mutex<VecDeque<UiTask>>,
    context: Mutex<UiContext>,
    draining: Mutex<Option<ThreadId>>,
}

impl InlineRunner {
    pub fn new(context: UiContext) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            context: Mutex::new(context),
            draining: Mutex::new(None),
        }
    }

    fn drain(&self) {
        loop {
            let Some(mut context) = self.context.try_lock() else {
                return;
            };
            *self.draining.lock() = Some(thread::current().id());
            loop {
                let next = self.queue.lock().pop_front();
                match next {
                    Some(task) => task(&mut context),
                    None => break,
                }
            }
            *self.draining.lock() = None;
            drop(context);

            // a task may have been queued between the last pop and the unlock
            if self.queue.lock().is_empty() {
                return;
            }
        }
    }
}

impl TaskRunner for InlineRunner {
    fn post(&self, task: UiTask) -> bool {
        self.queue.lock().push_back(task);
        self.drain();
        true
    }

    fn is_ui_thread(&self) -> bool {
        *self.draining.lock() == Some(thread::current().id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bridge::RecordingSink;
    use trellis_text::TextMeasurementEngine;

    fn context() -> UiContext {
        UiContext::new(TextMeasurementEngine::new(), Box::new(RecordingSink::new()))
    }

    #[test]
    fn test_ui_thread_runs_tasks_in_order() {
        let ui = UiThread::spawn(context()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = Arc::clone(&seen);
            assert!(ui.post(Box::new(move |_| seen.lock().push(i))));
        }
        let done = call_sync(&ui, Duration::from_secs(5), |_| ()).is_some();
        assert!(done);
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
        assert!(!ui.is_ui_thread());
    }

    #[test]
    fn test_post_after_shutdown_fails() {
        let ui = UiThread::spawn(context()).unwrap();
        ui.shutdown();
        assert!(!ui.is_running());
        assert!(!ui.post(Box::new(|_| {})));
        assert!(call_sync(&ui, Duration::from_millis(50), |_| 1).is_none());
    }

    #[test]
    fn test_call_sync_times_out() {
        let ui = UiThread::spawn(context()).unwrap();
        ui.post(Box::new(|_| thread::sleep(Duration::from_millis(300))));
        let result = call_sync(&ui, Duration::from_millis(20), |_| 1);
        assert!(result.is_none());
    }

    #[test]
    fn test_inline_runner_nested_posts_keep_order() {
        let runner = Arc::new(InlineRunner::new(context()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_runner = Arc::clone(&runner);
        let inner_seen = Arc::clone(&seen);
        runner.post(Box::new(move |_| {
            inner_seen.lock().push(1);
            let nested_seen = Arc::clone(&inner_seen);
            inner_runner.post(Box::new(move |_| nested_seen.lock().push(3)));
            inner_seen.lock().push(2);
            assert!(inner_runner.is_ui_thread());
        }));

        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert!(!runner.is_ui_thread());
        assert_eq!(call_sync(runner.as_ref(), Duration::from_secs(1), |_| 7), Some(7));
    }
}
