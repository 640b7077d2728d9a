use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{TransportError, QUEUE_SIZE};
use crate::{apilytics_debug, Report};

enum Task {
    SendReport(Report),
    Flush(SyncSender<()>),
    Shutdown(SyncSender<()>),
}

/// How long a full queue is waited on between attempts to hand over a task.
const RETRY_INTERVAL: Duration = Duration::from_millis(5);

pub struct TransportThread {
    sender: SyncSender<Task>,
    shutdown: Arc<AtomicBool>,
    stopped: AtomicBool,
    handle: Option<JoinHandle<()>>,
    debug: bool,
}

impl TransportThread {
    pub fn new<SendFn>(debug: bool, mut send: SendFn) -> Self
    where
        SendFn: FnMut(Report) -> Result<(), TransportError> + Send + 'static,
    {
        let (sender, receiver) = sync_channel(QUEUE_SIZE);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();
        let handle = thread::Builder::new()
            .name("apilytics-transport".into())
            .spawn(move || {
                for task in receiver.into_iter() {
                    if shutdown_worker.load(Ordering::SeqCst) {
                        return;
                    }
                    let report = match task {
                        Task::SendReport(report) => report,
                        Task::Flush(sender) => {
                            sender.send(()).ok();
                            continue;
                        }
                        Task::Shutdown(sender) => {
                            sender.send(()).ok();
                            return;
                        }
                    };

                    if let Err(err) = send(report) {
                        apilytics_debug!(debug, "Failed to send metrics: {}", err);
                    }
                }
            })
            .map_err(|err| {
                apilytics_debug!(debug, "Failed to spawn transport thread: {}", err);
            })
            .ok();

        Self {
            sender,
            shutdown,
            stopped: AtomicBool::new(false),
            handle,
            debug,
        }
    }

    pub fn send(&self, report: Report) {
        match self.sender.try_send(Task::SendReport(report)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                apilytics_debug!(self.debug, "Transport queue is full, dropping metrics");
            }
            Err(TrySendError::Disconnected(_)) => {
                apilytics_debug!(self.debug, "Transport is not running, dropping metrics");
            }
        }
    }

    /// Waits until every report queued so far has been handled.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (sender, receiver) = sync_channel(1);
        if !self.send_until(Task::Flush(sender), deadline) {
            return false;
        }
        receiver
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .is_ok()
    }

    /// Handles the queued reports, then stops the worker.
    ///
    /// Returns `false` if the worker did not stop within `timeout`; it is then
    /// left to finish its current request in the background.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (sender, receiver) = sync_channel(1);
        if !self.send_until(Task::Shutdown(sender), deadline) {
            return false;
        }
        let stopped = receiver
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .is_ok();
        if stopped {
            self.stopped.store(true, Ordering::SeqCst);
        } else {
            apilytics_debug!(self.debug, "Transport did not shut down in time");
        }
        stopped
    }

    /// Hands a task to the worker, waiting for queue space until `deadline`.
    ///
    /// Only used off the request path.
    fn send_until(&self, mut task: Task, deadline: Instant) -> bool {
        loop {
            match self.sender.try_send(task) {
                Ok(()) => return true,
                Err(TrySendError::Full(returned)) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    task = returned;
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

impl Drop for TransportThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            // a worker that has not stopped may be stuck in a request; it
            // exits on its own once the queue is disconnected
            if self.stopped.load(Ordering::SeqCst) || handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}
