//! Fire-and-forget audit writes.
//!
//! [`EventRecorder::record`] only enqueues onto a bounded channel and never
//! waits, so a slow or failing event store cannot delay or fail the operation
//! that triggered the event. A single worker drains the queue in order and
//! reports write failures to the log and the metrics counters only.

use crate::metrics::collector::Metrics;
use crate::models::event::EventType;
use crate::stores::EventStore;
use crate::utils::time::now;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
struct PendingEvent {
    user_id: i64,
    event_type: EventType,
}

enum Command {
    Record(PendingEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct EventRecorder {
    sender: mpsc::Sender<Command>,
    metrics: Arc<Metrics>,
}

impl EventRecorder {
    /// Start the worker on the current tokio runtime.
    ///
    /// `capacity` must be greater than zero.
    pub fn spawn(
        store: Arc<dyn EventStore>,
        metrics: Arc<Metrics>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(receiver, store, Arc::clone(&metrics)));
        (Self { sender, metrics }, handle)
    }

    /// Queue an event for writing. Never blocks; if the queue is full or the
    /// worker is gone the event is dropped and logged.
    pub fn record(&self, user_id: i64, event_type: EventType) {
        let pending = PendingEvent { user_id, event_type };
        match self.sender.try_send(Command::Record(pending)) {
            Ok(()) => {
                debug!(user_id, event_type = %event_type, "Event queued");
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.increment_events_dropped();
                warn!(
                    user_id,
                    event_type = %event_type,
                    "Event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.increment_events_dropped();
                warn!(
                    user_id,
                    event_type = %event_type,
                    "Event recorder stopped, dropping event"
                );
            }
        }
    }

    /// Wait until every event queued before this call has been handled.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).await.is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Command>,
    store: Arc<dyn EventStore>,
    metrics: Arc<Metrics>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Record(pending) => write_event(&store, &metrics, pending).await,
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    info!("Event queue closed, recorder worker stopping");
}

async fn write_event(store: &Arc<dyn EventStore>, metrics: &Metrics, pending: PendingEvent) {
    // Store writes do file IO, keep them off the async workers
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || {
        store.append(pending.user_id, pending.event_type, now())
    })
    .await;

    match result {
        Ok(Ok(event)) => {
            metrics.increment_events_recorded();
            debug!(
                event_id = event.id,
                user_id = event.user_id,
                event_type = %event.event_type,
                "Event recorded"
            );
        }
        Ok(Err(e)) => {
            metrics.increment_events_failed();
            error!(
                error = %e,
                user_id = pending.user_id,
                event_type = %pending.event_type,
                "Failed to record event"
            );
        }
        Err(e) => {
            metrics.increment_events_failed();
            error!(
                error = %e,
                user_id = pending.user_id,
                event_type = %pending.event_type,
                "Event write task panicked"
            );
        }
    }
}
