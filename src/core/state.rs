// Application state (AppState)

use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::recorder::event_recorder::EventRecorder;
use crate::services::admission::AdmissionEngine;
use crate::services::audit_trail::AuditTrail;
use crate::services::directory::UserDirectory;
use crate::stores::{EventStore, UserStore};
use std::sync::Arc;

/// Shared application state
///
/// Stores are injected by the caller; the services built on top of them are
/// cheap to clone and shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub admission: AdmissionEngine,

    pub directory: UserDirectory,

    pub audit: AuditTrail,

    /// Queue for fire-and-forget audit writes
    pub recorder: EventRecorder,

    pub users: Arc<dyn UserStore>,

    pub events: Arc<dyn EventStore>,

    pub metrics: Arc<Metrics>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services and start the event recorder worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, users: Arc<dyn UserStore>, events: Arc<dyn EventStore>) -> Self {
        let config = Arc::new(config);
        let metrics = Arc::new(Metrics::new());

        let (recorder, _worker) = EventRecorder::spawn(
            Arc::clone(&events),
            Arc::clone(&metrics),
            config.recorder.queue_capacity,
        );

        Self {
            admission: AdmissionEngine::new(
                Arc::clone(&users),
                recorder.clone(),
                Arc::clone(&metrics),
            ),
            directory: UserDirectory::new(Arc::clone(&users), recorder.clone()),
            audit: AuditTrail::new(Arc::clone(&events)),
            recorder,
            users,
            events,
            metrics,
            config,
        }
    }
}
