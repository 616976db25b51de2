use crate::stores::{EventStore, UserStore};
use crate::utils::time::current_timestamp;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub admitted: AtomicU64,
    pub denied: AtomicU64,
    pub unknown_cards: AtomicU64,
    pub events_recorded: AtomicU64,
    pub events_failed: AtomicU64,
    pub events_dropped: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub denied: u64,
    pub unknown_cards: u64,
    pub admission_rate: f64,
    pub events_recorded: u64,
    pub events_failed: u64,
    pub events_dropped: u64,
    pub users: usize,
    pub events: usize,
    pub uptime_seconds: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            admitted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            unknown_cards: AtomicU64::new(0),
            events_recorded: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn increment_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_cards(&self) {
        self.unknown_cards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_recorded(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Collects counters and store sizes, and derives the admission rate
    /// over all authentication attempts.
    pub fn get_snapshot(&self, users: &dyn UserStore, events: &dyn EventStore) -> MetricsSnapshot {
        let admitted = self.admitted.load(Ordering::Relaxed);
        let denied = self.denied.load(Ordering::Relaxed);
        let unknown_cards = self.unknown_cards.load(Ordering::Relaxed);

        let attempts = admitted + denied + unknown_cards;
        let admission_rate = if attempts > 0 {
            (admitted as f64 / attempts as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            admitted,
            denied,
            unknown_cards,
            admission_rate,
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            users: users.len(),
            events: events.len(),
            uptime_seconds: current_timestamp() - self.start_time,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
