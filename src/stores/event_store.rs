use crate::core::error::StoreError;
use crate::models::event::{Event, EventType};
use crate::stores::EventStore;
use crate::wal::wal::{Wal, WalOperation};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Append-only in-memory event log
pub struct EventLog {
    events: DashMap<i64, Arc<Event>>,
    next_id: AtomicI64,
    wal: Option<Arc<Wal>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            next_id: AtomicI64::new(1),
            wal: None,
        }
    }

    pub fn with_wal(wal: Arc<Wal>) -> Self {
        Self {
            wal: Some(wal),
            ..Self::new()
        }
    }

    /// Load an event recovered from the WAL without logging it again
    pub fn restore(&self, event: Event) {
        self.next_id.fetch_max(event.id + 1, Ordering::SeqCst);
        self.events.insert(event.id, Arc::new(event));
    }

    fn collect_sorted(&self, user_id: Option<i64>) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|entry| user_id.map_or(true, |id| entry.value().user_id == id))
            .map(|entry| Event::clone(entry.value()))
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for EventLog {
    fn append(
        &self,
        user_id: i64,
        event_type: EventType,
        created_at: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event::new(id, user_id, event_type, created_at);

        if let Some(wal) = &self.wal {
            wal.log_operation(&WalOperation::AppendEvent(event.clone()))
                .map_err(|e| StoreError::Wal(format!("{:#}", e)))?;
        }

        self.events.insert(id, Arc::new(event.clone()));
        Ok(event)
    }

    fn list(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.collect_sorted(None);
        events.reverse();
        Ok(events)
    }

    fn list_for_user(&self, user_id: i64) -> Result<Vec<Event>, StoreError> {
        Ok(self.collect_sorted(Some(user_id)))
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::now;
    use tempfile::TempDir;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let log = EventLog::new();
        let a = log.append(1, EventType::Admitted, now()).unwrap();
        let b = log.append(0, EventType::UnknownCard, now()).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_list_is_newest_first() {
        let log = EventLog::new();
        log.append(1, EventType::Admitted, now()).unwrap();
        log.append(2, EventType::DeniedBlocked, now()).unwrap();
        log.append(1, EventType::Exit, now()).unwrap();

        let ids: Vec<i64> = log.list().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_list_for_user_in_write_order() {
        let log = EventLog::new();
        log.append(1, EventType::SetBlocked, now()).unwrap();
        log.append(2, EventType::Admitted, now()).unwrap();
        log.append(1, EventType::SetUnblocked, now()).unwrap();

        let types: Vec<EventType> = log
            .list_for_user(1)
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec![EventType::SetBlocked, EventType::SetUnblocked]);
        assert!(log.list_for_user(99).unwrap().is_empty());
    }

    #[test]
    fn test_restore_keeps_ids() {
        let log = EventLog::new();
        log.restore(Event::new(41, 3, EventType::Admitted, now()));
        let next = log.append(3, EventType::Exit, now()).unwrap();
        assert_eq!(next.id, 42);
    }

    #[test]
    fn test_append_reaches_wal() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Arc::new(Wal::new(temp_dir.path().join("events.wal")).unwrap());
        let log = EventLog::with_wal(Arc::clone(&wal));

        let event = log.append(5, EventType::Deactivated, now()).unwrap();

        let ops = wal.replay().unwrap();
        assert_eq!(ops, vec![WalOperation::AppendEvent(event)]);
    }
}
