use crate::core::error::ServiceError;
use crate::models::event::Event;
use crate::stores::EventStore;
use std::sync::Arc;

/// Read access to recorded events
#[derive(Clone)]
pub struct AuditTrail {
    events: Arc<dyn EventStore>,
}

impl AuditTrail {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Newest first
    pub fn list_events(&self) -> Result<Vec<Event>, ServiceError> {
        Ok(self.events.list()?)
    }

    pub fn list_events_for_user(&self, user_id: i64) -> Result<Vec<Event>, ServiceError> {
        Ok(self.events.list_for_user(user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventType;
    use crate::stores::event_store::EventLog;
    use crate::utils::time::now;

    #[test]
    fn test_listing_orders() {
        let log = Arc::new(EventLog::new());
        log.append(1, EventType::UserCreated, now()).unwrap();
        log.append(0, EventType::UnknownCard, now()).unwrap();
        log.append(1, EventType::Admitted, now()).unwrap();
        let trail = AuditTrail::new(log);

        let all: Vec<i64> = trail.list_events().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(all, vec![3, 2, 1]);

        let mine: Vec<EventType> = trail
            .list_events_for_user(1)
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(mine, vec![EventType::UserCreated, EventType::Admitted]);
    }
}
