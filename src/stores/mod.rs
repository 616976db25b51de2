//! Persistence seams.
//!
//! Operations receive their stores as `Arc<dyn UserStore>` /
//! `Arc<dyn EventStore>` so tests can substitute doubles. The shipped
//! implementations keep rows in memory and make them durable through the WAL.

pub mod event_store;
pub mod user_store;

use crate::core::error::StoreError;
use crate::models::event::{Event, EventType};
use crate::models::user::{NewUser, User};
use chrono::{DateTime, Utc};

pub trait UserStore: Send + Sync {
    /// Assign an id and store a new user. Fails if the card key is taken.
    fn insert(&self, fields: NewUser) -> Result<User, StoreError>;

    /// Apply `change` to the stored row and persist the result. Returns
    /// `None` if no user has that id. Fails if the change moves the card key
    /// onto one held by a different user.
    fn modify(
        &self,
        id: i64,
        change: &mut dyn FnMut(&mut User),
    ) -> Result<Option<User>, StoreError>;

    fn get(&self, id: i64) -> Result<Option<User>, StoreError>;

    fn find_by_card_key(&self, card_key: i64) -> Result<Option<User>, StoreError>;

    /// Users ordered by id ascending
    fn list(&self, only_active: bool) -> Result<Vec<User>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait EventStore: Send + Sync {
    /// Append one immutable row and return it with its assigned id
    fn append(
        &self,
        user_id: i64,
        event_type: EventType,
        created_at: DateTime<Utc>,
    ) -> Result<Event, StoreError>;

    /// All events, newest first
    fn list(&self) -> Result<Vec<Event>, StoreError>;

    /// Events of one user in write order
    fn list_for_user(&self, user_id: i64) -> Result<Vec<Event>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod doubles {
    use super::*;
    use crate::stores::event_store::EventLog;
    use std::sync::{Mutex, MutexGuard};

    /// Event store whose every write fails, simulating an outage
    pub struct FailingEventStore;

    impl EventStore for FailingEventStore {
        fn append(&self, _: i64, _: EventType, _: DateTime<Utc>) -> Result<Event, StoreError> {
            Err(StoreError::Wal("simulated outage".to_string()))
        }

        fn list(&self) -> Result<Vec<Event>, StoreError> {
            Ok(Vec::new())
        }

        fn list_for_user(&self, _: i64) -> Result<Vec<Event>, StoreError> {
            Ok(Vec::new())
        }

        fn len(&self) -> usize {
            0
        }
    }

    /// Event store whose writes wait until the test releases the gate
    pub struct GatedEventStore {
        gate: Mutex<()>,
        inner: EventLog,
    }

    impl GatedEventStore {
        pub fn new() -> Self {
            Self {
                gate: Mutex::new(()),
                inner: EventLog::new(),
            }
        }

        pub fn close_gate(&self) -> MutexGuard<'_, ()> {
            self.gate.lock().unwrap()
        }
    }

    impl EventStore for GatedEventStore {
        fn append(
            &self,
            user_id: i64,
            event_type: EventType,
            created_at: DateTime<Utc>,
        ) -> Result<Event, StoreError> {
            let _open = self.gate.lock().unwrap();
            self.inner.append(user_id, event_type, created_at)
        }

        fn list(&self) -> Result<Vec<Event>, StoreError> {
            self.inner.list()
        }

        fn list_for_user(&self, user_id: i64) -> Result<Vec<Event>, StoreError> {
            self.inner.list_for_user(user_id)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    /// User store whose writes fail while reads keep working
    pub struct ReadOnlyUserStore<S> {
        pub inner: S,
    }

    impl<S: UserStore> UserStore for ReadOnlyUserStore<S> {
        fn insert(&self, _: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Wal("simulated outage".to_string()))
        }

        fn modify(
            &self,
            _: i64,
            _: &mut dyn FnMut(&mut User),
        ) -> Result<Option<User>, StoreError> {
            Err(StoreError::Wal("simulated outage".to_string()))
        }

        fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
            self.inner.get(id)
        }

        fn find_by_card_key(&self, card_key: i64) -> Result<Option<User>, StoreError> {
            self.inner.find_by_card_key(card_key)
        }

        fn list(&self, only_active: bool) -> Result<Vec<User>, StoreError> {
            self.inner.list(only_active)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }
}
