use crate::core::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::stores::UserStore;
use crate::wal::wal::{Wal, WalOperation};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// In-memory user table with a card key index
pub struct UserTable {
    users: DashMap<i64, User>,
    /// card_key -> user id
    card_index: DashMap<i64, i64>,
    next_id: AtomicI64,
    wal: Option<Arc<Wal>>,
}

impl UserTable {
    /// Create a table that is not backed by a WAL
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            card_index: DashMap::new(),
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

    /// Load a row recovered from the WAL without logging it again
    pub fn restore(&self, user: User) {
        self.next_id.fetch_max(user.id + 1, Ordering::SeqCst);
        if let Some(previous) = self.users.get(&user.id).map(|u| u.card_key) {
            if previous != user.card_key {
                self.card_index.remove_if(&previous, |_, owner| *owner == user.id);
            }
        }
        self.card_index.insert(user.card_key, user.id);
        self.users.insert(user.id, user);
    }

    /// Reserve `card_key` for `user_id`. Succeeds if the key is free or
    /// already held by the same user.
    fn claim_card_key(&self, card_key: i64, user_id: i64) -> Result<(), StoreError> {
        match self.card_index.entry(card_key) {
            Entry::Occupied(entry) if *entry.get() != user_id => {
                Err(StoreError::DuplicateCardKey(card_key))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(user_id);
                Ok(())
            }
        }
    }

    fn release_card_key(&self, card_key: i64, user_id: i64) {
        self.card_index.remove_if(&card_key, |_, owner| *owner == user_id);
    }

    fn log(&self, user: &User) -> Result<(), StoreError> {
        if let Some(wal) = &self.wal {
            wal.log_operation(&WalOperation::PutUser(user.clone()))
                .map_err(|e| StoreError::Wal(format!("{:#}", e)))?;
        }
        Ok(())
    }
}

impl Default for UserTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for UserTable {
    fn insert(&self, fields: NewUser) -> Result<User, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.claim_card_key(fields.card_key, id)?;

        let user = User::new(id, fields);
        if let Err(e) = self.log(&user) {
            self.release_card_key(user.card_key, id);
            return Err(e);
        }

        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn modify(
        &self,
        id: i64,
        change: &mut dyn FnMut(&mut User),
    ) -> Result<Option<User>, StoreError> {
        // The row stays locked until the change is logged and applied
        let Some(mut entry) = self.users.get_mut(&id) else {
            return Ok(None);
        };

        let mut updated = entry.value().clone();
        change(&mut updated);
        updated.id = id;

        let previous_card = entry.value().card_key;
        let card_changed = updated.card_key != previous_card;
        if card_changed {
            self.claim_card_key(updated.card_key, id)?;
        }

        if let Err(e) = self.log(&updated) {
            if card_changed {
                self.release_card_key(updated.card_key, id);
            }
            return Err(e);
        }

        if card_changed {
            self.release_card_key(previous_card, id);
        }
        *entry.value_mut() = updated.clone();
        Ok(Some(updated))
    }

    fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    fn find_by_card_key(&self, card_key: i64) -> Result<Option<User>, StoreError> {
        let Some(id) = self.card_index.get(&card_key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.get(id)
    }

    fn list(&self, only_active: bool) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| !only_active || entry.value().active)
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    fn len(&self) -> usize {
        self.users.len()
    }
}
