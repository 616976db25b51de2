use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::core::config::StorageConfig;
use crate::stores::event_store::EventLog;
use crate::stores::user_store::UserTable;
use crate::stores::{EventStore, UserStore};
use crate::wal::wal::{Wal, WalOperation};

pub struct Stores {
    pub users: Arc<UserTable>,
    pub events: Arc<EventLog>,
}

/// Build the user and event tables, replaying the WAL when one is configured
pub fn open_stores(config: &StorageConfig) -> Result<Stores> {
    let Some(wal_path) = &config.wal_path else {
        info!("No WAL configured, users and events are kept in memory only");
        return Ok(Stores {
            users: Arc::new(UserTable::new()),
            events: Arc::new(EventLog::new()),
        });
    };

    let wal = Arc::new(Wal::new(wal_path.clone()).context("Failed to initialize WAL")?);
    info!(wal_path = %wal.path().display(), "WAL initialized");

    let stores = Stores {
        users: Arc::new(UserTable::with_wal(Arc::clone(&wal))),
        events: Arc::new(EventLog::with_wal(wal.clone())),
    };

    let operations = wal.replay().context("Failed to replay WAL")?;
    apply_wal_operations(&stores, &operations);

    info!(
        operations_replayed = operations.len(),
        users_loaded = stores.users.len(),
        events_loaded = stores.events.len(),
        "WAL replay completed"
    );

    Ok(stores)
}

// this runs at boot time
pub fn apply_wal_operations(stores: &Stores, operations: &[WalOperation]) {
    for op in operations {
        match op {
            WalOperation::PutUser(user) => stores.users.restore(user.clone()),
            WalOperation::AppendEvent(event) => stores.events.restore(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventType;
    use crate::models::user::{NewUser, UserStatus};
    use crate::utils::time::now;
    use tempfile::TempDir;

    fn new_user(card_key: i64) -> NewUser {
        NewUser {
            card_key,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            status: UserStatus::Allowed,
            active: true,
        }
    }

    #[test]
    fn test_memory_only_stores() {
        let stores = open_stores(&StorageConfig { wal_path: None }).unwrap();
        assert!(stores.users.is_empty());
        assert!(stores.events.is_empty());
    }

    #[test]
    fn test_reopen_restores_state() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            wal_path: Some(temp_dir.path().join("checkin.wal")),
        };

        let checked_in_at = now();
        let (user, event) = {
            let stores = open_stores(&config).unwrap();
            let user = stores.users.insert(new_user(42)).unwrap();
            stores.users.insert(new_user(43)).unwrap();
            let user = stores
                .users
                .modify(user.id, &mut |u| {
                    u.status = UserStatus::Blocked;
                    u.last_checked_in = Some(checked_in_at);
                })
                .unwrap()
                .unwrap();
            let event = stores
                .events
                .append(user.id, EventType::SetBlocked, now())
                .unwrap();
            (user, event)
        };

        let reopened = open_stores(&config).unwrap();
        assert_eq!(reopened.users.len(), 2);
        assert_eq!(reopened.users.get(user.id).unwrap(), Some(user.clone()));
        assert_eq!(reopened.users.find_by_card_key(42).unwrap().unwrap().id, user.id);
        assert_eq!(reopened.events.list().unwrap(), vec![event]);

        // Sequences continue after the replayed rows
        assert_eq!(reopened.users.insert(new_user(44)).unwrap().id, 3);
        assert_eq!(
            reopened.events.append(0, EventType::Exit, now()).unwrap().id,
            2
        );
        assert!(matches!(
            reopened.users.insert(new_user(42)),
            Err(crate::core::error::StoreError::DuplicateCardKey(42))
        ));
    }
}
