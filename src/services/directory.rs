use crate::core::error::ServiceError;
use crate::models::event::EventType;
use crate::models::requests::{CreateUserRequest, UpdateUserRequest};
use crate::models::user::{User, UserStatus};
use crate::recorder::event_recorder::EventRecorder;
use crate::stores::UserStore;
use crate::validation::payload::validate_card_key;
use std::sync::Arc;
use tracing::info;

/// User registration, profile edits and the block/activation toggles
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
    recorder: EventRecorder,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserStore>, recorder: EventRecorder) -> Self {
        Self { users, recorder }
    }

    pub fn list_users(&self, only_active: bool) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.list(only_active)?)
    }

    /// Look up a badge holder. Blocked holders are reported as forbidden.
    pub fn get_user_by_card_key(&self, card_key: i64) -> Result<User, ServiceError> {
        let card_key = validate_card_key(card_key)?;
        let user = self
            .users
            .find_by_card_key(card_key)?
            .ok_or_else(|| ServiceError::NotFound(format!("No user with card key {}", card_key)))?;

        if !user.status.is_allowed() {
            return Err(ServiceError::Forbidden(format!(
                "User {} is blocked",
                user.id
            )));
        }

        Ok(user)
    }

    pub fn create_user(&self, request: CreateUserRequest) -> Result<User, ServiceError> {
        let fields = request.validate()?;
        let user = self.users.insert(fields)?;

        info!(
            user_id = user.id,
            card_key = user.card_key,
            name = %user.full_name(),
            status = %user.status,
            active = user.active,
            "User created"
        );
        self.recorder.record(user.id, EventType::UserCreated);

        Ok(user)
    }

    /// Replace the profile fields. Status, activation and check-in time are
    /// kept as stored.
    pub fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User, ServiceError> {
        let profile = request.validate()?;
        let mut pending = Some(profile);
        let user = self
            .users
            .modify(id, &mut |u| {
                if let Some(profile) = pending.take() {
                    profile.apply_to(u);
                }
            })?
            .ok_or_else(|| not_found(id))?;

        info!(user_id = user.id, card_key = user.card_key, "User updated");
        self.recorder.record(user.id, EventType::UserUpdated);

        Ok(user)
    }

    pub fn set_status(&self, id: i64, allowed: bool) -> Result<User, ServiceError> {
        let status = UserStatus::from_allowed(allowed);
        let user = self
            .users
            .modify(id, &mut |u| u.status = status)?
            .ok_or_else(|| not_found(id))?;

        let event_type = if allowed {
            EventType::SetUnblocked
        } else {
            EventType::SetBlocked
        };
        info!(user_id = id, status = %status, "User status changed");
        self.recorder.record(id, event_type);

        Ok(user)
    }

    pub fn set_active(&self, id: i64, active: bool) -> Result<User, ServiceError> {
        let user = self
            .users
            .modify(id, &mut |u| u.active = active)?
            .ok_or_else(|| not_found(id))?;

        let event_type = if active {
            EventType::Activated
        } else {
            EventType::Deactivated
        };
        info!(user_id = id, active, "User activation changed");
        self.recorder.record(id, event_type);

        Ok(user)
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("User {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::collector::Metrics;
    use crate::stores::doubles::ReadOnlyUserStore;
    use crate::stores::event_store::EventLog;
    use crate::stores::user_store::UserTable;
    use crate::stores::EventStore;

    fn setup() -> (UserDirectory, Arc<UserTable>, Arc<EventLog>, EventRecorder) {
        let users = Arc::new(UserTable::new());
        let events = Arc::new(EventLog::new());
        let (recorder, _) = EventRecorder::spawn(events.clone(), Arc::new(Metrics::new()), 64);
        let directory = UserDirectory::new(users.clone(), recorder.clone());
        (directory, users, events, recorder)
    }

    fn create_request(card_key: i64) -> CreateUserRequest {
        CreateUserRequest {
            card_key,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            status: None,
            active: None,
        }
    }

    fn event_types(events: &EventLog, user_id: i64) -> Vec<EventType> {
        events
            .list_for_user(user_id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[tokio::test]
    async fn test_create_user_records_event() {
        let (directory, _, events, recorder) = setup();

        let user = directory.create_user(create_request(42)).unwrap();
        recorder.flush().await;

        assert_eq!(user.status, UserStatus::Allowed);
        assert!(user.active);
        assert_eq!(user.last_checked_in, None);
        assert_eq!(event_types(&events, user.id), vec![EventType::UserCreated]);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_card_key() {
        let (directory, users, _, _) = setup();
        directory.create_user(create_request(42)).unwrap();

        let err = directory.create_user(create_request(42)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_persistence_failure() {
        let (recorder, _) = EventRecorder::spawn(
            Arc::new(EventLog::new()),
            Arc::new(Metrics::new()),
            8,
        );
        let directory = UserDirectory::new(
            Arc::new(ReadOnlyUserStore {
                inner: UserTable::new(),
            }),
            recorder,
        );

        let err = directory.create_user(create_request(42)).unwrap_err();
        assert!(matches!(err, ServiceError::PersistenceFailure(_)));
    }

    #[tokio::test]
    async fn test_status_toggle_round_trip() {
        let (directory, _, events, recorder) = setup();
        let user = directory.create_user(create_request(42)).unwrap();

        let blocked = directory.set_status(user.id, false).unwrap();
        assert_eq!(blocked.status, UserStatus::Blocked);
        let unblocked = directory.set_status(user.id, true).unwrap();
        assert_eq!(unblocked.status, user.status);
        recorder.flush().await;

        assert_eq!(
            event_types(&events, user.id),
            vec![
                EventType::UserCreated,
                EventType::SetBlocked,
                EventType::SetUnblocked
            ]
        );
    }

    #[tokio::test]
    async fn test_toggles_are_idempotent() {
        let (directory, _, events, recorder) = setup();
        let user = directory.create_user(create_request(42)).unwrap();

        let first = directory.set_active(user.id, false).unwrap();
        let second = directory.set_active(user.id, false).unwrap();
        assert_eq!(first, second);
        recorder.flush().await;

        assert_eq!(
            event_types(&events, user.id),
            vec![
                EventType::UserCreated,
                EventType::Deactivated,
                EventType::Deactivated
            ]
        );
    }

    #[tokio::test]
    async fn test_toggles_touch_one_field() {
        let (directory, _, _, _) = setup();
        let user = directory.create_user(create_request(42)).unwrap();

        let deactivated = directory.set_active(user.id, false).unwrap();
        assert_eq!(deactivated.status, UserStatus::Allowed);

        let blocked = directory.set_status(user.id, false).unwrap();
        assert!(!blocked.active);

        let reactivated = directory.set_active(user.id, true).unwrap();
        assert_eq!(reactivated.status, UserStatus::Blocked);
        assert!(reactivated.active);
    }

    #[tokio::test]
    async fn test_toggle_unknown_user() {
        let (directory, _, events, recorder) = setup();

        assert!(matches!(
            directory.set_status(77, true),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            directory.set_active(77, false),
            Err(ServiceError::NotFound(_))
        ));
        recorder.flush().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_update_user_keeps_flags() {
        let (directory, _, events, recorder) = setup();
        let user = directory.create_user(create_request(42)).unwrap();
        directory.set_status(user.id, false).unwrap();

        let updated = directory
            .update_user(
                user.id,
                UpdateUserRequest {
                    card_key: 43,
                    first_name: "Grace".to_string(),
                    last_name: "Hopper".to_string(),
                },
            )
            .unwrap();
        recorder.flush().await;

        assert_eq!(updated.card_key, 43);
        assert_eq!(updated.first_name, "Grace");
        assert_eq!(updated.status, UserStatus::Blocked);
        assert_eq!(
            event_types(&events, user.id).last(),
            Some(&EventType::UserUpdated)
        );
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let (directory, _, _, _) = setup();
        let result = directory.update_user(
            5,
            UpdateUserRequest {
                card_key: 43,
                first_name: "Grace".to_string(),
                last_name: String::new(),
            },
        );
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_user_by_card_key() {
        let (directory, _, _, _) = setup();
        let user = directory.create_user(create_request(42)).unwrap();

        assert_eq!(directory.get_user_by_card_key(42).unwrap(), user);
        assert!(matches!(
            directory.get_user_by_card_key(41),
            Err(ServiceError::NotFound(_))
        ));

        directory.set_status(user.id, false).unwrap();
        assert!(matches!(
            directory.get_user_by_card_key(42),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_list_users() {
        let (directory, _, _, _) = setup();
        let a = directory.create_user(create_request(1)).unwrap();
        let b = directory.create_user(create_request(2)).unwrap();
        directory.set_active(a.id, false).unwrap();

        let active = directory.list_users(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);
        assert_eq!(directory.list_users(false).unwrap().len(), 2);
    }
}
