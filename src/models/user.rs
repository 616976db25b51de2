use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative allow/block flag, stored as a numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UserStatus {
    Blocked = 0,
    Allowed = 1,
}

impl UserStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            UserStatus::Allowed
        } else {
            UserStatus::Blocked
        }
    }

    pub fn is_allowed(self) -> bool {
        self == UserStatus::Allowed
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Allowed
    }
}

impl From<UserStatus> for u8 {
    fn from(status: UserStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for UserStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(UserStatus::Blocked),
            1 => Ok(UserStatus::Allowed),
            other => Err(format!("unknown user status code {}", other)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Blocked => f.write_str("blocked"),
            UserStatus::Allowed => f.write_str("allowed"),
        }
    }
}

/// A badge holder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// System-assigned identifier
    pub id: i64,
    /// External badge identifier, unique among users
    pub card_key: i64,
    pub first_name: String,
    pub last_name: String,
    /// Block/unblock axis
    pub status: UserStatus,
    /// Deactivation axis, independent of `status`
    pub active: bool,
    /// Set only when the user is admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_in: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: i64, fields: NewUser) -> Self {
        Self {
            id,
            card_key: fields.card_key,
            first_name: fields.first_name,
            last_name: fields.last_name,
            status: fields.status,
            active: fields.active,
            last_checked_in: None,
        }
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Validated fields for registering a user
#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub card_key: i64,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
    pub active: bool,
}

/// Validated profile fields for an update. Status, activation and check-in
/// time have dedicated operations and are never touched here.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileUpdate {
    pub card_key: i64,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileUpdate {
    pub fn apply_to(self, user: &mut User) {
        user.card_key = self.card_key;
        user.first_name = self.first_name;
        user.last_name = self.last_name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::new(
            7,
            NewUser {
                card_key: 42,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                status: UserStatus::Allowed,
                active: true,
            },
        )
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(UserStatus::Blocked.code(), 0);
        assert_eq!(UserStatus::Allowed.code(), 1);
        assert_eq!(UserStatus::try_from(1).unwrap(), UserStatus::Allowed);
        assert!(UserStatus::try_from(2).is_err());
    }

    #[test]
    fn test_status_serializes_as_number() {
        let user = sample();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["status"], 1);
        assert_eq!(json["card_key"], 42);
        assert!(json.get("last_checked_in").is_none());
    }

    #[test]
    fn test_unknown_status_code_rejected() {
        let json = r#"{"id":1,"card_key":1,"first_name":"a","last_name":"b",
            "status":5,"active":true}"#;
        assert!(serde_json::from_str::<User>(json).is_err());
    }

    #[test]
    fn test_profile_update_keeps_status_and_activation() {
        let mut user = sample();
        user.status = UserStatus::Blocked;
        user.active = false;

        ProfileUpdate {
            card_key: 43,
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
        }
        .apply_to(&mut user);

        assert_eq!(user.card_key, 43);
        assert_eq!(user.full_name(), "Grace Hopper");

        user.last_name.clear();
        assert_eq!(user.full_name(), "Grace");
        assert_eq!(user.status, UserStatus::Blocked);
        assert!(!user.active);
    }
}
