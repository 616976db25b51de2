use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User id carried by events that have no user context
pub const NO_USER: i64 = 0;

/// Audit vocabulary. The numeric codes are stable and stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventType {
    Admitted = 1,
    DeniedBlocked = 2,
    UnknownCard = 3,
    SetBlocked = 4,
    SetUnblocked = 5,
    UserCreated = 6,
    UserUpdated = 7,
    Deactivated = 8,
    Exit = 9,
    Activated = 10,
    DeniedInactive = 11,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        EventType::Admitted,
        EventType::DeniedBlocked,
        EventType::UnknownCard,
        EventType::SetBlocked,
        EventType::SetUnblocked,
        EventType::UserCreated,
        EventType::UserUpdated,
        EventType::Deactivated,
        EventType::Exit,
        EventType::Activated,
        EventType::DeniedInactive,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Admitted => "admitted",
            EventType::DeniedBlocked => "denied_blocked",
            EventType::UnknownCard => "unknown_card",
            EventType::SetBlocked => "set_blocked",
            EventType::SetUnblocked => "set_unblocked",
            EventType::UserCreated => "user_created",
            EventType::UserUpdated => "user_updated",
            EventType::Deactivated => "deactivated",
            EventType::Exit => "exit",
            EventType::Activated => "activated",
            EventType::DeniedInactive => "denied_inactive",
        }
    }
}

impl From<EventType> for u8 {
    fn from(event_type: EventType) -> Self {
        event_type.code()
    }
}

impl TryFrom<u8> for EventType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        EventType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| format!("unknown event type code {}", code))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// `NO_USER` when the action had no resolvable user
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub event_type: EventType,
}

impl Event {
    pub fn new(id: i64, user_id: i64, event_type: EventType, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            created_at,
            event_type,
        }
    }
}
