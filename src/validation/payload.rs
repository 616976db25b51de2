use crate::core::error::ValidationError;
use crate::models::requests::{CreateUserRequest, UpdateUserRequest};
use crate::models::user::{NewUser, ProfileUpdate};

pub const MAX_NAME_LENGTH: usize = 100;

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        Ok(NewUser {
            card_key: validate_card_key(self.card_key)?,
            first_name: validate_name("first_name", &self.first_name, true)?,
            last_name: validate_name("last_name", &self.last_name, false)?,
            status: self.status.unwrap_or_default(),
            active: self.active.unwrap_or(true),
        })
    }
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationError> {
        Ok(ProfileUpdate {
            card_key: validate_card_key(self.card_key)?,
            first_name: validate_name("first_name", &self.first_name, true)?,
            last_name: validate_name("last_name", &self.last_name, false)?,
        })
    }
}

/// Card keys are positive; 0 is what a client sends when it omits the field
pub fn validate_card_key(card_key: i64) -> Result<i64, ValidationError> {
    if card_key <= 0 {
        return Err(ValidationError::OutOfRange(format!(
            "card_key must be positive, got {}",
            card_key
        )));
    }
    Ok(card_key)
}

fn validate_name(field: &str, value: &str, required: bool) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if required && trimmed.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(trimmed.to_string())
}

/// Parse a user id from a path segment
pub fn parse_user_id(raw: &str) -> Result<i64, ValidationError> {
    let id = parse_integer("id", raw)?;
    if id <= 0 {
        return Err(ValidationError::OutOfRange(format!(
            "id must be positive, got {}",
            id
        )));
    }
    Ok(id)
}

/// Parse a user id used to filter the audit trail; 0 selects events
/// without user context
pub fn parse_event_user_id(raw: &str) -> Result<i64, ValidationError> {
    let id = parse_integer("user_id", raw)?;
    if id < 0 {
        return Err(ValidationError::OutOfRange(format!(
            "user_id must not be negative, got {}",
            id
        )));
    }
    Ok(id)
}

/// Parse a card key from a path segment
pub fn parse_card_key(raw: &str) -> Result<i64, ValidationError> {
    validate_card_key(parse_integer("card_key", raw)?)
}

fn parse_integer(field: &str, raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| {
            ValidationError::InvalidFormat(format!("{} must be an integer, got '{}'", field, raw))
        })
}
