//! Card check-in decisions.
//!
//! [`evaluate`] is the pure decision over a user record; [`AdmissionEngine`]
//! wraps it with the lookup, the check-in timestamp write and the audit event.

use crate::core::error::ServiceError;
use crate::metrics::collector::Metrics;
use crate::models::event::{EventType, NO_USER};
use crate::models::user::User;
use crate::recorder::event_recorder::EventRecorder;
use crate::stores::UserStore;
use crate::utils::time::now;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    Blocked,
    Deactivated,
}

impl DenialReason {
    pub fn event_type(self) -> EventType {
        match self {
            DenialReason::Blocked => EventType::DeniedBlocked,
            DenialReason::Deactivated => EventType::DeniedInactive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::Blocked => "blocked",
            DenialReason::Deactivated => "deactivated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Deny(DenialReason),
}

/// Only an allowed and active user is admitted. A blocked user is reported
/// as blocked even when also deactivated.
pub fn evaluate(user: &User) -> Verdict {
    if !user.status.is_allowed() {
        return Verdict::Deny(DenialReason::Blocked);
    }
    if !user.active {
        return Verdict::Deny(DenialReason::Deactivated);
    }
    Verdict::Admit
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionOutcome {
    /// Carries the user with the new check-in time
    Admitted(User),
    Denied { user: User, reason: DenialReason },
    NotFound,
}

#[derive(Clone)]
pub struct AdmissionEngine {
    users: Arc<dyn UserStore>,
    recorder: EventRecorder,
    metrics: Arc<Metrics>,
}

impl AdmissionEngine {
    pub fn new(users: Arc<dyn UserStore>, recorder: EventRecorder, metrics: Arc<Metrics>) -> Self {
        Self {
            users,
            recorder,
            metrics,
        }
    }

    /// Decide whether the holder of `card_key` may enter.
    ///
    /// Any integer is looked up. Keys no user can hold (zero or negative)
    /// are reported as unknown cards like any other miss.
    ///
    /// On admission the check-in time is persisted before the ADMITTED event
    /// is queued; if that write fails the call fails and no event is queued.
    /// Event recording never affects the result.
    pub fn authenticate(&self, card_key: i64) -> Result<AdmissionOutcome, ServiceError> {
        let Some(user) = self.users.find_by_card_key(card_key)? else {
            self.metrics.increment_unknown_cards();
            warn!(card_key, "Unknown card presented");
            self.recorder.record(NO_USER, EventType::UnknownCard);
            return Ok(AdmissionOutcome::NotFound);
        };

        match evaluate(&user) {
            Verdict::Admit => {
                let checked_in_at = now();
                let admitted = self
                    .users
                    .modify(user.id, &mut |u| u.last_checked_in = Some(checked_in_at))
                    .map_err(|e| {
                        error!(user_id = user.id, error = %e, "Failed to persist check-in time");
                        e
                    })?
                    .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user.id)))?;

                self.metrics.increment_admitted();
                info!(
                    user_id = admitted.id,
                    card_key,
                    name = %admitted.full_name(),
                    "User admitted"
                );
                self.recorder.record(admitted.id, EventType::Admitted);

                Ok(AdmissionOutcome::Admitted(admitted))
            }
            Verdict::Deny(reason) => {
                self.metrics.increment_denied();
                info!(
                    user_id = user.id,
                    card_key,
                    reason = reason.as_str(),
                    "User denied"
                );
                self.recorder.record(user.id, reason.event_type());

                Ok(AdmissionOutcome::Denied { user, reason })
            }
        }
    }

    /// Log an exit. A known card ties the event to its holder, anything else
    /// is logged without user context. Returns the user id used.
    pub fn record_exit(&self, card_key: Option<i64>) -> i64 {
        let user_id = match card_key.filter(|key| *key > 0) {
            Some(key) => match self.users.find_by_card_key(key) {
                Ok(Some(user)) => user.id,
                Ok(None) => NO_USER,
                Err(e) => {
                    warn!(
                        card_key = key,
                        error = %e,
                        "Card lookup failed, logging exit without user"
                    );
                    NO_USER
                }
            },
            None => NO_USER,
        };

        info!(user_id, "Exit recorded");
        self.recorder.record(user_id, EventType::Exit);
        user_id
    }
}
