use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Current time rounded up to the next millisecond, the resolution the WAL
/// stores timestamps at. Never earlier than the instant of the call.
pub fn now() -> DateTime<Utc> {
    let exact = Utc::now();
    let truncated = exact.trunc_subsecs(3);
    if truncated < exact {
        truncated + Duration::milliseconds(1)
    } else {
        truncated
    }
}

pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

pub fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
