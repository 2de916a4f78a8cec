//! Saturating time arithmetic for configured and requested offsets.

use chrono::{DateTime, TimeDelta, Utc};

/// 9999-12-31T23:59:59Z.
const FAR_FUTURE_SECS: i64 = 253_402_300_799;

/// The instant offsets that cannot be represented are clamped to.
pub fn far_future() -> DateTime<Utc> {
    DateTime::from_timestamp(FAR_FUTURE_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `t` plus `secs` seconds, clamped to [`far_future`].
pub fn add_secs(t: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    let cap = far_future().max(t);
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| t.checked_add_signed(delta))
        .map_or(cap, |end| end.min(cap))
}
