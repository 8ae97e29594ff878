//! Lead-time gating.
//!
//! Work is created ahead of its occurrence date so it can be prepared:
//! short cadences get one day of lead, everything else a week. The scanner's
//! coarse phase uses the global maximum ([`MAX_LEAD_DAYS`]) so the precise
//! per-frequency rule stays out of the storage query.

use chrono::{DateTime, Duration, Utc};

use crate::domain::schedule::{Frequency, Schedule};

/// Global maximum lead time, the coarse scan horizon.
pub const MAX_LEAD_DAYS: i64 = 7;

/// Days of lead for a frequency class.
#[must_use]
pub fn lead_time_days(frequency: Frequency) -> i64 {
    match frequency {
        Frequency::Daily | Frequency::Weekly | Frequency::Biweekly => 1,
        _ => MAX_LEAD_DAYS,
    }
}

/// Precise gate: should this schedule's work be created today?
///
/// Inclusive boundary: a `next_run` exactly `lead_time_days` away is due.
#[must_use]
pub fn is_due_for_materialization(schedule: &Schedule, now: DateTime<Utc>) -> bool {
    if !schedule.is_active {
        return false;
    }
    schedule
        .next_run
        .is_some_and(|next| next <= now + Duration::days(lead_time_days(schedule.frequency)))
}
