//! Next-occurrence calendar arithmetic.
//!
//! Pure, deterministic date math: given a schedule definition and a reference
//! date (now, or an actual completion date when re-anchoring), compute the
//! next occurrence. No I/O, no clock reads.
//!
//! All computed occurrences are normalized to the subsystem's canonical
//! materialization hour and then weekend-adjusted: Saturday moves back to
//! Friday, Sunday forward to Monday, preserving time-of-day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::domain::schedule::{Frequency, Schedule};

/// Canonical time-of-day (UTC hour) for computed occurrences.
pub const CANONICAL_HOUR: u32 = 13;

/// How a CUSTOM frequency is interpreted.
///
/// The two consumers disagree: one rejects CUSTOM outright, the other reads
/// `interval_count` as a day count. Both behaviors are kept as named,
/// per-consumer policies; see DESIGN.md before unifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomPolicy {
    /// CUSTOM has no next occurrence.
    Unsupported,
    /// CUSTOM advances by `interval_count` days.
    DaysInterval,
}

impl std::str::FromStr for CustomPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsupported" => Ok(Self::Unsupported),
            "days_interval" | "days" => Ok(Self::DaysInterval),
            _ => Err(format!("Unknown custom policy: {s}")),
        }
    }
}

/// Compute the next occurrence after `reference`, or `None` when the
/// schedule has nothing left to fire (ONCE, or CUSTOM under
/// [`CustomPolicy::Unsupported`]).
///
/// The result is strictly after `reference`.
#[must_use]
pub fn next_occurrence(
    schedule: &Schedule,
    reference: DateTime<Utc>,
    policy: CustomPolicy,
) -> Option<DateTime<Utc>> {
    let interval = i64::from(schedule.interval_count.max(1));

    let raw = match schedule.frequency {
        // The only occurrence is specific_date, fixed at creation.
        Frequency::Once => return None,
        Frequency::Daily => reference + Duration::days(interval),
        Frequency::Weekly => {
            align_to_weekday(reference + Duration::weeks(interval), schedule.day_of_week)
        }
        Frequency::Biweekly => align_to_weekday(
            reference + Duration::weeks(2 * interval),
            schedule.day_of_week,
        ),
        Frequency::Annual => add_years(
            reference,
            schedule.interval_count.max(1),
            schedule.month,
            schedule.day_of_month,
        ),
        Frequency::Custom => match policy {
            CustomPolicy::Unsupported => return None,
            CustomPolicy::DaysInterval => reference + Duration::days(interval),
        },
        monthly => {
            // month_step is Some for the whole monthly family.
            let step = monthly.month_step().unwrap_or(1);
            add_months(
                reference,
                step.saturating_mul(schedule.interval_count.max(1)),
                schedule.day_of_month,
            )
        }
    };

    let mut next = adjust_weekend(at_canonical_hour(raw));
    if next <= reference {
        // A Saturday occurrence pulled back to Friday can land on or before
        // the reference; roll it forward to Monday instead.
        next += Duration::days(3);
    }
    Some(next)
}

/// Normalize a datetime to the canonical materialization hour.
#[must_use]
pub fn at_canonical_hour(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .date_naive()
        .and_hms_opt(CANONICAL_HOUR, 0, 0)
        .map_or(value, |naive| {
            DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        })
}

/// Saturday moves back one day, Sunday forward one day; weekdays pass
/// through. Time-of-day is preserved.
#[must_use]
pub fn adjust_weekend(value: DateTime<Utc>) -> DateTime<Utc> {
    match value.weekday() {
        Weekday::Sat => value - Duration::days(1),
        Weekday::Sun => value + Duration::days(1),
        _ => value,
    }
}

/// Roll forward 0-6 days to land on the anchor weekday, when one is set.
fn align_to_weekday(value: DateTime<Utc>, anchor: Option<Weekday>) -> DateTime<Utc> {
    let Some(anchor) = anchor else {
        return value;
    };
    let current = value.weekday().num_days_from_monday();
    let target = anchor.num_days_from_monday();
    let offset = (7 + target - current) % 7;
    value + Duration::days(i64::from(offset))
}

/// Add calendar months, clamping the day to the last valid day of the
/// target month. The anchor day, when set, overrides the reference day.
fn add_months(reference: DateTime<Utc>, months: u32, anchor_day: Option<u32>) -> DateTime<Utc> {
    let naive = reference.naive_utc();
    let mut year = naive.date().year();
    let mut month = naive.date().month() as i32 + months as i32;

    while month > 12 {
        month -= 12;
        year += 1;
    }

    let month = month as u32;
    let day = anchor_day
        .unwrap_or_else(|| naive.date().day())
        .min(days_in_month(year, month))
        .max(1);
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| naive.date());

    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(naive.time()), Utc)
}

/// Add calendar years, honoring the month and day anchors when set.
fn add_years(
    reference: DateTime<Utc>,
    years: u32,
    anchor_month: Option<u32>,
    anchor_day: Option<u32>,
) -> DateTime<Utc> {
    let naive = reference.naive_utc();
    let year = naive.date().year() + years as i32;
    let month = anchor_month.unwrap_or_else(|| naive.date().month()).clamp(1, 12);
    let day = anchor_day
        .unwrap_or_else(|| naive.date().day())
        .min(days_in_month(year, month))
        .max(1);
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| naive.date());

    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(naive.time()), Utc)
}

/// Last valid day of a month, leap-aware.
fn days_in_month(year: i32, month: u32) -> u32 {
    for day in (28..=31).rev() {
        if NaiveDate::from_ymd_opt(year, month, day).is_some() {
            return day;
        }
    }
    28
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::ConsumerKind;
    use chrono::{TimeZone, Timelike};
    use uuid::Uuid;

    fn schedule(frequency: Frequency) -> Schedule {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Schedule {
            id: Uuid::new_v4(),
            name: None,
            frequency,
            interval_count: 1,
            day_of_week: None,
            day_of_month: None,
            month: None,
            specific_date: None,
            next_run: None,
            last_run: None,
            finished_at: None,
            is_active: true,
            resource_id: Uuid::new_v4(),
            payload: serde_json::Value::Null,
            consumer: ConsumerKind::Maintenance,
            created_at: now,
            updated_at: now,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_every_recurring_frequency_is_strictly_later() {
        let references = [
            at(2024, 1, 15, 9),
            at(2024, 2, 29, 13),
            at(2024, 12, 31, 23),
            at(2023, 6, 30, 13),
            // Friday evening, the tightest case for the weekend pullback.
            at(2024, 3, 1, 20),
        ];
        let frequencies = [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
            Frequency::Bimonthly,
            Frequency::Quarterly,
            Frequency::Triannual,
            Frequency::Quadrimestral,
            Frequency::SemiAnnual,
            Frequency::Annual,
            Frequency::Custom,
        ];
        for reference in references {
            for frequency in frequencies {
                let next = next_occurrence(&schedule(frequency), reference, CustomPolicy::DaysInterval)
                    .expect("recurring frequency should produce a next occurrence");
                assert!(
                    next > reference,
                    "{frequency} from {reference} produced {next}, not strictly later"
                );
            }
        }
    }

    #[test]
    fn test_once_has_no_next_occurrence() {
        let mut s = schedule(Frequency::Once);
        s.specific_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(next_occurrence(&s, at(2024, 1, 1, 0), CustomPolicy::DaysInterval).is_none());
    }

    #[test]
    fn test_custom_policy_divergence() {
        let mut s = schedule(Frequency::Custom);
        s.interval_count = 10;
        let reference = at(2024, 3, 4, 13); // Monday

        assert!(next_occurrence(&s, reference, CustomPolicy::Unsupported).is_none());

        let next = next_occurrence(&s, reference, CustomPolicy::DaysInterval).unwrap();
        // 10 days later is Thursday 2024-03-14, no weekend shift.
        assert_eq!(next, at(2024, 3, 14, 13));
    }

    #[test]
    fn test_result_lands_on_canonical_hour() {
        let s = schedule(Frequency::Daily);
        let next = next_occurrence(&s, at(2024, 3, 5, 7), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next.time().hour(), CANONICAL_HOUR);
        assert_eq!(next.time().minute(), 0);
    }

    #[test]
    fn test_saturday_shifts_back_to_friday() {
        let s = schedule(Frequency::Daily);
        // Friday morning + 1 day = Saturday 2024-03-09 -> Friday 2024-03-08.
        // The pullback lands after the reference, so it stands.
        let next = next_occurrence(&s, at(2024, 3, 8, 7), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 3, 8, 13));
        assert_eq!(next.weekday(), Weekday::Fri);
    }

    #[test]
    fn test_saturday_pullback_never_lands_before_reference() {
        let s = schedule(Frequency::Daily);
        // Friday evening + 1 day = Saturday; Friday 13:00 is already past,
        // so the occurrence rolls forward to Monday.
        let next = next_occurrence(&s, at(2024, 3, 8, 20), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 3, 11, 13));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_sunday_shifts_forward_to_monday() {
        let s = schedule(Frequency::Daily);
        // Saturday + 1 day = Sunday 2024-03-10 -> Monday 2024-03-11.
        let next = next_occurrence(&s, at(2024, 3, 9, 7), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 3, 11, 13));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_weekend_shift_preserves_time_of_day() {
        let saturday = at(2024, 3, 9, 13);
        let shifted = adjust_weekend(saturday);
        assert_eq!(shifted.weekday(), Weekday::Fri);
        assert_eq!(shifted.time(), saturday.time());

        let sunday = at(2024, 3, 10, 13);
        let shifted = adjust_weekend(sunday);
        assert_eq!(shifted.weekday(), Weekday::Mon);
        assert_eq!(shifted.time(), sunday.time());
    }

    #[test]
    fn test_monthly_clamps_to_february_end() {
        let mut s = schedule(Frequency::Monthly);
        s.day_of_month = Some(31);
        // 2024 is a leap year: Jan 31 + 1 month -> Feb 29.
        let next = next_occurrence(&s, at(2024, 1, 31, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 2, 29, 13));

        // 2025 is not: Jan 31 + 1 month -> Feb 28.
        let next = next_occurrence(&s, at(2025, 1, 31, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2025, 2, 28, 13));
    }

    #[test]
    fn test_monthly_honors_day_anchor() {
        let mut s = schedule(Frequency::Monthly);
        s.day_of_month = Some(10);
        // The anchor day wins over the reference day.
        let next = next_occurrence(&s, at(2024, 3, 15, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 4, 10, 13));
    }

    #[test]
    fn test_monthly_family_step_widths() {
        let reference = at(2024, 1, 10, 13);
        let cases = [
            (Frequency::Monthly, at(2024, 2, 9, 13)), // Feb 10 is a Saturday
            (Frequency::Bimonthly, at(2024, 3, 11, 13)), // Mar 10 is a Sunday
            (Frequency::Quarterly, at(2024, 4, 10, 13)),
            (Frequency::Triannual, at(2024, 5, 10, 13)),
            (Frequency::Quadrimestral, at(2024, 5, 10, 13)),
            (Frequency::SemiAnnual, at(2024, 7, 10, 13)),
        ];
        for (frequency, expected) in cases {
            let mut s = schedule(frequency);
            s.day_of_month = Some(10);
            let next = next_occurrence(&s, reference, CustomPolicy::Unsupported).unwrap();
            assert_eq!(next, expected, "{frequency}");
        }
    }

    #[test]
    fn test_monthly_interval_multiplier() {
        let mut s = schedule(Frequency::Monthly);
        s.interval_count = 3;
        s.day_of_month = Some(15);
        let next = next_occurrence(&s, at(2024, 1, 15, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 4, 15, 13));
    }

    #[test]
    fn test_monthly_year_rollover() {
        let mut s = schedule(Frequency::Quarterly);
        s.day_of_month = Some(20);
        let next = next_occurrence(&s, at(2024, 11, 20, 13), CustomPolicy::Unsupported).unwrap();
        // Nov + 3 months = Feb next year; Feb 20 2025 is a Thursday.
        assert_eq!(next, at(2025, 2, 20, 13));
    }

    #[test]
    fn test_weekly_aligns_to_anchor_weekday() {
        let mut s = schedule(Frequency::Weekly);
        s.day_of_week = Some(Weekday::Wed);
        // Monday 2024-03-04 + 1 week = Monday 2024-03-11, rolled to Wed 13th.
        let next = next_occurrence(&s, at(2024, 3, 4, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 3, 13, 13));
        assert_eq!(next.weekday(), Weekday::Wed);
    }

    #[test]
    fn test_biweekly_steps_two_weeks() {
        let s = schedule(Frequency::Biweekly);
        // Monday 2024-03-04 + 2 weeks = Monday 2024-03-18.
        let next = next_occurrence(&s, at(2024, 3, 4, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2024, 3, 18, 13));
    }

    #[test]
    fn test_annual_honors_month_and_day_anchors() {
        let mut s = schedule(Frequency::Annual);
        s.month = Some(6);
        s.day_of_month = Some(1);
        // Jun 1 2025 is a Sunday -> Monday Jun 2.
        let next = next_occurrence(&s, at(2024, 6, 1, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2025, 6, 2, 13));
    }

    #[test]
    fn test_annual_leap_day_clamps() {
        let mut s = schedule(Frequency::Annual);
        s.month = Some(2);
        s.day_of_month = Some(29);
        // 2025 has no Feb 29: clamp to Feb 28 (a Friday).
        let next = next_occurrence(&s, at(2024, 2, 29, 13), CustomPolicy::Unsupported).unwrap();
        assert_eq!(next, at(2025, 2, 28, 13));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_end_to_end_monthly_example() {
        // Monthly schedule anchored on day 10, planned for 2024-03-10 13:00.
        let mut s = schedule(Frequency::Monthly);
        s.day_of_month = Some(10);
        let planned = at(2024, 3, 10, 13);
        let next = next_occurrence(&s, planned, CustomPolicy::Unsupported).unwrap();
        // 2024-04-10 is a Wednesday; no weekend adjustment.
        assert_eq!(next, at(2024, 4, 10, 13));
    }
}
