//! Recurring schedule definitions.
//!
//! A [`Schedule`] pins a recurrence class ([`Frequency`]) to real calendar
//! dates through its anchor fields and carries the timeline the scanner and
//! materializer advance (`next_run`/`last_run`). Materialized work orders
//! hold a back-reference to the owning schedule id.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchedulingError, SchedulingResult};

/// Recurrence class of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Fires exactly once, on `specific_date`. Terminal after materialization.
    Once,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    /// Three times a year (every four months).
    Triannual,
    /// Every four months.
    Quadrimestral,
    SemiAnnual,
    Annual,
    /// Consumer-defined interval; interpretation is a per-consumer policy.
    Custom,
}

impl Frequency {
    /// Month step for the monthly family, `None` for everything else.
    #[must_use]
    pub fn month_step(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Bimonthly => Some(2),
            Self::Quarterly => Some(3),
            Self::Triannual | Self::Quadrimestral => Some(4),
            Self::SemiAnnual => Some(6),
            _ => None,
        }
    }

    /// True for classes that anchor to a day of the month.
    #[must_use]
    pub fn is_monthly_family(&self) -> bool {
        self.month_step().is_some()
    }

    /// String form used in storage and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Bimonthly => "bimonthly",
            Self::Quarterly => "quarterly",
            Self::Triannual => "triannual",
            Self::Quadrimestral => "quadrimestral",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "bimonthly" => Ok(Self::Bimonthly),
            "quarterly" => Ok(Self::Quarterly),
            "triannual" => Ok(Self::Triannual),
            "quadrimestral" => Ok(Self::Quadrimestral),
            "semi_annual" | "semiannual" => Ok(Self::SemiAnnual),
            "annual" => Ok(Self::Annual),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Unknown frequency: {s}")),
        }
    }
}

/// Which consumer materializes work for a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    /// Equipment maintenance tasks.
    Maintenance,
    /// Protective-equipment delivery records.
    PpeDelivery,
}

impl ConsumerKind {
    /// String form used in storage and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::PpeDelivery => "ppe_delivery",
        }
    }
}

impl std::fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived lifecycle state of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// `next_run` set, never materialized.
    PendingFirstRun,
    /// Materialized at least once and still recurring.
    ActiveRecurring,
    /// Terminal: deactivated explicitly or by a ONCE completion.
    Inactive,
}

/// A recurring schedule definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique schedule id.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Recurrence class.
    pub frequency: Frequency,
    /// Multiplier applied to the frequency's base unit (>= 1).
    pub interval_count: u32,
    /// Weekday anchor for WEEKLY/BIWEEKLY cadences.
    pub day_of_week: Option<Weekday>,
    /// Day-of-month anchor for the monthly family and ANNUAL (1-31).
    pub day_of_month: Option<u32>,
    /// Month anchor for ANNUAL (1-12).
    pub month: Option<u32>,
    /// The single occurrence date; ONCE only.
    pub specific_date: Option<NaiveDate>,
    /// Next occurrence to materialize. `None` means nothing left to fire.
    pub next_run: Option<DateTime<Utc>>,
    /// Timestamp of the last successful materialization attempt.
    pub last_run: Option<DateTime<Utc>>,
    /// Completion timestamp, maintenance-only.
    pub finished_at: Option<DateTime<Utc>>,
    /// Inactive schedules are never selected by the scanner.
    pub is_active: bool,
    /// Owning resource: equipment item or user-assignment rule.
    pub resource_id: Uuid,
    /// Opaque materialization payload. For PPE delivery it carries the
    /// dependent-resource spec (item kinds, quantities, assignees).
    pub payload: serde_json::Value,
    /// Consumer that materializes work for this schedule.
    pub consumer: ConsumerKind,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Derived lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScheduleState {
        if !self.is_active {
            ScheduleState::Inactive
        } else if self.last_run.is_none() {
            ScheduleState::PendingFirstRun
        } else {
            ScheduleState::ActiveRecurring
        }
    }

    /// Validate the frequency/anchor combination.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::Validation`] on an invalid combination.
    pub fn validate(&self) -> SchedulingResult<()> {
        if self.interval_count == 0 {
            return Err(SchedulingError::validation(
                "interval_count must be at least 1",
            ));
        }
        if self.frequency == Frequency::Once && self.specific_date.is_none() {
            return Err(SchedulingError::validation(
                "a once schedule requires specific_date",
            ));
        }
        if self.frequency != Frequency::Once && self.specific_date.is_some() {
            return Err(SchedulingError::validation(
                "specific_date is only valid for once schedules",
            ));
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(SchedulingError::validation(format!(
                    "day_of_month must be 1-31, got {day}"
                )));
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(SchedulingError::validation(format!(
                    "month must be 1-12, got {month}"
                )));
            }
        }
        Ok(())
    }

    /// Mark the schedule terminally inactive.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.next_run = None;
        self.updated_at = now;
    }
}

/// Payload for creating a schedule.
///
/// Timeline fields are owned by the engine: `next_run` is computed at
/// creation, never supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    /// Optional display name.
    pub name: Option<String>,
    /// Recurrence class.
    pub frequency: Frequency,
    /// Multiplier applied to the frequency's base unit. Defaults to 1.
    #[serde(default = "default_interval")]
    pub interval_count: u32,
    /// Weekday anchor.
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
    /// Day-of-month anchor.
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Month anchor.
    #[serde(default)]
    pub month: Option<u32>,
    /// ONCE occurrence date.
    #[serde(default)]
    pub specific_date: Option<NaiveDate>,
    /// Owning resource id.
    pub resource_id: Uuid,
    /// Opaque materialization payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Consumer kind.
    pub consumer: ConsumerKind,
}

fn default_interval() -> u32 {
    1
}
