//! Equipment maintenance materialization.
//!
//! One work order per occurrence, carrying the schedule's payload through
//! opaquely (task description, checklists — their contents are the
//! surrounding application's business).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::calendar::CustomPolicy;
use crate::domain::{ConsumerKind, Schedule, WorkOrder};
use crate::error::SchedulingResult;
use crate::scheduler::materializer::{MaterializationOutcome, MaterializationStrategy};
use crate::scheduler::reschedule::RescheduleMode;

/// Maintenance consumer: one task per occurrence, deferred rescheduling.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceStrategy {
    custom_policy: CustomPolicy,
    reschedule_mode: RescheduleMode,
}

impl Default for MaintenanceStrategy {
    fn default() -> Self {
        Self {
            custom_policy: CustomPolicy::DaysInterval,
            reschedule_mode: RescheduleMode::Deferred,
        }
    }
}

impl MaintenanceStrategy {
    /// Strategy with explicit divergence switches (normally from config).
    #[must_use]
    pub fn new(custom_policy: CustomPolicy, reschedule_mode: RescheduleMode) -> Self {
        Self {
            custom_policy,
            reschedule_mode,
        }
    }
}

#[async_trait]
impl MaterializationStrategy for MaintenanceStrategy {
    fn consumer(&self) -> ConsumerKind {
        ConsumerKind::Maintenance
    }

    fn custom_policy(&self) -> CustomPolicy {
        self.custom_policy
    }

    fn reschedule_mode(&self) -> RescheduleMode {
        self.reschedule_mode
    }

    async fn build_work_orders(
        &self,
        schedule: &Schedule,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<MaterializationOutcome> {
        let order = WorkOrder::new(
            schedule.id,
            ConsumerKind::Maintenance,
            due_at,
            schedule.payload.clone(),
            now,
        );
        Ok(MaterializationOutcome {
            orders: vec![order],
            failures: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_one_order_per_occurrence() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            name: Some("belt inspection".to_string()),
            frequency: crate::domain::Frequency::Monthly,
            interval_count: 1,
            day_of_week: None,
            day_of_month: Some(10),
            month: None,
            specific_date: None,
            next_run: Some(due),
            last_run: None,
            finished_at: None,
            is_active: true,
            resource_id: Uuid::new_v4(),
            payload: serde_json::json!({"checklist": ["belt", "bearings"]}),
            consumer: ConsumerKind::Maintenance,
            created_at: now,
            updated_at: now,
        };

        let outcome = MaintenanceStrategy::default()
            .build_work_orders(&schedule, due, now)
            .await
            .unwrap();

        assert_eq!(outcome.orders.len(), 1);
        assert!(outcome.failures.is_empty());
        let order = &outcome.orders[0];
        assert_eq!(order.schedule_id, schedule.id);
        assert_eq!(order.due_at, due);
        assert_eq!(order.payload, schedule.payload);
        assert!(order.assignee_id.is_none());
    }

    #[test]
    fn test_default_divergence_switches() {
        let strategy = MaintenanceStrategy::default();
        assert_eq!(strategy.custom_policy(), CustomPolicy::DaysInterval);
        assert_eq!(strategy.reschedule_mode(), RescheduleMode::Deferred);
    }
}
