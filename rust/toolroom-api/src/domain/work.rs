//! Materialized work orders.
//!
//! A work order is the concrete downstream record for one occurrence of a
//! schedule: a maintenance task for an equipment item, or one PPE delivery
//! per assignee.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schedule::ConsumerKind;

/// Work order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Created, waiting to be carried out.
    Open,
    /// Carried out; completion feeds back into the owning schedule.
    Completed,
    /// Withdrawn without completion.
    Cancelled,
}

impl WorkStatus {
    /// String form used in storage and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A materialized work item for one occurrence of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Unique work order id.
    pub id: Uuid,
    /// Originating schedule.
    pub schedule_id: Uuid,
    /// Consumer that produced this order.
    pub consumer: ConsumerKind,
    /// Target assignee for PPE deliveries; `None` for maintenance tasks.
    pub assignee_id: Option<Uuid>,
    /// The occurrence date this order was materialized for.
    pub due_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: WorkStatus,
    /// Consumer-specific payload (resolved stock items, task description).
    pub payload: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkOrder {
    /// Create an open work order for one occurrence.
    #[must_use]
    pub fn new(
        schedule_id: Uuid,
        consumer: ConsumerKind,
        due_at: DateTime<Utc>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            consumer,
            assignee_id: None,
            due_at,
            status: WorkStatus::Open,
            payload,
            created_at,
            completed_at: None,
        }
    }

    /// Attach the target assignee (PPE deliveries).
    #[must_use]
    pub fn with_assignee(mut self, assignee_id: Uuid) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    /// True while the order still awaits completion.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == WorkStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_order_is_open() {
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        let order = WorkOrder::new(
            Uuid::new_v4(),
            ConsumerKind::Maintenance,
            due,
            serde_json::Value::Null,
            Utc::now(),
        );
        assert!(order.is_open());
        assert!(order.assignee_id.is_none());
        assert_eq!(order.due_at, due);
    }

    #[test]
    fn test_with_assignee() {
        let assignee = Uuid::new_v4();
        let order = WorkOrder::new(
            Uuid::new_v4(),
            ConsumerKind::PpeDelivery,
            Utc::now(),
            serde_json::Value::Null,
            Utc::now(),
        )
        .with_assignee(assignee);
        assert_eq!(order.assignee_id, Some(assignee));
    }
}
