//! Scheduling events emitted toward the surrounding application.
//!
//! The core emits events at the three points external systems care about;
//! recording or auditing them is the sink's business, not the core's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ConsumerKind;

/// A scheduling lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleEvent {
    /// Work orders were created for a due occurrence.
    ScheduleMaterialized {
        /// Owning schedule.
        schedule_id: Uuid,
        /// Consumer that produced the work.
        consumer: ConsumerKind,
        /// The occurrence the orders were created for.
        occurrence: DateTime<Utc>,
        /// How many orders were created.
        orders_created: usize,
        /// Per-assignee resolution failures recorded during the batch.
        failures: usize,
        /// Who triggered the materialization.
        actor: String,
    },

    /// A schedule advanced its timeline but produced no eligible work.
    ScheduleAdvancedNoWork {
        /// Owning schedule.
        schedule_id: Uuid,
        /// The occurrence that yielded nothing.
        occurrence: DateTime<Utc>,
        /// Who triggered the pass.
        actor: String,
    },

    /// A completed work order re-anchored its schedule.
    ScheduleRescheduledOnCompletion {
        /// Owning schedule.
        schedule_id: Uuid,
        /// The actual completion date the schedule re-anchored to.
        completed_at: DateTime<Utc>,
        /// The recomputed next occurrence, if any.
        next_run: Option<DateTime<Utc>>,
        /// Who completed the work.
        actor: String,
    },
}

/// Receives scheduling events. Implementations must be cheap; the core
/// calls the sink inline.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: &ScheduleEvent);
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ScheduleEvent) {
        match event {
            ScheduleEvent::ScheduleMaterialized {
                schedule_id,
                consumer,
                occurrence,
                orders_created,
                failures,
                actor,
            } => {
                tracing::info!(
                    schedule_id = %schedule_id,
                    consumer = %consumer,
                    occurrence = %occurrence,
                    orders_created,
                    failures,
                    actor = %actor,
                    "schedule materialized"
                );
            }
            ScheduleEvent::ScheduleAdvancedNoWork {
                schedule_id,
                occurrence,
                actor,
            } => {
                tracing::warn!(
                    schedule_id = %schedule_id,
                    occurrence = %occurrence,
                    actor = %actor,
                    "schedule advanced with no eligible work"
                );
            }
            ScheduleEvent::ScheduleRescheduledOnCompletion {
                schedule_id,
                completed_at,
                next_run,
                actor,
            } => {
                tracing::info!(
                    schedule_id = %schedule_id,
                    completed_at = %completed_at,
                    next_run = ?next_run,
                    actor = %actor,
                    "schedule rescheduled on completion"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ScheduleEvent::ScheduleAdvancedNoWork {
            schedule_id: Uuid::new_v4(),
            occurrence: Utc::now(),
            actor: "system:scheduler".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "schedule_advanced_no_work");
    }
}
