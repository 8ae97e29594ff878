//! Completion-driven rescheduling.
//!
//! When a work order is marked complete the owning schedule re-anchors to
//! the actual completion date, not the originally planned one: a monthly
//! task planned for day 10 but finished on day 15 targets day 15 from then
//! on. The anchor update and the recompute persist in the same unit of work
//! as the order's status change.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::next_occurrence;
use crate::domain::{Actor, ConsumerKind, Frequency, Schedule};
use crate::error::{SchedulingError, SchedulingResult};
use crate::events::{EventSink, ScheduleEvent};
use crate::scheduler::materializer::{MaterializeReport, StrategyRegistry, TaskMaterializer};
use crate::store::UnitOfWorkFactory;

/// What completion does about the following occurrence's work.
///
/// The two consumers diverge and both behaviors are kept as an explicit
/// per-consumer switch; see DESIGN.md before unifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleMode {
    /// Materialize the following occurrence's work immediately on completion.
    Eager,
    /// Leave creation to the next lead-time-gated scan.
    Deferred,
}

impl std::str::FromStr for RescheduleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "deferred" => Ok(Self::Deferred),
            _ => Err(format!("Unknown reschedule mode: {s}")),
        }
    }
}

/// Result of completing a work order.
#[derive(Debug, Clone)]
pub struct CompletionReport {
    /// The schedule that was re-anchored.
    pub schedule_id: Uuid,
    /// The recomputed next occurrence, if any.
    pub next_run: Option<DateTime<Utc>>,
    /// Present when the consumer runs eagerly and the following occurrence
    /// was materialized as part of this completion.
    pub eager_materialization: Option<MaterializeReport>,
}

/// Re-anchors schedules to actual completion dates.
pub struct CompletionRescheduler {
    factory: Arc<dyn UnitOfWorkFactory>,
    strategies: Arc<StrategyRegistry>,
    materializer: Arc<TaskMaterializer>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for CompletionRescheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRescheduler")
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl CompletionRescheduler {
    /// Wire the rescheduler to its collaborators.
    #[must_use]
    pub fn new(
        factory: Arc<dyn UnitOfWorkFactory>,
        strategies: Arc<StrategyRegistry>,
        materializer: Arc<TaskMaterializer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            factory,
            strategies,
            materializer,
            events,
        }
    }

    /// Mark a work order complete and re-anchor its schedule.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::NotFound`] for a missing order or schedule
    /// - [`SchedulingError::Validation`] when the order is already closed
    pub async fn complete_work_order(
        &self,
        order_id: Uuid,
        completed_at: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<CompletionReport> {
        let mut uow = self.factory.begin().await?;

        let Some(mut order) = uow.work_order_for_update(order_id).await? else {
            return Err(SchedulingError::not_found("work order", order_id));
        };
        if !order.is_open() {
            return Err(SchedulingError::validation(format!(
                "work order {order_id} is already {}",
                order.status.as_str()
            )));
        }
        order.status = crate::domain::WorkStatus::Completed;
        order.completed_at = Some(completed_at);

        let Some(mut schedule) = uow.schedule_for_update(order.schedule_id).await? else {
            return Err(SchedulingError::not_found("schedule", order.schedule_id));
        };
        let strategy = self
            .strategies
            .strategy_for(schedule.consumer)
            .ok_or_else(|| {
                SchedulingError::validation(format!(
                    "no strategy registered for consumer {}",
                    schedule.consumer
                ))
            })?;

        let expected_next_run = schedule.next_run;

        if schedule.frequency == Frequency::Once {
            // The single occurrence is done for good.
            if schedule.consumer == ConsumerKind::Maintenance {
                schedule.finished_at = Some(completed_at);
            }
            schedule.is_active = false;
            schedule.next_run = None;
        } else {
            re_anchor(&mut schedule, completed_at);
            schedule.next_run = next_occurrence(&schedule, completed_at, strategy.custom_policy());
            schedule.last_run = Some(completed_at);
        }
        schedule.updated_at = completed_at;

        uow.stage_work_order_update(order);
        uow.stage_schedule_advance(schedule.clone(), expected_next_run);
        uow.commit().await?;

        self.events.emit(&ScheduleEvent::ScheduleRescheduledOnCompletion {
            schedule_id: schedule.id,
            completed_at,
            next_run: schedule.next_run,
            actor: actor.to_string(),
        });

        tracing::debug!(
            schedule_id = %schedule.id,
            completed_at = %completed_at,
            next_run = ?schedule.next_run,
            mode = ?strategy.reschedule_mode(),
            "schedule re-anchored on completion"
        );

        let mut eager_materialization = None;
        if strategy.reschedule_mode() == RescheduleMode::Eager && schedule.is_active {
            if let Some(next) = schedule.next_run {
                // The eager path goes through the same materialize-and-advance
                // unit as the scan, keeping the at-most-once guarantee.
                match self
                    .materializer
                    .materialize(schedule.id, next, completed_at, actor)
                    .await
                {
                    Ok(report) => eager_materialization = Some(report),
                    Err(err) if err.is_conflict() => {
                        tracing::debug!(
                            schedule_id = %schedule.id,
                            "eager materialization lost a race, skipping"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(CompletionReport {
            schedule_id: schedule.id,
            next_run: schedule.next_run,
            eager_materialization,
        })
    }
}

/// Update the anchor fields to match the completion date.
fn re_anchor(schedule: &mut Schedule, completed_at: DateTime<Utc>) {
    match schedule.frequency {
        Frequency::Weekly | Frequency::Biweekly => {
            schedule.day_of_week = Some(completed_at.weekday());
        }
        Frequency::Annual => {
            schedule.month = Some(completed_at.month());
            schedule.day_of_month = Some(completed_at.day());
        }
        freq if freq.is_monthly_family() => {
            schedule.day_of_month = Some(completed_at.day());
        }
        // Daily, Custom and Once carry no calendar anchors.
        _ => {}
    }
}
