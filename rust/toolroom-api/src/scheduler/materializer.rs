//! Atomic materialize-and-advance for one due occurrence.
//!
//! The work-order creation and the `last_run`/`next_run` advance happen in
//! the same unit of work: they succeed or fail together. Advancing
//! `next_run` past the current occurrence inside that unit is what makes
//! repeated scans idempotent — a second pass no longer observes the
//! occurrence as due.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{next_occurrence, CustomPolicy};
use crate::domain::{Actor, ConsumerKind, Frequency, Schedule, WorkOrder};
use crate::error::{SchedulingError, SchedulingResult};
use crate::events::{EventSink, ScheduleEvent};
use crate::scheduler::reschedule::RescheduleMode;
use crate::store::UnitOfWorkFactory;

/// A per-assignee resolution failure recorded during a batch.
///
/// Non-fatal: the rest of the batch proceeds and the schedule still
/// advances, so one unfixable assignee cannot block everyone else's cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionFailure {
    /// Assignee the resolution was attempted for.
    pub assignee: Uuid,
    /// Display name for logs.
    pub assignee_name: String,
    /// Item kind that could not be resolved.
    pub item_kind: String,
    /// Why resolution failed.
    pub reason: String,
}

/// What a strategy produced for one occurrence.
#[derive(Debug, Default)]
pub struct MaterializationOutcome {
    /// Work orders to create.
    pub orders: Vec<WorkOrder>,
    /// Per-assignee failures recorded along the way.
    pub failures: Vec<ResolutionFailure>,
}

/// Consumer-specific materialization behavior.
///
/// The engine owns the calendar math, gating, atomicity and idempotence;
/// a strategy only decides what work an occurrence turns into and which of
/// the two divergence switches its consumer runs with.
#[async_trait]
pub trait MaterializationStrategy: Send + Sync {
    /// Consumer this strategy serves.
    fn consumer(&self) -> ConsumerKind;

    /// How CUSTOM frequencies are interpreted for this consumer.
    fn custom_policy(&self) -> CustomPolicy;

    /// Whether completion eagerly materializes the following occurrence.
    fn reschedule_mode(&self) -> RescheduleMode;

    /// Build the work orders for one due occurrence.
    ///
    /// Resolution failures are reported inside the outcome, not as `Err`;
    /// an `Err` aborts this schedule's materialization entirely.
    async fn build_work_orders(
        &self,
        schedule: &Schedule,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<MaterializationOutcome>;
}

/// Strategy lookup by consumer kind.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ConsumerKind, Arc<dyn MaterializationStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("consumers", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StrategyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under its consumer kind.
    pub fn register(&mut self, strategy: Arc<dyn MaterializationStrategy>) {
        self.strategies.insert(strategy.consumer(), strategy);
    }

    /// Strategy for a consumer, if registered.
    #[must_use]
    pub fn strategy_for(&self, consumer: ConsumerKind) -> Option<Arc<dyn MaterializationStrategy>> {
        self.strategies.get(&consumer).map(Arc::clone)
    }
}

/// Result of one materialize-and-advance.
#[derive(Debug, Clone)]
pub struct MaterializeReport {
    /// Schedule that was advanced.
    pub schedule_id: Uuid,
    /// The occurrence the work was created for.
    pub occurrence: DateTime<Utc>,
    /// Orders created in this unit.
    pub orders_created: usize,
    /// Recorded per-assignee failures.
    pub failures: Vec<ResolutionFailure>,
    /// The schedule's recomputed next occurrence.
    pub next_run: Option<DateTime<Utc>>,
}

/// Creates downstream work for due occurrences and advances the timeline.
pub struct TaskMaterializer {
    factory: Arc<dyn UnitOfWorkFactory>,
    strategies: Arc<StrategyRegistry>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for TaskMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMaterializer")
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl TaskMaterializer {
    /// Wire the materializer to its collaborators.
    #[must_use]
    pub fn new(
        factory: Arc<dyn UnitOfWorkFactory>,
        strategies: Arc<StrategyRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            factory,
            strategies,
            events,
        }
    }

    /// Materialize the occurrence at `observed_next_run` and advance the
    /// schedule, atomically.
    ///
    /// `observed_next_run` is the value the caller's due-check saw. The
    /// schedule is re-read inside the unit of work and the advance is
    /// guarded on that value, so an attempt racing a concurrent run fails
    /// with [`SchedulingError::ConcurrencyConflict`] instead of creating
    /// duplicate work.
    pub async fn materialize(
        &self,
        schedule_id: Uuid,
        observed_next_run: DateTime<Utc>,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<MaterializeReport> {
        let mut uow = self.factory.begin().await?;

        let Some(mut schedule) = uow.schedule_for_update(schedule_id).await? else {
            return Err(SchedulingError::not_found("schedule", schedule_id));
        };
        if !schedule.is_active {
            return Err(SchedulingError::ConcurrencyConflict { schedule_id });
        }
        let Some(due_at) = schedule.next_run else {
            return Err(SchedulingError::ConcurrencyConflict { schedule_id });
        };
        if due_at != observed_next_run {
            return Err(SchedulingError::ConcurrencyConflict { schedule_id });
        }

        let strategy = self
            .strategies
            .strategy_for(schedule.consumer)
            .ok_or_else(|| {
                SchedulingError::validation(format!(
                    "no strategy registered for consumer {}",
                    schedule.consumer
                ))
            })?;

        let outcome = strategy.build_work_orders(&schedule, due_at, now).await?;

        for failure in &outcome.failures {
            tracing::warn!(
                schedule_id = %schedule.id,
                assignee = %failure.assignee,
                assignee_name = %failure.assignee_name,
                item_kind = %failure.item_kind,
                reason = %failure.reason,
                "skipping assignee, no matching resource"
            );
        }

        // Advance the timeline in the same unit as the creations.
        schedule.last_run = Some(due_at);
        schedule.updated_at = now;
        if schedule.frequency == Frequency::Once {
            schedule.is_active = false;
            schedule.next_run = None;
        } else {
            schedule.next_run = next_occurrence(&schedule, due_at, strategy.custom_policy());
            if schedule.next_run.is_none() {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    frequency = %schedule.frequency,
                    "no next occurrence computable, schedule will not fire again"
                );
            }
        }

        for order in &outcome.orders {
            uow.stage_work_order(order.clone());
        }
        uow.stage_schedule_advance(schedule.clone(), Some(observed_next_run));
        uow.commit().await?;

        let report = MaterializeReport {
            schedule_id: schedule.id,
            occurrence: due_at,
            orders_created: outcome.orders.len(),
            failures: outcome.failures,
            next_run: schedule.next_run,
        };

        if report.orders_created == 0 {
            self.events.emit(&ScheduleEvent::ScheduleAdvancedNoWork {
                schedule_id: schedule.id,
                occurrence: due_at,
                actor: actor.to_string(),
            });
        } else {
            self.events.emit(&ScheduleEvent::ScheduleMaterialized {
                schedule_id: schedule.id,
                consumer: schedule.consumer,
                occurrence: due_at,
                orders_created: report.orders_created,
                failures: report.failures.len(),
                actor: actor.to_string(),
            });
        }

        tracing::debug!(
            schedule_id = %schedule.id,
            occurrence = %due_at,
            orders_created = report.orders_created,
            next_run = ?schedule.next_run,
            "schedule advanced"
        );

        Ok(report)
    }
}
