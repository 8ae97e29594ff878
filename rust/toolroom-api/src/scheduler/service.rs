//! The scheduling facade the surrounding application calls.
//!
//! Owns schedule creation/update (with synchronous validation and the
//! initial `next_run` computation), the daily `process_due_schedules` entry
//! point, the manual `execute_schedule_now` path, and work-order completion.
//! Manual and automatic triggers share the exact same
//! materialize-and-advance path and state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::calendar::{at_canonical_hour, next_occurrence};
use crate::domain::{Actor, Frequency, Schedule, ScheduleDraft, WorkOrder};
use crate::error::{SchedulingError, SchedulingResult};
use crate::events::EventSink;
use crate::scheduler::materializer::{MaterializeReport, StrategyRegistry, TaskMaterializer};
use crate::scheduler::reschedule::{CompletionRescheduler, CompletionReport};
use crate::scheduler::scanner::{DueScheduleScanner, ScanSummary};
use crate::store::{ScheduleRepository, UnitOfWorkFactory, WorkOrderRepository};

/// How many scan summaries the service keeps for inspection.
const SCAN_HISTORY_LIMIT: usize = 30;

/// Partial update for an existing schedule.
///
/// `None` fields are left untouched. Recurrence changes recompute
/// `next_run` from the update time.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ScheduleUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New interval multiplier.
    pub interval_count: Option<u32>,
    /// New weekday anchor.
    pub day_of_week: Option<chrono::Weekday>,
    /// New day-of-month anchor.
    pub day_of_month: Option<u32>,
    /// New month anchor.
    pub month: Option<u32>,
    /// New materialization payload.
    pub payload: Option<serde_json::Value>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

impl ScheduleUpdate {
    fn changes_recurrence(&self) -> bool {
        self.interval_count.is_some()
            || self.day_of_week.is_some()
            || self.day_of_month.is_some()
            || self.month.is_some()
    }
}

/// Scheduling service facade.
pub struct SchedulerService {
    schedules: Arc<dyn ScheduleRepository>,
    orders: Arc<dyn WorkOrderRepository>,
    strategies: Arc<StrategyRegistry>,
    scanner: DueScheduleScanner,
    materializer: Arc<TaskMaterializer>,
    rescheduler: CompletionRescheduler,
    scan_history: RwLock<Vec<ScanSummary>>,
}

impl std::fmt::Debug for SchedulerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerService")
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl SchedulerService {
    /// Wire the service over its storage and consumer strategies.
    #[must_use]
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        orders: Arc<dyn WorkOrderRepository>,
        factory: Arc<dyn UnitOfWorkFactory>,
        strategies: Arc<StrategyRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let materializer = Arc::new(TaskMaterializer::new(
            Arc::clone(&factory),
            Arc::clone(&strategies),
            Arc::clone(&events),
        ));
        let scanner = DueScheduleScanner::new(Arc::clone(&schedules), Arc::clone(&materializer));
        let rescheduler = CompletionRescheduler::new(
            factory,
            Arc::clone(&strategies),
            Arc::clone(&materializer),
            events,
        );
        Self {
            schedules,
            orders,
            strategies,
            scanner,
            materializer,
            rescheduler,
            scan_history: RwLock::new(Vec::new()),
        }
    }

    // ── Schedule lifecycle ─────────────────────────────────────────────

    /// Create a schedule, computing `next_run` immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::Validation`] synchronously for invalid
    /// frequency/anchor combinations, or for a CUSTOM schedule whose
    /// consumer treats CUSTOM as unsupported (it could never fire).
    pub async fn create_schedule(
        &self,
        draft: ScheduleDraft,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<Schedule> {
        let mut schedule = Schedule {
            id: Uuid::new_v4(),
            name: draft.name,
            frequency: draft.frequency,
            interval_count: draft.interval_count,
            day_of_week: draft.day_of_week,
            day_of_month: draft.day_of_month,
            month: draft.month,
            specific_date: draft.specific_date,
            next_run: None,
            last_run: None,
            finished_at: None,
            is_active: true,
            resource_id: draft.resource_id,
            payload: draft.payload,
            consumer: draft.consumer,
            created_at: now,
            updated_at: now,
        };
        schedule.validate()?;

        schedule.next_run = self.initial_next_run(&schedule, now)?;

        self.schedules.insert_schedule(&schedule).await?;
        tracing::info!(
            schedule_id = %schedule.id,
            frequency = %schedule.frequency,
            consumer = %schedule.consumer,
            next_run = ?schedule.next_run,
            actor = %actor,
            "schedule created"
        );
        Ok(schedule)
    }

    /// Apply a partial update, revalidating and recomputing `next_run` when
    /// recurrence inputs changed.
    pub async fn update_schedule(
        &self,
        id: Uuid,
        update: ScheduleUpdate,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<Schedule> {
        let Some(mut schedule) = self.schedules.get_schedule(id).await? else {
            return Err(SchedulingError::not_found("schedule", id));
        };

        let recurrence_changed = update.changes_recurrence();
        if let Some(name) = update.name {
            schedule.name = Some(name);
        }
        if let Some(interval) = update.interval_count {
            schedule.interval_count = interval;
        }
        if let Some(day) = update.day_of_week {
            schedule.day_of_week = Some(day);
        }
        if let Some(day) = update.day_of_month {
            schedule.day_of_month = Some(day);
        }
        if let Some(month) = update.month {
            schedule.month = Some(month);
        }
        if let Some(payload) = update.payload {
            schedule.payload = payload;
        }
        if let Some(is_active) = update.is_active {
            schedule.is_active = is_active;
            if !is_active {
                schedule.next_run = None;
            }
        }
        schedule.validate()?;

        if recurrence_changed && schedule.is_active {
            schedule.next_run = self.initial_next_run(&schedule, now)?;
        }
        schedule.updated_at = now;

        self.schedules.update_schedule(&schedule).await?;
        tracing::info!(
            schedule_id = %schedule.id,
            next_run = ?schedule.next_run,
            actor = %actor,
            "schedule updated"
        );
        Ok(schedule)
    }

    /// Explicitly deactivate a schedule. Terminal until reactivated by an
    /// update.
    pub async fn deactivate_schedule(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<Schedule> {
        let Some(mut schedule) = self.schedules.get_schedule(id).await? else {
            return Err(SchedulingError::not_found("schedule", id));
        };
        schedule.deactivate(now);
        self.schedules.update_schedule(&schedule).await?;
        tracing::info!(schedule_id = %schedule.id, actor = %actor, "schedule deactivated");
        Ok(schedule)
    }

    /// Fetch a schedule.
    pub async fn get_schedule(&self, id: Uuid) -> SchedulingResult<Option<Schedule>> {
        self.schedules.get_schedule(id).await
    }

    /// List every schedule.
    pub async fn list_schedules(&self) -> SchedulingResult<Vec<Schedule>> {
        self.schedules.list_schedules().await
    }

    /// Work orders materialized for a schedule.
    pub async fn orders_for_schedule(&self, schedule_id: Uuid) -> SchedulingResult<Vec<WorkOrder>> {
        self.orders.orders_for_schedule(schedule_id).await
    }

    // ── Triggers ───────────────────────────────────────────────────────

    /// The daily entry point: scan and materialize everything due.
    pub async fn process_due_schedules(&self, now: DateTime<Utc>, actor: &Actor) -> ScanSummary {
        let summary = self.scanner.run_pass(now, actor).await;
        let mut history = self.scan_history.write().await;
        history.push(summary.clone());
        if history.len() > SCAN_HISTORY_LIMIT {
            let excess = history.len() - SCAN_HISTORY_LIMIT;
            history.drain(..excess);
        }
        summary
    }

    /// Manually materialize one schedule right now, bypassing the lead-time
    /// gate but sharing the scan's materialize-and-advance path.
    ///
    /// Returns `None` when a concurrent run advanced the schedule first —
    /// the occurrence was already handled, which is not an error.
    pub async fn execute_schedule_now(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<Option<MaterializeReport>> {
        let Some(schedule) = self.schedules.get_schedule(id).await? else {
            return Err(SchedulingError::not_found("schedule", id));
        };
        if !schedule.is_active {
            return Err(SchedulingError::validation(format!(
                "schedule {id} is inactive"
            )));
        }
        let Some(observed) = schedule.next_run else {
            return Err(SchedulingError::validation(format!(
                "schedule {id} has no next occurrence"
            )));
        };

        match self.materializer.materialize(id, observed, now, actor).await {
            Ok(report) => Ok(Some(report)),
            Err(err) if err.is_conflict() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Mark a work order complete; re-anchors the owning schedule.
    pub async fn complete_work_order(
        &self,
        order_id: Uuid,
        completed_at: DateTime<Utc>,
        actor: &Actor,
    ) -> SchedulingResult<CompletionReport> {
        self.rescheduler
            .complete_work_order(order_id, completed_at, actor)
            .await
    }

    /// Recent scan summaries, oldest first.
    pub async fn recent_scan_summaries(&self) -> Vec<ScanSummary> {
        self.scan_history.read().await.clone()
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Initial `next_run` for a newly created or recurrence-edited schedule.
    fn initial_next_run(
        &self,
        schedule: &Schedule,
        now: DateTime<Utc>,
    ) -> SchedulingResult<Option<DateTime<Utc>>> {
        if schedule.frequency == Frequency::Once {
            // Fixed at creation, never recomputed afterwards.
            let date = schedule
                .specific_date
                .ok_or_else(|| SchedulingError::validation("a once schedule requires specific_date"))?;
            let at_midnight = date
                .and_hms_opt(0, 0, 0)
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                .ok_or_else(|| SchedulingError::validation("invalid specific_date"))?;
            return Ok(Some(at_canonical_hour(at_midnight)));
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
        let next = next_occurrence(schedule, now, strategy.custom_policy());
        if next.is_none() {
            return Err(SchedulingError::validation(format!(
                "frequency {} is not supported for consumer {}",
                schedule.frequency, schedule.consumer
            )));
        }
        Ok(next)
    }
}
