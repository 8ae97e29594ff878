//! Storage abstractions consumed by the scheduling core.
//!
//! The core never talks to a database directly. It reads through the
//! repository traits and writes through a [`UnitOfWork`]: an explicit atomic
//! boundary scoped to one materialize-and-advance (or one completion
//! reschedule), committed or rolled back on every exit path. The surrounding
//! application supplies real implementations; [`memory::MemoryStore`] backs
//! tests and the embedded binary.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Schedule, WorkOrder};
use crate::error::SchedulingResult;

/// Read/write access to schedule records.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Insert a new schedule.
    async fn insert_schedule(&self, schedule: &Schedule) -> SchedulingResult<()>;

    /// Fetch a schedule by id.
    async fn get_schedule(&self, id: Uuid) -> SchedulingResult<Option<Schedule>>;

    /// List every schedule.
    async fn list_schedules(&self) -> SchedulingResult<Vec<Schedule>>;

    /// Coarse scan phase: active schedules with `next_run <= horizon`.
    ///
    /// This is the cheap, index-friendly predicate; the precise per-schedule
    /// lead-time check happens in the scanner.
    async fn due_within(&self, horizon: DateTime<Utc>) -> SchedulingResult<Vec<Schedule>>;

    /// Overwrite an existing schedule outside a unit of work (create/update
    /// paths; the materialize-and-advance path goes through [`UnitOfWork`]).
    async fn update_schedule(&self, schedule: &Schedule) -> SchedulingResult<()>;
}

/// Read/write access to materialized work orders.
#[async_trait]
pub trait WorkOrderRepository: Send + Sync {
    /// Fetch a work order by id.
    async fn get_work_order(&self, id: Uuid) -> SchedulingResult<Option<WorkOrder>>;

    /// All orders materialized for a schedule.
    async fn orders_for_schedule(&self, schedule_id: Uuid) -> SchedulingResult<Vec<WorkOrder>>;
}

/// One atomic materialize-and-advance (or completion) boundary.
///
/// Writes are staged and applied together on [`commit`](Self::commit);
/// dropping an uncommitted unit discards them. The schedule advance is
/// guarded: commit fails with a concurrency conflict when the persisted
/// `next_run` no longer matches the value the due-check observed.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Re-read a schedule inside this boundary.
    async fn schedule_for_update(&mut self, id: Uuid) -> SchedulingResult<Option<Schedule>>;

    /// Re-read a work order inside this boundary.
    async fn work_order_for_update(&mut self, id: Uuid) -> SchedulingResult<Option<WorkOrder>>;

    /// Stage a new work order.
    fn stage_work_order(&mut self, order: WorkOrder);

    /// Stage a work order update.
    fn stage_work_order_update(&mut self, order: WorkOrder);

    /// Stage a schedule write guarded on the currently persisted `next_run`.
    ///
    /// At commit time the persisted value must still equal
    /// `expected_next_run`, otherwise the whole unit fails with
    /// [`crate::error::SchedulingError::ConcurrencyConflict`] and no write is
    /// applied.
    fn stage_schedule_advance(&mut self, schedule: Schedule, expected_next_run: Option<DateTime<Utc>>);

    /// Apply all staged writes atomically.
    async fn commit(self: Box<Self>) -> SchedulingResult<()>;
}

/// Factory handing out unit-of-work boundaries.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// Open a new atomic boundary.
    async fn begin(&self) -> SchedulingResult<Box<dyn UnitOfWork>>;
}
