//! The schedule scanning and materialization engine.
//!
//! One parameterized core drives both consumers (maintenance, PPE delivery);
//! each consumer plugs in a [`MaterializationStrategy`] rather than keeping
//! its own copy of the calendar and scan logic.
//!
//! - [`lead_time`]: when, ahead of the due date, work creation should begin
//! - [`scanner`]: the daily two-phase sweep over active schedules
//! - [`materializer`]: atomic create-work-and-advance for one occurrence
//! - [`reschedule`]: completion-driven re-anchoring
//! - [`service`]: the facade the surrounding application calls

pub mod lead_time;
pub mod materializer;
pub mod reschedule;
pub mod scanner;
pub mod service;

pub use lead_time::{is_due_for_materialization, lead_time_days, MAX_LEAD_DAYS};
pub use materializer::{
    MaterializationOutcome, MaterializationStrategy, MaterializeReport, ResolutionFailure,
    StrategyRegistry, TaskMaterializer,
};
pub use reschedule::{CompletionRescheduler, CompletionReport, RescheduleMode};
pub use scanner::{DueScheduleScanner, ScanError, ScanSummary};
pub use service::SchedulerService;
