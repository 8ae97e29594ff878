//! Toolroom scheduling core.
//!
//! The recurring-schedule computation and task-materialization engine of an
//! inventory/HR administration backend. One parameterized core drives two
//! consumers — equipment maintenance and protective-equipment (PPE)
//! delivery — through four cooperating pieces:
//!
//! - [`calendar`]: pure next-occurrence math across all recurrence classes
//! - [`scheduler`]: lead-time gating, the daily scan, atomic
//!   materialize-and-advance, and completion-driven re-anchoring
//! - [`consumers`]: what an occurrence turns into, per consumer
//! - [`store`]: the repository and unit-of-work traits the core writes
//!   through; real storage is the surrounding application's business
//!
//! # Guarantees
//!
//! - Each occurrence materializes at most once, even when a manual trigger
//!   races the daily scan: the work-order creation and the timeline advance
//!   commit in one atomic unit, guarded on the `next_run` value the
//!   due-check observed.
//! - Completion re-anchors future occurrences to the actual completion
//!   date, not the originally planned one.
//! - A failure on one schedule (or one assignee) never blocks the rest of
//!   the pass; everything aggregates into the returned scan summary.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolroom_api::consumers::MaintenanceStrategy;
//! use toolroom_api::domain::{Actor, ConsumerKind, Frequency, ScheduleDraft};
//! use toolroom_api::events::TracingEventSink;
//! use toolroom_api::scheduler::{SchedulerService, StrategyRegistry};
//! use toolroom_api::store::memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut registry = StrategyRegistry::new();
//! registry.register(Arc::new(MaintenanceStrategy::default()));
//!
//! let service = SchedulerService::new(
//!     store.clone(),
//!     store.clone(),
//!     store,
//!     Arc::new(registry),
//!     Arc::new(TracingEventSink),
//! );
//!
//! // service.create_schedule(...), service.process_due_schedules(...)
//! ```

pub mod calendar;
pub mod config;
pub mod consumers;
pub mod domain;
pub mod error;
pub mod events;
pub mod logging;
pub mod scheduler;
pub mod store;

pub use calendar::{next_occurrence, CustomPolicy, CANONICAL_HOUR};
pub use domain::{Actor, ConsumerKind, Frequency, Schedule, ScheduleDraft, WorkOrder};
pub use error::{SchedulingError, SchedulingResult};
pub use scheduler::{RescheduleMode, ScanSummary, SchedulerService};
