//! Core domain models for the scheduling engine.
//!
//! - [`schedule`]: recurring schedule definitions and their state machine
//! - [`work`]: materialized work orders (maintenance tasks, PPE deliveries)
//! - [`assignment`]: PPE delivery specs and assignee resolution types
//! - [`actor`]: the principal performing a mutating operation

pub mod actor;
pub mod assignment;
pub mod schedule;
pub mod work;

pub use actor::{Actor, ActorKind};
pub use assignment::{Assignee, DeliverySpec, DependentItemSpec, ResolvedResource};
pub use schedule::{ConsumerKind, Frequency, Schedule, ScheduleDraft, ScheduleState};
pub use work::{WorkOrder, WorkStatus};
