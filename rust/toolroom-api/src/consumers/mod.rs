//! Consumer-specific materialization strategies.
//!
//! Both consumers share the scheduling core; only what an occurrence turns
//! into differs. Each strategy also fixes its consumer's side of the two
//! preserved divergences (CUSTOM interpretation, eager vs. deferred
//! completion) — see DESIGN.md.

pub mod maintenance;
pub mod ppe;

pub use maintenance::MaintenanceStrategy;
pub use ppe::{CatalogResolver, PpeDeliveryStrategy, ResourceResolver};
