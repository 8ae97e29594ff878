//! Protective-equipment delivery materialization.
//!
//! A PPE schedule's payload is a [`DeliverySpec`]: item kinds and
//! quantities for a set of assignees. Each occurrence materializes one
//! delivery order per assignee whose items could be resolved to concrete,
//! size-matched stock; per-assignee resolution failures are recorded and
//! skipped so a single unmatchable assignee never blocks the rest.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::calendar::CustomPolicy;
use crate::domain::{
    Assignee, ConsumerKind, DeliverySpec, DependentItemSpec, ResolvedResource, Schedule, WorkOrder,
};
use crate::error::{SchedulingError, SchedulingResult};
use crate::scheduler::materializer::{
    MaterializationOutcome, MaterializationStrategy, ResolutionFailure,
};
use crate::scheduler::reschedule::RescheduleMode;

/// Resolves a spec line to a concrete allocatable stock item for an
/// assignee. Supplied by the surrounding application (stock levels and size
/// tables live there).
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Find a stock item matching the spec line and the assignee's size
    /// profile.
    ///
    /// # Errors
    ///
    /// [`SchedulingError::ResourceResolution`] when nothing matches; the
    /// caller records it per assignee and moves on.
    async fn resolve(
        &self,
        spec: &DependentItemSpec,
        assignee: &Assignee,
    ) -> SchedulingResult<ResolvedResource>;
}

/// PPE delivery consumer: one order per assignee, eager rescheduling.
pub struct PpeDeliveryStrategy {
    resolver: Arc<dyn ResourceResolver>,
    custom_policy: CustomPolicy,
    reschedule_mode: RescheduleMode,
}

impl std::fmt::Debug for PpeDeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PpeDeliveryStrategy")
            .field("custom_policy", &self.custom_policy)
            .field("reschedule_mode", &self.reschedule_mode)
            .finish()
    }
}

impl PpeDeliveryStrategy {
    /// Strategy with the consumer's default divergence switches.
    #[must_use]
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            resolver,
            custom_policy: CustomPolicy::Unsupported,
            reschedule_mode: RescheduleMode::Eager,
        }
    }

    /// Override the divergence switches (normally from config).
    #[must_use]
    pub fn with_policies(
        mut self,
        custom_policy: CustomPolicy,
        reschedule_mode: RescheduleMode,
    ) -> Self {
        self.custom_policy = custom_policy;
        self.reschedule_mode = reschedule_mode;
        self
    }
}

#[async_trait]
impl MaterializationStrategy for PpeDeliveryStrategy {
    fn consumer(&self) -> ConsumerKind {
        ConsumerKind::PpeDelivery
    }

    fn custom_policy(&self) -> CustomPolicy {
        self.custom_policy
    }

    fn reschedule_mode(&self) -> RescheduleMode {
        self.reschedule_mode
    }

    async fn build_work_orders(
        &self,
        schedule: &Schedule,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<MaterializationOutcome> {
        let spec: DeliverySpec = serde_json::from_value(schedule.payload.clone())
            .map_err(|err| {
                SchedulingError::validation(format!("malformed delivery spec: {err}"))
            })?;

        let mut outcome = MaterializationOutcome::default();

        for assignee in &spec.assignees {
            let mut resolved = Vec::new();
            for line in &spec.items {
                match self.resolver.resolve(line, assignee).await {
                    Ok(resource) => resolved.push(resource),
                    Err(SchedulingError::ResourceResolution { reason, .. }) => {
                        outcome.failures.push(ResolutionFailure {
                            assignee: assignee.id,
                            assignee_name: assignee.name.clone(),
                            item_kind: line.item_kind.clone(),
                            reason,
                        });
                    }
                    Err(err) => return Err(err),
                }
            }

            if resolved.is_empty() {
                continue;
            }
            let payload = serde_json::json!({
                "assignee": assignee,
                "items": resolved,
            });
            let order = WorkOrder::new(schedule.id, ConsumerKind::PpeDelivery, due_at, payload, now)
                .with_assignee(assignee.id);
            outcome.orders.push(order);
        }

        Ok(outcome)
    }
}

/// In-memory stock catalog resolver.
///
/// Matches by item kind and, when the assignee has a size profile, by size.
/// Backs tests and the embedded binary; real deployments plug in their
/// stock-level queries instead.
#[derive(Debug, Default)]
pub struct CatalogResolver {
    // (item_kind, size) -> stock item id. A None size entry matches any
    // assignee without a size profile.
    catalog: RwLock<HashMap<(String, Option<String>), Uuid>>,
}

impl CatalogResolver {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stock item for an item kind and optional size.
    pub fn add_stock(&self, item_kind: impl Into<String>, size: Option<String>, stock_item_id: Uuid) {
        self.catalog
            .write()
            .insert((item_kind.into(), size), stock_item_id);
    }
}

#[async_trait]
impl ResourceResolver for CatalogResolver {
    async fn resolve(
        &self,
        spec: &DependentItemSpec,
        assignee: &Assignee,
    ) -> SchedulingResult<ResolvedResource> {
        let catalog = self.catalog.read();
        let key = (spec.item_kind.clone(), assignee.size.clone());
        let Some(stock_item_id) = catalog.get(&key).copied() else {
            return Err(SchedulingError::ResourceResolution {
                assignee: assignee.id,
                reason: match &assignee.size {
                    Some(size) => format!("no {} in size {size}", spec.item_kind),
                    None => format!("no {} in stock", spec.item_kind),
                },
            });
        };
        Ok(ResolvedResource {
            stock_item_id,
            item_kind: spec.item_kind.clone(),
            size: assignee.size.clone(),
            quantity: spec.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ppe_schedule(spec: &DeliverySpec) -> Schedule {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Schedule {
            id: Uuid::new_v4(),
            name: Some("quarterly ppe refresh".to_string()),
            frequency: crate::domain::Frequency::Quarterly,
            interval_count: 1,
            day_of_week: None,
            day_of_month: Some(1),
            month: None,
            specific_date: None,
            next_run: Some(Utc.with_ymd_and_hms(2024, 4, 1, 13, 0, 0).unwrap()),
            last_run: None,
            finished_at: None,
            is_active: true,
            resource_id: Uuid::new_v4(),
            payload: serde_json::to_value(spec).unwrap(),
            consumer: ConsumerKind::PpeDelivery,
            created_at: now,
            updated_at: now,
        }
    }

    fn spec_with_assignees(assignees: Vec<Assignee>) -> DeliverySpec {
        DeliverySpec {
            items: vec![DependentItemSpec {
                item_kind: "gloves".to_string(),
                quantity: 2,
            }],
            assignees,
        }
    }

    #[tokio::test]
    async fn test_one_order_per_resolvable_assignee() {
        let resolver = Arc::new(CatalogResolver::new());
        resolver.add_stock("gloves", Some("M".to_string()), Uuid::new_v4());
        resolver.add_stock("gloves", Some("L".to_string()), Uuid::new_v4());

        let spec = spec_with_assignees(vec![
            Assignee {
                id: Uuid::new_v4(),
                name: "ana".to_string(),
                size: Some("M".to_string()),
            },
            Assignee {
                id: Uuid::new_v4(),
                name: "bruno".to_string(),
                size: Some("L".to_string()),
            },
        ]);
        let schedule = ppe_schedule(&spec);
        let due = schedule.next_run.unwrap();

        let strategy = PpeDeliveryStrategy::new(resolver);
        let outcome = strategy
            .build_work_orders(&schedule, due, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.orders.len(), 2);
        assert!(outcome.failures.is_empty());
        assert!(outcome.orders.iter().all(|o| o.assignee_id.is_some()));
    }

    #[tokio::test]
    async fn test_unresolvable_assignee_is_recorded_and_skipped() {
        let resolver = Arc::new(CatalogResolver::new());
        resolver.add_stock("gloves", Some("M".to_string()), Uuid::new_v4());

        let no_match = Assignee {
            id: Uuid::new_v4(),
            name: "carla".to_string(),
            size: Some("XS".to_string()),
        };
        let spec = spec_with_assignees(vec![
            Assignee {
                id: Uuid::new_v4(),
                name: "ana".to_string(),
                size: Some("M".to_string()),
            },
            no_match.clone(),
        ]);
        let schedule = ppe_schedule(&spec);
        let due = schedule.next_run.unwrap();

        let strategy = PpeDeliveryStrategy::new(resolver);
        let outcome = strategy
            .build_work_orders(&schedule, due, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.orders.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].assignee, no_match.id);
        assert!(outcome.failures[0].reason.contains("XS"));
    }

    #[tokio::test]
    async fn test_malformed_spec_is_a_validation_error() {
        let resolver = Arc::new(CatalogResolver::new());
        let mut schedule = ppe_schedule(&spec_with_assignees(Vec::new()));
        schedule.payload = serde_json::json!({"items": "not-a-list"});

        let strategy = PpeDeliveryStrategy::new(resolver);
        let err = strategy
            .build_work_orders(&schedule, schedule.next_run.unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn test_default_divergence_switches() {
        let strategy = PpeDeliveryStrategy::new(Arc::new(CatalogResolver::new()));
        assert_eq!(strategy.custom_policy(), CustomPolicy::Unsupported);
        assert_eq!(strategy.reschedule_mode(), RescheduleMode::Eager);
    }
}
