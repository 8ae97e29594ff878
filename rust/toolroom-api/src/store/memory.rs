//! In-memory store backing tests and the embedded binary.
//!
//! State lives behind a single `tokio::sync::RwLock`; a unit of work stages
//! writes and applies them under one write-lock acquisition, which gives the
//! same commit atomicity a database transaction would.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Schedule, WorkOrder};
use crate::error::{SchedulingError, SchedulingResult};
use crate::store::{
    ScheduleRepository, UnitOfWork, UnitOfWorkFactory, WorkOrderRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    schedules: HashMap<Uuid, Schedule>,
    work_orders: HashMap<Uuid, WorkOrder>,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored work orders (test helper).
    pub async fn work_order_count(&self) -> usize {
        self.state.read().await.work_orders.len()
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> SchedulingResult<()> {
        let mut state = self.state.write().await;
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: Uuid) -> SchedulingResult<Option<Schedule>> {
        Ok(self.state.read().await.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self) -> SchedulingResult<Vec<Schedule>> {
        Ok(self.state.read().await.schedules.values().cloned().collect())
    }

    async fn due_within(&self, horizon: DateTime<Utc>) -> SchedulingResult<Vec<Schedule>> {
        let state = self.state.read().await;
        let mut due: Vec<Schedule> = state
            .schedules
            .values()
            .filter(|s| s.is_active && s.next_run.is_some_and(|next| next <= horizon))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_run);
        Ok(due)
    }

    async fn update_schedule(&self, schedule: &Schedule) -> SchedulingResult<()> {
        let mut state = self.state.write().await;
        if !state.schedules.contains_key(&schedule.id) {
            return Err(SchedulingError::not_found("schedule", schedule.id));
        }
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }
}

#[async_trait]
impl WorkOrderRepository for MemoryStore {
    async fn get_work_order(&self, id: Uuid) -> SchedulingResult<Option<WorkOrder>> {
        Ok(self.state.read().await.work_orders.get(&id).cloned())
    }

    async fn orders_for_schedule(&self, schedule_id: Uuid) -> SchedulingResult<Vec<WorkOrder>> {
        let state = self.state.read().await;
        let mut orders: Vec<WorkOrder> = state
            .work_orders
            .values()
            .filter(|o| o.schedule_id == schedule_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.due_at, o.created_at));
        Ok(orders)
    }
}

/// Staged writes for one atomic boundary.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    state: Arc<RwLock<MemoryState>>,
    new_orders: Vec<WorkOrder>,
    updated_orders: Vec<WorkOrder>,
    schedule_advance: Option<(Schedule, Option<DateTime<Utc>>)>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn schedule_for_update(&mut self, id: Uuid) -> SchedulingResult<Option<Schedule>> {
        Ok(self.state.read().await.schedules.get(&id).cloned())
    }

    async fn work_order_for_update(&mut self, id: Uuid) -> SchedulingResult<Option<WorkOrder>> {
        Ok(self.state.read().await.work_orders.get(&id).cloned())
    }

    fn stage_work_order(&mut self, order: WorkOrder) {
        self.new_orders.push(order);
    }

    fn stage_work_order_update(&mut self, order: WorkOrder) {
        self.updated_orders.push(order);
    }

    fn stage_schedule_advance(
        &mut self,
        schedule: Schedule,
        expected_next_run: Option<DateTime<Utc>>,
    ) {
        self.schedule_advance = Some((schedule, expected_next_run));
    }

    async fn commit(self: Box<Self>) -> SchedulingResult<()> {
        let mut state = self.state.write().await;

        // The guard and all writes happen under one write-lock acquisition.
        if let Some((schedule, expected)) = &self.schedule_advance {
            let persisted = state
                .schedules
                .get(&schedule.id)
                .ok_or_else(|| SchedulingError::not_found("schedule", schedule.id))?;
            if persisted.next_run != *expected {
                return Err(SchedulingError::ConcurrencyConflict {
                    schedule_id: schedule.id,
                });
            }
        }

        if let Some((schedule, _)) = self.schedule_advance {
            state.schedules.insert(schedule.id, schedule);
        }
        for order in self.new_orders {
            state.work_orders.insert(order.id, order);
        }
        for order in self.updated_orders {
            state.work_orders.insert(order.id, order);
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> SchedulingResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            state: Arc::clone(&self.state),
            new_orders: Vec::new(),
            updated_orders: Vec::new(),
            schedule_advance: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConsumerKind, Frequency};
    use chrono::TimeZone;

    fn sample_schedule(next_run: DateTime<Utc>) -> Schedule {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Schedule {
            id: Uuid::new_v4(),
            name: Some("compressor check".to_string()),
            frequency: Frequency::Monthly,
            interval_count: 1,
            day_of_week: None,
            day_of_month: Some(10),
            month: None,
            specific_date: None,
            next_run: Some(next_run),
            last_run: None,
            finished_at: None,
            is_active: true,
            resource_id: Uuid::new_v4(),
            payload: serde_json::Value::Null,
            consumer: ConsumerKind::Maintenance,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_due_within_filters_inactive_and_far_future() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap();

        let due = sample_schedule(now + chrono::Duration::days(3));
        store.insert_schedule(&due).await.unwrap();

        let far = sample_schedule(now + chrono::Duration::days(30));
        store.insert_schedule(&far).await.unwrap();

        let mut inactive = sample_schedule(now);
        inactive.is_active = false;
        store.insert_schedule(&inactive).await.unwrap();

        let candidates = store
            .due_within(now + chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, due.id);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes_atomically() {
        let store = MemoryStore::new();
        let next = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        let schedule = sample_schedule(next);
        store.insert_schedule(&schedule).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let mut advanced = uow
            .schedule_for_update(schedule.id)
            .await
            .unwrap()
            .unwrap();
        advanced.last_run = Some(next);
        advanced.next_run = Some(next + chrono::Duration::days(31));
        uow.stage_work_order(WorkOrder::new(
            schedule.id,
            ConsumerKind::Maintenance,
            next,
            serde_json::Value::Null,
            Utc::now(),
        ));
        uow.stage_schedule_advance(advanced, Some(next));
        uow.commit().await.unwrap();

        assert_eq!(store.work_order_count().await, 1);
        let stored = store.get_schedule(schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.last_run, Some(next));
    }

    #[tokio::test]
    async fn test_stale_guard_rejects_concurrent_advance() {
        let store = MemoryStore::new();
        let next = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        let schedule = sample_schedule(next);
        store.insert_schedule(&schedule).await.unwrap();

        // Two units observe the same state; the first commit wins.
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let mut advanced = first
            .schedule_for_update(schedule.id)
            .await
            .unwrap()
            .unwrap();
        advanced.next_run = Some(next + chrono::Duration::days(31));
        first.stage_schedule_advance(advanced.clone(), Some(next));
        first.commit().await.unwrap();

        second.stage_schedule_advance(advanced, Some(next));
        let err = second.commit().await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_staged_writes() {
        let store = MemoryStore::new();
        let schedule = sample_schedule(Utc::now());
        store.insert_schedule(&schedule).await.unwrap();

        {
            let mut uow = store.begin().await.unwrap();
            uow.stage_work_order(WorkOrder::new(
                schedule.id,
                ConsumerKind::Maintenance,
                Utc::now(),
                serde_json::Value::Null,
                Utc::now(),
            ));
            // Dropped without commit.
        }

        assert_eq!(store.work_order_count().await, 0);
    }
}
