// ==========================================
// 紧急抢占部分失败测试
// ==========================================
// 测试目标: 单条兄弟记录更新失败不回滚其他记录，失败明细随结果返回
// ==========================================

mod test_helpers;

use chrono::{DateTime, Utc};
use stand_maintenance::config::SchedulerConfig;
use stand_maintenance::domain::interval::TimeInterval;
use stand_maintenance::domain::maintenance::{MaintenanceRecord, NewMaintenanceRecord};
use stand_maintenance::domain::schedule::PreemptionAction;
use stand_maintenance::domain::types::{MaintenanceStatus, Priority};
use stand_maintenance::engine::{MaintenanceScheduler, NoOpNotificationSink, StaticResourceDirectory};
use stand_maintenance::repository::{
    InMemoryMaintenanceStore, MaintenanceRecordStore, RepositoryError, RepositoryResult,
};
use std::sync::Arc;
use test_helpers::{at, record, request};

/// 对指定记录的写操作返回乐观锁冲突，其余委托给内存存储
struct FlakyStore {
    inner: InMemoryMaintenanceStore,
    failing_id: String,
}

impl FlakyStore {
    fn conflict(&self, id: &str, expected: i32) -> RepositoryError {
        RepositoryError::OptimisticLockFailure {
            record_id: id.to_string(),
            expected,
            actual: expected + 1,
        }
    }
}

impl MaintenanceRecordStore for FlakyStore {
    fn find_overlapping(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[MaintenanceStatus],
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        self.inner
            .find_overlapping(resource_id, start, end, statuses, exclude_id)
    }

    fn update_status(
        &self,
        id: &str,
        status: MaintenanceStatus,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        if id == self.failing_id {
            return Err(self.conflict(id, expected_revision));
        }
        self.inner.update_status(id, status, expected_revision)
    }

    fn update_interval(
        &self,
        id: &str,
        interval: TimeInterval,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        if id == self.failing_id {
            return Err(self.conflict(id, expected_revision));
        }
        self.inner.update_interval(id, interval, expected_revision)
    }

    fn query_by_scope_and_range(
        &self,
        scope: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        self.inner.query_by_scope_and_range(scope, start, end)
    }

    fn create_batch(&self, records: &[NewMaintenanceRecord]) -> RepositoryResult<Vec<MaintenanceRecord>> {
        self.inner.create_batch(records)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MaintenanceRecord>> {
        self.inner.find_by_id(id)
    }
}

#[test]
fn test_partial_failure_is_reported_and_others_applied() {
    println!("\n=== 测试: 抢占部分失败 ===");

    let store = Arc::new(FlakyStore {
        inner: InMemoryMaintenanceStore::with_records(vec![
            record("M-LOW-1", "R1", Priority::Low, at(10, 9, 0), at(10, 11, 0)),
            record("M-LOW-2", "R1", Priority::Medium, at(10, 11, 0), at(10, 12, 0)),
            record("M-HIGH", "R1", Priority::High, at(10, 10, 30), at(10, 11, 30)),
        ]),
        failing_id: "M-LOW-2".to_string(),
    });

    let scheduler = MaintenanceScheduler::new(
        store.clone(),
        Arc::new(StaticResourceDirectory::placeholder()),
        Arc::new(NoOpNotificationSink),
        SchedulerConfig::default(),
    );

    let result = scheduler
        .preempt(&request("R1", Priority::Urgent, at(10, 10, 0), at(10, 12, 0)))
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].record_id, "M-LOW-2");
    assert_eq!(result.failures[0].action, PreemptionAction::Postpone);

    assert_eq!(result.preempted_record_ids, vec!["M-LOW-1".to_string()]);
    assert_eq!(result.adjusted_record_ids, vec!["M-HIGH".to_string()]);

    // 成功的更新已生效，失败的记录保持原状
    let low1 = store.find_by_id("M-LOW-1").unwrap().unwrap();
    assert_eq!(low1.status, MaintenanceStatus::Postponed);
    let low2 = store.find_by_id("M-LOW-2").unwrap().unwrap();
    assert_eq!(low2.status, MaintenanceStatus::Scheduled);
    let high = store.find_by_id("M-HIGH").unwrap().unwrap();
    assert_eq!(high.scheduled_start, at(10, 13, 0));

    println!("✓ 失败明细: {}", result.failures[0].error);
}

#[test]
fn test_cascade_shift_keeps_buffer_between_records() {
    let store = Arc::new(InMemoryMaintenanceStore::with_records(vec![
        record("H1", "R1", Priority::High, at(10, 10, 0), at(10, 11, 0)),
        record("H2", "R1", Priority::High, at(10, 11, 0), at(10, 12, 0)),
    ]));
    let scheduler = MaintenanceScheduler::new(
        store.clone(),
        Arc::new(StaticResourceDirectory::placeholder()),
        Arc::new(NoOpNotificationSink),
        SchedulerConfig::default(),
    );

    let (result, urgent) = scheduler
        .preempt_and_book(&request("R1", Priority::Urgent, at(10, 10, 0), at(10, 12, 0)))
        .unwrap();

    assert_eq!(result.adjusted_record_ids, vec!["H1".to_string(), "H2".to_string()]);
    assert!(result.follow_on_conflicts.is_empty());

    // 12:00 + 1h 缓冲 → H1 13:00~14:00，再 + 1h → H2 15:00~16:00
    let h1 = store.find_by_id("H1").unwrap().unwrap();
    let h2 = store.find_by_id("H2").unwrap().unwrap();
    assert_eq!(h1.scheduled_start, at(10, 13, 0));
    assert_eq!(h2.scheduled_start, at(10, 15, 0));

    assert_eq!(urgent.priority, Priority::Urgent);
    assert_eq!(urgent.status, MaintenanceStatus::Scheduled);
    assert!(store.find_by_id(&urgent.id).unwrap().is_some());
}
