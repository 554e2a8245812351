// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: SQLite 维护记录仓储（批量创建 / 重叠查询 / 乐观锁 / 完工回填）
// ==========================================

mod test_helpers;

use stand_maintenance::domain::interval::TimeInterval;
use stand_maintenance::domain::maintenance::NewMaintenanceRecord;
use stand_maintenance::domain::types::{MaintenanceStatus, Priority};
use stand_maintenance::logging;
use stand_maintenance::repository::{
    MaintenanceRecordRepository, MaintenanceRecordStore, RepositoryError,
};
use test_helpers::{at, create_test_db, tags};

fn new_record(resource_id: &str, org: &str, start_h: u32, end_h: u32, priority: Priority) -> NewMaintenanceRecord {
    NewMaintenanceRecord {
        resource_id: resource_id.to_string(),
        organization_id: org.to_string(),
        interval: TimeInterval::new(at(10, start_h, 0), at(10, end_h, 0)).unwrap(),
        maintenance_type: "INSPECTION".to_string(),
        priority,
        required_skills: tags(&["electrical", "hvac"]),
        required_equipment: tags(&["lift"]),
        estimated_cost: 800.0,
    }
}

#[test]
fn test_create_batch_and_find_overlapping() {
    logging::init_test();
    println!("\n=== 测试: 批量创建与重叠查询 ===");

    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = MaintenanceRecordRepository::new(&db_path).unwrap();

    let created = repo
        .create_batch(&[
            new_record("R1", "ORG1", 10, 12, Priority::Low),
            new_record("R1", "ORG1", 14, 16, Priority::High),
            new_record("R2", "ORG1", 10, 12, Priority::Low),
        ])
        .unwrap();
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|r| r.status == MaintenanceStatus::Scheduled));
    assert!(created.iter().all(|r| r.revision == 0));

    // 持久化后字段完整往返
    let loaded = repo.find_by_id(&created[0].id).unwrap().unwrap();
    assert_eq!(loaded.required_skills, tags(&["electrical", "hvac"]));
    assert_eq!(loaded.scheduled_start, at(10, 10, 0));
    assert_eq!(loaded.priority, Priority::Low);

    let overlapping = repo
        .find_overlapping("R1", at(10, 11, 0), at(10, 15, 0), &MaintenanceStatus::ACTIVE, None)
        .unwrap();
    assert_eq!(overlapping.len(), 2);
    assert!(overlapping[0].scheduled_start < overlapping[1].scheduled_start);

    // 半开区间: 12:00 起点不与 [10,12) 重叠
    let adjacent = repo
        .find_overlapping("R1", at(10, 12, 0), at(10, 14, 0), &MaintenanceStatus::ACTIVE, None)
        .unwrap();
    assert!(adjacent.is_empty());

    assert!(repo.find_by_id("missing").unwrap().is_none());
    println!("✓ 批量创建与重叠查询正确");
}

#[test]
fn test_terminal_status_excluded_and_optimistic_lock() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = MaintenanceRecordRepository::new(&db_path).unwrap();
    let created = repo
        .create_batch(&[new_record("R1", "ORG1", 10, 12, Priority::Medium)])
        .unwrap();
    let id = created[0].id.clone();

    repo.update_status(&id, MaintenanceStatus::Cancelled, 0).unwrap();

    let active = repo
        .find_overlapping("R1", at(10, 9, 0), at(10, 13, 0), &MaintenanceStatus::ACTIVE, None)
        .unwrap();
    assert!(active.is_empty());

    // 旧 revision 写入被拒绝
    let stale = repo
        .update_interval(
            &id,
            TimeInterval::new(at(10, 13, 0), at(10, 15, 0)).unwrap(),
            0,
        )
        .unwrap_err();
    assert!(matches!(
        stale,
        RepositoryError::OptimisticLockFailure { expected: 0, actual: 1, .. }
    ));

    let missing = repo
        .update_status("missing", MaintenanceStatus::Postponed, 0)
        .unwrap_err();
    assert!(matches!(missing, RepositoryError::NotFound { .. }));
}

#[test]
fn test_query_by_scope_and_record_completion() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = MaintenanceRecordRepository::new(&db_path).unwrap();
    let created = repo
        .create_batch(&[
            new_record("R1", "ORG1", 10, 12, Priority::Low),
            new_record("R2", "ORG2", 10, 12, Priority::Low),
        ])
        .unwrap();

    repo.record_completion(&created[0].id, at(10, 10, 0), at(10, 12, 0), 900.0, 0)
        .unwrap();

    let scoped = repo
        .query_by_scope_and_range("ORG1", at(10, 0, 0), at(10, 23, 0))
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].status, MaintenanceStatus::Completed);
    assert_eq!(scoped[0].actual_cost, Some(900.0));
    assert_eq!(scoped[0].revision, 1);

    // 实际结束早于开始被拒绝
    let invalid = repo
        .record_completion(&created[1].id, at(10, 12, 0), at(10, 10, 0), 1.0, 0)
        .unwrap_err();
    assert!(matches!(invalid, RepositoryError::ValidationError(_)));
}

#[test]
fn test_preempt_keeps_subsecond_precision() {
    use chrono::Duration;
    use stand_maintenance::config::SchedulerConfig;
    use stand_maintenance::engine::{MaintenanceScheduler, NoOpNotificationSink, StaticResourceDirectory};
    use std::sync::Arc;
    use test_helpers::request;

    logging::init_test();
    println!("\n=== 测试: 毫秒级紧急工单抢占落库 ===");

    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = Arc::new(MaintenanceRecordRepository::new(&db_path).unwrap());

    let mut high = new_record("R1", "ORG1", 11, 13, Priority::High);
    high.interval = TimeInterval::new(at(10, 11, 30), at(10, 13, 0)).unwrap();
    let created = repo.create_batch(&[high]).unwrap();

    let scheduler = MaintenanceScheduler::new(
        repo.clone(),
        Arc::new(StaticResourceDirectory::placeholder()),
        Arc::new(NoOpNotificationSink),
        SchedulerConfig::default(),
    );

    let urgent_end = at(10, 12, 0) + Duration::milliseconds(700);
    let result = scheduler
        .preempt(&request("R1", Priority::Urgent, at(10, 10, 0), urgent_end))
        .unwrap();
    assert_eq!(result.adjusted_record_ids, vec![created[0].id.clone()]);

    let stored = repo.find_by_id(&created[0].id).unwrap().unwrap();
    assert!(stored.scheduled_start >= urgent_end + Duration::hours(1));
    assert_eq!(stored.scheduled_start, result.adjustments[0].adjusted.start());
    assert_eq!(stored.scheduled_end - stored.scheduled_start, Duration::minutes(90));
    println!("✓ 顺移后起点保留毫秒: {}", stored.scheduled_start);
}
