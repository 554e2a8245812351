// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use stand_maintenance::domain::maintenance::{MaintenanceRecord, MaintenanceScheduleRequest};
use stand_maintenance::domain::types::{MaintenanceStatus, Priority};
use stand_maintenance::engine::events::{MaintenanceEvent, NotificationSink};
use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    stand_maintenance::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试基准日: 2026-03-10（周二）
pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

/// 构造一条已存在的维护记录
pub fn record(
    id: &str,
    resource_id: &str,
    priority: Priority,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> MaintenanceRecord {
    MaintenanceRecord {
        id: id.to_string(),
        resource_id: resource_id.to_string(),
        organization_id: "ORG1".to_string(),
        scheduled_start: start,
        scheduled_end: end,
        actual_start: None,
        actual_end: None,
        maintenance_type: "INSPECTION".to_string(),
        priority,
        status: MaintenanceStatus::Scheduled,
        required_skills: BTreeSet::new(),
        required_equipment: BTreeSet::new(),
        estimated_cost: 1000.0,
        actual_cost: None,
        revision: 0,
        created_at: start,
        updated_at: start,
    }
}

/// 构造排程请求
pub fn request(
    resource_id: &str,
    priority: Priority,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> MaintenanceScheduleRequest {
    MaintenanceScheduleRequest {
        reference: None,
        resource_id: resource_id.to_string(),
        organization_id: "ORG1".to_string(),
        maintenance_type: "INSPECTION".to_string(),
        priority,
        scheduled_start: start,
        scheduled_end: end,
        required_skills: BTreeSet::new(),
        required_equipment: BTreeSet::new(),
        estimated_cost: 1000.0,
        constraints: None,
    }
}

pub fn tags(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 记录全部事件的通知发送者
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MaintenanceEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MaintenanceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, event: MaintenanceEvent) {
        self.events.lock().unwrap().push(event);
    }
}
