// ==========================================
// 机位维护排程系统 - 内存维护记录存储
// ==========================================
// 用途: 嵌入式调用方/单元测试使用的 MaintenanceRecordStore 实现
// 语义: 与 MaintenanceRecordRepository 保持一致（含 revision 乐观锁）
// ==========================================

use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenanceRecord};
use crate::domain::types::MaintenanceStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// 内存维护记录存储
#[derive(Default)]
pub struct InMemoryMaintenanceStore {
    records: Mutex<BTreeMap<String, MaintenanceRecord>>,
}

impl InMemoryMaintenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以现成记录初始化
    pub fn with_records(records: Vec<MaintenanceRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// 直接写入一条记录（覆盖同ID）
    pub fn insert(&self, record: MaintenanceRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.insert(record.id.clone(), record);
        }
    }

    /// 当前全部记录快照
    pub fn snapshot(&self) -> Vec<MaintenanceRecord> {
        self.records
            .lock()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default()
    }

    fn guard(&self) -> RepositoryResult<MutexGuard<'_, BTreeMap<String, MaintenanceRecord>>> {
        self.records
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn checked_mut<'a>(
        guard: &'a mut BTreeMap<String, MaintenanceRecord>,
        id: &str,
        expected_revision: i32,
    ) -> RepositoryResult<&'a mut MaintenanceRecord> {
        let record = guard.get_mut(id).ok_or_else(|| RepositoryError::NotFound {
            entity: "MaintenanceRecord".to_string(),
            id: id.to_string(),
        })?;
        if record.revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                record_id: id.to_string(),
                expected: expected_revision,
                actual: record.revision,
            });
        }
        Ok(record)
    }
}

impl MaintenanceRecordStore for InMemoryMaintenanceStore {
    fn find_overlapping(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[MaintenanceStatus],
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let guard = self.guard()?;
        let mut found: Vec<MaintenanceRecord> = guard
            .values()
            .filter(|r| r.resource_id == resource_id)
            .filter(|r| statuses.contains(&r.status))
            .filter(|r| exclude_id.map_or(true, |ex| r.id != ex))
            .filter(|r| r.scheduled_start < end && r.scheduled_end > start)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    fn update_status(
        &self,
        id: &str,
        status: MaintenanceStatus,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let mut guard = self.guard()?;
        let record = Self::checked_mut(&mut guard, id, expected_revision)?;
        record.status = status;
        record.revision += 1;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn update_interval(
        &self,
        id: &str,
        interval: TimeInterval,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let mut guard = self.guard()?;
        let record = Self::checked_mut(&mut guard, id, expected_revision)?;
        record.scheduled_start = interval.start();
        record.scheduled_end = interval.end();
        record.revision += 1;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn query_by_scope_and_range(
        &self,
        scope: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let guard = self.guard()?;
        let mut found: Vec<MaintenanceRecord> = guard
            .values()
            .filter(|r| r.organization_id == scope)
            .filter(|r| r.scheduled_start >= start && r.scheduled_start <= end)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    fn create_batch(&self, records: &[NewMaintenanceRecord]) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let mut guard = self.guard()?;
        let now = Utc::now();
        let created: Vec<MaintenanceRecord> = records
            .iter()
            .map(|new_record| MaintenanceRecord {
                id: Uuid::new_v4().to_string(),
                resource_id: new_record.resource_id.clone(),
                organization_id: new_record.organization_id.clone(),
                scheduled_start: new_record.interval.start(),
                scheduled_end: new_record.interval.end(),
                actual_start: None,
                actual_end: None,
                maintenance_type: new_record.maintenance_type.clone(),
                priority: new_record.priority,
                status: MaintenanceStatus::Scheduled,
                required_skills: new_record.required_skills.clone(),
                required_equipment: new_record.required_equipment.clone(),
                estimated_cost: new_record.estimated_cost,
                actual_cost: None,
                revision: 0,
                created_at: now,
                updated_at: now,
            })
            .collect();

        for record in &created {
            guard.insert(record.id.clone(), record.clone());
        }
        Ok(created)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MaintenanceRecord>> {
        Ok(self.guard()?.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Priority;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap()
    }

    fn new_record(resource: &str, sh: u32, eh: u32) -> NewMaintenanceRecord {
        NewMaintenanceRecord {
            resource_id: resource.to_string(),
            organization_id: "ORG1".to_string(),
            interval: TimeInterval::new(at(sh), at(eh)).unwrap(),
            maintenance_type: "INSPECTION".to_string(),
            priority: Priority::Low,
            required_skills: BTreeSet::new(),
            required_equipment: BTreeSet::new(),
            estimated_cost: 100.0,
        }
    }

    #[test]
    fn test_create_and_find_overlapping() {
        let store = InMemoryMaintenanceStore::new();
        let created = store
            .create_batch(&[new_record("S1", 10, 12), new_record("S2", 10, 12)])
            .unwrap();
        assert_eq!(created.len(), 2);

        let found = store
            .find_overlapping("S1", at(11), at(13), &MaintenanceStatus::ACTIVE, None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].resource_id, "S1");

        let excluded = store
            .find_overlapping("S1", at(11), at(13), &MaintenanceStatus::ACTIVE, Some(&found[0].id))
            .unwrap();
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_optimistic_lock() {
        let store = InMemoryMaintenanceStore::new();
        let created = store.create_batch(&[new_record("S1", 10, 12)]).unwrap();
        let id = created[0].id.clone();

        store.update_status(&id, MaintenanceStatus::Postponed, 0).unwrap();
        let err = store
            .update_status(&id, MaintenanceStatus::Cancelled, 0)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { actual: 1, .. }));

        let missing = store
            .update_status("nope", MaintenanceStatus::Cancelled, 0)
            .unwrap_err();
        assert!(matches!(missing, RepositoryError::NotFound { .. }));
    }
}
