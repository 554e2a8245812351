// ==========================================
// 机位维护排程系统 - 冲突检测引擎
// ==========================================
// 职责: 判定候选区间与资源上已有活动记录的重叠
// 输入: resource_id + [start, end) + 可选排除ID
// 输出: SchedulingConflict（含严重度与建议）或 None
// 红线: 只读，不修改任何记录
// ==========================================

use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::MaintenanceRecord;
use crate::domain::schedule::SchedulingConflict;
use crate::domain::types::{ConflictSeverity, MaintenanceStatus, Priority};
use crate::engine::error::SchedulingResult;
use crate::engine::window_search::TentativeReservation;
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ConflictDetector - 冲突检测引擎
// ==========================================
pub struct ConflictDetector {
    store: Arc<dyn MaintenanceRecordStore>,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn MaintenanceRecordStore>) -> Self {
        Self { store }
    }

    /// 检测候选区间上的冲突
    ///
    /// # 参数
    /// - exclude_id: 更新已有记录时排除其自身
    ///
    /// # 返回
    /// - `Ok(None)`: 无重叠
    /// - `Err(InvalidInterval)`: start >= end
    #[instrument(skip_all, fields(resource_id = %resource_id))]
    pub fn detect_conflicts(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> SchedulingResult<Option<SchedulingConflict>> {
        let interval = TimeInterval::new(start, end)?;
        self.detect_with_reservations(resource_id, interval, exclude_id, &[])
    }

    /// 检测冲突，同时计入批次内尚未落库的占位
    pub fn detect_with_reservations(
        &self,
        resource_id: &str,
        interval: TimeInterval,
        exclude_id: Option<&str>,
        reservations: &[TentativeReservation],
    ) -> SchedulingResult<Option<SchedulingConflict>> {
        let overlapping = self.store.find_overlapping(
            resource_id,
            interval.start(),
            interval.end(),
            &MaintenanceStatus::ACTIVE,
            exclude_id,
        )?;
        let pending: Vec<&TentativeReservation> = reservations
            .iter()
            .filter(|r| r.interval.overlaps(&interval))
            .collect();

        if overlapping.is_empty() && pending.is_empty() {
            return Ok(None);
        }

        let severity = severity_for(
            overlapping
                .iter()
                .map(|r| r.priority)
                .chain(pending.iter().map(|r| r.priority)),
        );
        let mut recommendations = build_recommendations(&overlapping);
        if !pending.is_empty() {
            recommendations.push(format!(
                "{} placement(s) earlier in this batch overlap this slot; choose a different time slot",
                pending.len()
            ));
        }

        tracing::debug!(
            conflict_count = overlapping.len(),
            tentative_count = pending.len(),
            severity = %severity,
            "检测到排程冲突"
        );

        Ok(Some(SchedulingConflict {
            resource_id: resource_id.to_string(),
            interval,
            conflicting_records: overlapping,
            tentative_labels: pending.iter().map(|r| r.label.clone()).collect(),
            severity,
            recommendations,
        }))
    }
}

/// 冲突严重度（先匹配先返回）
///
/// 1. 存在 HIGH/URGENT 记录 → CRITICAL
/// 2. 冲突数 > 2 → HIGH
/// 3. 冲突数 > 1 → MEDIUM
/// 4. 其余 → LOW
pub fn classify_severity(conflicting: &[MaintenanceRecord]) -> ConflictSeverity {
    severity_for(conflicting.iter().map(|r| r.priority))
}

fn severity_for(priorities: impl IntoIterator<Item = Priority>) -> ConflictSeverity {
    let priorities: Vec<Priority> = priorities.into_iter().collect();
    if priorities
        .iter()
        .any(|p| matches!(p, Priority::High | Priority::Urgent))
    {
        ConflictSeverity::Critical
    } else if priorities.len() > 2 {
        ConflictSeverity::High
    } else if priorities.len() > 1 {
        ConflictSeverity::Medium
    } else {
        ConflictSeverity::Low
    }
}

/// 冲突处理建议
pub fn build_recommendations(conflicting: &[MaintenanceRecord]) -> Vec<String> {
    match conflicting {
        [] => Vec::new(),
        [single] if single.priority == Priority::Low => vec![format!(
            "Reschedule the conflicting LOW priority maintenance {} ({})",
            single.id, single.maintenance_type
        )],
        [single] => vec![format!(
            "Schedule around the existing {} priority maintenance {} ending at {}",
            single.priority,
            single.id,
            single.scheduled_end.to_rfc3339()
        )],
        many => vec![format!(
            "{} maintenance records overlap this slot; choose a different time slot",
            many.len()
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_store::InMemoryMaintenanceStore;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap()
    }

    fn record(id: &str, sh: u32, eh: u32, priority: Priority, status: MaintenanceStatus) -> MaintenanceRecord {
        MaintenanceRecord {
            id: id.to_string(),
            resource_id: "S1".to_string(),
            organization_id: "ORG1".to_string(),
            scheduled_start: at(sh),
            scheduled_end: at(eh),
            actual_start: None,
            actual_end: None,
            maintenance_type: "INSPECTION".to_string(),
            priority,
            status,
            required_skills: BTreeSet::new(),
            required_equipment: BTreeSet::new(),
            estimated_cost: 0.0,
            actual_cost: None,
            revision: 0,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn detector(records: Vec<MaintenanceRecord>) -> ConflictDetector {
        ConflictDetector::new(Arc::new(InMemoryMaintenanceStore::with_records(records)))
    }

    #[test]
    fn test_no_conflict_returns_none() {
        let d = detector(vec![record("A", 10, 12, Priority::Low, MaintenanceStatus::Scheduled)]);
        assert!(d.detect_conflicts("S1", at(12), at(14), None).unwrap().is_none());
        assert!(d.detect_conflicts("S2", at(10), at(12), None).unwrap().is_none());
    }

    #[test]
    fn test_terminal_statuses_ignored() {
        let d = detector(vec![
            record("A", 10, 12, Priority::Low, MaintenanceStatus::Completed),
            record("B", 10, 12, Priority::Low, MaintenanceStatus::Cancelled),
            record("C", 10, 12, Priority::Low, MaintenanceStatus::Postponed),
        ]);
        assert!(d.detect_conflicts("S1", at(9), at(13), None).unwrap().is_none());
    }

    #[test]
    fn test_single_low_conflict() {
        let d = detector(vec![record("A", 10, 12, Priority::Low, MaintenanceStatus::InProgress)]);
        let conflict = d.detect_conflicts("S1", at(11), at(13), None).unwrap().unwrap();
        assert_eq!(conflict.severity, ConflictSeverity::Low);
        assert_eq!(conflict.conflicting_ids(), vec!["A"]);
        assert!(conflict.recommendations[0].starts_with("Reschedule"));
    }

    #[test]
    fn test_severity_ladder() {
        let low = record("A", 10, 12, Priority::Low, MaintenanceStatus::Scheduled);
        let medium = record("B", 10, 12, Priority::Medium, MaintenanceStatus::Scheduled);
        let medium2 = record("C", 10, 12, Priority::Medium, MaintenanceStatus::Scheduled);
        let high = record("D", 10, 12, Priority::High, MaintenanceStatus::Scheduled);

        assert_eq!(classify_severity(&[low.clone()]), ConflictSeverity::Low);
        assert_eq!(classify_severity(&[low.clone(), medium.clone()]), ConflictSeverity::Medium);
        assert_eq!(
            classify_severity(&[low.clone(), medium.clone(), medium2]),
            ConflictSeverity::High
        );
        assert_eq!(classify_severity(&[high.clone()]), ConflictSeverity::Critical);
        assert_eq!(classify_severity(&[low, high]), ConflictSeverity::Critical);
    }

    #[test]
    fn test_reservations_are_reported() {
        let d = detector(vec![record("A", 8, 9, Priority::Low, MaintenanceStatus::Scheduled)]);
        let placed = TentativeReservation {
            label: "urgent-1".to_string(),
            priority: Priority::Urgent,
            interval: TimeInterval::new(at(10), at(12)).unwrap(),
        };
        let interval = TimeInterval::new(at(11), at(13)).unwrap();

        let conflict = d
            .detect_with_reservations("S1", interval, None, &[placed.clone()])
            .unwrap()
            .unwrap();
        assert!(conflict.conflicting_records.is_empty());
        assert_eq!(conflict.tentative_labels, vec!["urgent-1".to_string()]);
        assert_eq!(conflict.severity, ConflictSeverity::Critical);
        assert_eq!(conflict.recommendations.len(), 1);

        let clear = TimeInterval::new(at(12), at(14)).unwrap();
        assert!(d
            .detect_with_reservations("S1", clear, None, &[placed])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_exclude_self_and_invalid_interval() {
        let d = detector(vec![record("A", 10, 12, Priority::High, MaintenanceStatus::Scheduled)]);
        assert!(d.detect_conflicts("S1", at(10), at(12), Some("A")).unwrap().is_none());
        assert!(d.detect_conflicts("S1", at(12), at(10), None).is_err());
    }
}
