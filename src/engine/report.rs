// ==========================================
// 机位维护排程系统 - 维护报表引擎
// ==========================================
// 职责: 按租户范围与日期区间聚合维护记录
// 输出: MaintenanceReport（数量、成本、按时率、分类统计、建议）
// 红线: 只读聚合，无写入
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::maintenance::MaintenanceRecord;
use crate::domain::report::{BreakdownEntry, CostAnalysis, MaintenanceReport, ReportSummary};
use crate::domain::types::{MaintenanceStatus, Priority};
use crate::engine::error::{SchedulingError, SchedulingResult};
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ReportGenerator - 报表引擎
// ==========================================
pub struct ReportGenerator {
    store: Arc<dyn MaintenanceRecordStore>,
    config: SchedulerConfig,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn MaintenanceRecordStore>, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// 生成维护报表
    ///
    /// # 参数
    /// - scope: 租户范围（organization_id）
    /// - start_date / end_date: 计划起点所在闭区间
    #[instrument(skip_all, fields(scope = %scope))]
    pub fn generate_report(
        &self,
        scope: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> SchedulingResult<MaintenanceReport> {
        if start_date > end_date {
            return Err(SchedulingError::InvalidInterval(format!(
                "报表起始 {} 晚于结束 {}",
                start_date.to_rfc3339(),
                end_date.to_rfc3339()
            )));
        }

        let records = self
            .store
            .query_by_scope_and_range(scope, start_date, end_date)?;

        let report = self.build_report(scope, start_date, end_date, &records);
        tracing::info!(
            total_records = report.summary.total_records,
            recommendations = report.recommendations.len(),
            "维护报表已生成"
        );
        Ok(report)
    }

    /// 基于给定记录集计算报表（不访问存储）
    pub fn build_report(
        &self,
        scope: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        records: &[MaintenanceRecord],
    ) -> MaintenanceReport {
        let summary = summarize(records);
        let by_type = breakdown(records, |r| r.maintenance_type.clone());
        let by_priority = breakdown(records, |r| r.priority.to_string());
        let cost_analysis = analyze_costs(records, &summary, &by_type);
        let recommendations = self.recommend(&summary, &cost_analysis);

        MaintenanceReport {
            scope: scope.to_string(),
            start_date,
            end_date,
            generated_at: Utc::now(),
            summary,
            by_type,
            by_priority,
            cost_analysis,
            recommendations,
        }
    }

    fn recommend(&self, summary: &ReportSummary, costs: &CostAnalysis) -> Vec<String> {
        let mut recommendations = Vec::new();

        if let Some(variance) = costs.budget_variance_pct {
            if variance > self.config.budget_variance_threshold_pct {
                recommendations.push(format!(
                    "Budget variance is {:.1}% (threshold {:.0}%): review cost estimation",
                    variance, self.config.budget_variance_threshold_pct
                ));
            }
        }

        if summary.on_time_rate_pct < self.config.on_time_rate_threshold_pct {
            recommendations.push(format!(
                "On-time completion rate is {:.1}% (threshold {:.0}%): review scheduling practices",
                summary.on_time_rate_pct, self.config.on_time_rate_threshold_pct
            ));
        }

        if summary.urgent_share_pct > self.config.urgent_share_threshold_pct {
            recommendations.push(format!(
                "URGENT maintenance accounts for {:.1}% of records (threshold {:.0}%): consider preventive maintenance",
                summary.urgent_share_pct, self.config.urgent_share_threshold_pct
            ));
        }

        recommendations
    }
}

fn is_completed(record: &MaintenanceRecord) -> bool {
    record.status == MaintenanceStatus::Completed
}

fn summarize(records: &[MaintenanceRecord]) -> ReportSummary {
    let count_status = |status: MaintenanceStatus| records.iter().filter(|r| r.status == status).count();

    let completed: Vec<&MaintenanceRecord> = records.iter().filter(|r| is_completed(r)).collect();

    let costs: Vec<f64> = completed.iter().filter_map(|r| r.actual_cost).collect();
    let total_actual_cost: f64 = costs.iter().sum();

    let durations: Vec<f64> = completed
        .iter()
        .filter_map(|r| r.actual_duration_hours())
        .collect();
    let total_actual_duration_hours: f64 = durations.iter().sum();

    // 按时率: 有实际结束时间的已完成记录中 actual_end <= scheduled_end 的比例
    let finished: Vec<&&MaintenanceRecord> = completed.iter().filter(|r| r.actual_end.is_some()).collect();
    let on_time = finished
        .iter()
        .filter(|r| r.actual_end.map_or(false, |end| end <= r.scheduled_end))
        .count();
    let on_time_rate_pct = if finished.is_empty() {
        100.0
    } else {
        on_time as f64 / finished.len() as f64 * 100.0
    };

    let urgent = records.iter().filter(|r| r.priority == Priority::Urgent).count();
    let urgent_share_pct = if records.is_empty() {
        0.0
    } else {
        urgent as f64 / records.len() as f64 * 100.0
    };

    ReportSummary {
        total_records: records.len(),
        scheduled_count: count_status(MaintenanceStatus::Scheduled),
        in_progress_count: count_status(MaintenanceStatus::InProgress),
        completed_count: completed.len(),
        cancelled_count: count_status(MaintenanceStatus::Cancelled),
        postponed_count: count_status(MaintenanceStatus::Postponed),
        total_actual_cost,
        average_actual_cost: average(total_actual_cost, costs.len()),
        total_actual_duration_hours,
        average_actual_duration_hours: average(total_actual_duration_hours, durations.len()),
        on_time_rate_pct,
        urgent_share_pct,
    }
}

fn breakdown<F>(records: &[MaintenanceRecord], key_of: F) -> BTreeMap<String, BreakdownEntry>
where
    F: Fn(&MaintenanceRecord) -> String,
{
    let mut map: BTreeMap<String, BreakdownEntry> = BTreeMap::new();
    for record in records {
        let entry = map.entry(key_of(record)).or_default();
        entry.count += 1;
        entry.estimated_cost += record.estimated_cost;
        if is_completed(record) {
            entry.completed += 1;
            entry.actual_cost += record.actual_cost.unwrap_or(0.0);
        }
    }
    map
}

/// 成本分析
///
/// 预算偏差仅统计带实际成本的已完成记录
fn analyze_costs(
    records: &[MaintenanceRecord],
    summary: &ReportSummary,
    by_type: &BTreeMap<String, BreakdownEntry>,
) -> CostAnalysis {
    let (estimated, actual) = records
        .iter()
        .filter(|r| is_completed(r))
        .filter_map(|r| r.actual_cost.map(|cost| (r.estimated_cost, cost)))
        .fold((0.0, 0.0), |(e, a), (est, act)| (e + est, a + act));

    let budget_variance_pct = (estimated > 0.0).then(|| (actual - estimated) / estimated * 100.0);
    let cost_per_hour = (summary.total_actual_duration_hours > 0.0)
        .then(|| summary.total_actual_cost / summary.total_actual_duration_hours);

    let highest_cost_type = by_type
        .iter()
        .filter(|(_, entry)| entry.actual_cost > 0.0)
        .fold(None::<(&String, f64)>, |best, (name, entry)| match best {
            Some((_, cost)) if cost >= entry.actual_cost => best,
            _ => Some((name, entry.actual_cost)),
        })
        .map(|(name, _)| name.clone());

    CostAnalysis {
        total_estimated_cost: estimated,
        total_actual_cost: actual,
        budget_variance_pct,
        cost_per_hour,
        highest_cost_type,
    }
}

fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_store::InMemoryMaintenanceStore;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, 0, 0).unwrap()
    }

    fn completed(
        id: &str,
        kind: &str,
        priority: Priority,
        estimated: f64,
        actual: f64,
        late_hours: i64,
    ) -> MaintenanceRecord {
        MaintenanceRecord {
            id: id.to_string(),
            resource_id: "S1".to_string(),
            organization_id: "ORG1".to_string(),
            scheduled_start: at(10, 8),
            scheduled_end: at(10, 10),
            actual_start: Some(at(10, 8)),
            actual_end: Some(at(10, 10) + Duration::hours(late_hours)),
            maintenance_type: kind.to_string(),
            priority,
            status: MaintenanceStatus::Completed,
            required_skills: BTreeSet::new(),
            required_equipment: BTreeSet::new(),
            estimated_cost: estimated,
            actual_cost: Some(actual),
            revision: 1,
            created_at: at(1, 0),
            updated_at: at(1, 0),
        }
    }

    fn generator(records: Vec<MaintenanceRecord>) -> ReportGenerator {
        ReportGenerator::new(
            Arc::new(InMemoryMaintenanceStore::with_records(records)),
            SchedulerConfig::default(),
        )
    }

    #[test]
    fn test_empty_report() {
        let report = generator(vec![])
            .generate_report("ORG1", at(1, 0), at(31, 0))
            .unwrap();
        assert_eq!(report.summary.total_records, 0);
        assert_eq!(report.summary.on_time_rate_pct, 100.0);
        assert!(report.cost_analysis.budget_variance_pct.is_none());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_variance_and_cost_per_hour() {
        let report = generator(vec![
            completed("A", "INSPECTION", Priority::Low, 1000.0, 1100.0, 0),
            completed("B", "REPAIR", Priority::Medium, 1000.0, 1400.0, 0),
        ])
        .generate_report("ORG1", at(1, 0), at(31, 0))
        .unwrap();

        assert_eq!(report.cost_analysis.budget_variance_pct, Some(25.0));
        assert_eq!(report.cost_analysis.cost_per_hour, Some(625.0));
        assert_eq!(report.cost_analysis.highest_cost_type.as_deref(), Some("REPAIR"));
        assert_eq!(report.summary.average_actual_duration_hours, 2.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("review cost estimation")));
    }

    #[test]
    fn test_on_time_and_urgent_share() {
        let report = generator(vec![
            completed("A", "REPAIR", Priority::Urgent, 100.0, 100.0, 1),
            completed("B", "REPAIR", Priority::Low, 100.0, 100.0, 0),
        ])
        .generate_report("ORG1", at(1, 0), at(31, 0))
        .unwrap();

        assert_eq!(report.summary.on_time_rate_pct, 50.0);
        assert_eq!(report.summary.urgent_share_pct, 50.0);
        assert_eq!(report.by_priority["URGENT"].count, 1);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("review scheduling practices")));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("consider preventive maintenance")));
    }

    #[test]
    fn test_scope_filter_and_invalid_range() {
        let mut other = completed("X", "REPAIR", Priority::Low, 100.0, 100.0, 0);
        other.organization_id = "ORG2".to_string();
        let g = generator(vec![other]);

        let report = g.generate_report("ORG1", at(1, 0), at(31, 0)).unwrap();
        assert_eq!(report.summary.total_records, 0);
        assert!(g.generate_report("ORG1", at(31, 0), at(1, 0)).is_err());
    }
}
