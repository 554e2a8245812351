// ==========================================
// 机位维护排程系统 - 维护报表模型
// ==========================================
// 用途: Report Generator 输出格式（只读聚合，不落库）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// MaintenanceReport - 维护报表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub scope: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,

    // ===== 数量统计 =====
    pub summary: ReportSummary,

    // ===== 分类统计 =====
    pub by_type: BTreeMap<String, BreakdownEntry>,
    pub by_priority: BTreeMap<String, BreakdownEntry>,

    // ===== 成本分析 =====
    pub cost_analysis: CostAnalysis,

    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_records: usize,
    pub scheduled_count: usize,
    pub in_progress_count: usize,
    pub completed_count: usize,
    pub cancelled_count: usize,
    pub postponed_count: usize,
    pub total_actual_cost: f64,
    pub average_actual_cost: f64,
    pub total_actual_duration_hours: f64,
    pub average_actual_duration_hours: f64,
    /// 按时完成率 (%)，无已完成记录时为 100
    pub on_time_rate_pct: f64,
    /// 紧急工单占比 (%)
    pub urgent_share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub count: usize,
    pub completed: usize,
    pub estimated_cost: f64,
    pub actual_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAnalysis {
    /// 参与偏差计算的预算（有实际成本的已完成记录）
    pub total_estimated_cost: f64,
    pub total_actual_cost: f64,
    /// (实际 - 预算) / 预算 × 100；预算为 0 时为 None
    pub budget_variance_pct: Option<f64>,
    /// 实际成本 / 实际工时；工时为 0 时为 None
    pub cost_per_hour: Option<f64>,
    pub highest_cost_type: Option<String>,
}
