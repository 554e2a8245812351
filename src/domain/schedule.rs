// ==========================================
// 机位维护排程系统 - 排程派生对象
// ==========================================
// 说明: 以下对象均为每次调用即时计算的不可变值对象，不落库
// ==========================================

use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, MaintenanceScheduleRequest};
use crate::domain::types::{Availability, ConflictSeverity, ResourceType};
use serde::{Deserialize, Serialize};

// ==========================================
// SchedulingConflict - 排程冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingConflict {
    pub resource_id: String,
    pub interval: TimeInterval,
    pub conflicting_records: Vec<MaintenanceRecord>,
    /// 同批次内已选定但尚未落库的重叠占位
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tentative_labels: Vec<String>,
    pub severity: ConflictSeverity,
    pub recommendations: Vec<String>,
}

impl SchedulingConflict {
    pub fn conflicting_ids(&self) -> Vec<&str> {
        self.conflicting_records.iter().map(|r| r.id.as_str()).collect()
    }
}

// ==========================================
// SchedulingWindow - 候选时间窗
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingWindow {
    pub resource_id: String,
    pub interval: TimeInterval,
    pub available: bool,
    pub score: f64,
    pub conflicting_ids: Vec<String>,
}

// ==========================================
// ResourceAllocation - 资源分配行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub requirement: String, // 对应的技能/设备标签
    pub interval: TimeInterval,
    pub cost: f64,
    pub availability: Availability,
}

/// 未满足需求的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnmetReason {
    NoMatch,        // 目录中没有匹配且空闲的资源
    Timeout,        // 目录查询超时
    DirectoryError, // 目录查询失败
}

/// 单条资源需求的分配结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationOutcome {
    Allocated(ResourceAllocation),
    #[serde(rename_all = "camelCase")]
    Unmet {
        requirement: String,
        resource_type: ResourceType,
        reason: UnmetReason,
    },
}

impl AllocationOutcome {
    pub fn availability(&self) -> Availability {
        match self {
            AllocationOutcome::Allocated(a) => a.availability,
            AllocationOutcome::Unmet { .. } => Availability::Unavailable,
        }
    }
}

// ==========================================
// AllocationPlan - 一次分配的完整结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub outcomes: Vec<AllocationOutcome>,
}

impl AllocationPlan {
    /// 已满足的分配
    pub fn allocations(&self) -> Vec<&ResourceAllocation> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                AllocationOutcome::Allocated(a) => Some(a),
                AllocationOutcome::Unmet { .. } => None,
            })
            .collect()
    }

    /// 未满足的需求标签
    pub fn unmet_requirements(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                AllocationOutcome::Unmet { requirement, resource_type, reason } => {
                    Some(format!("{}:{} ({:?})", resource_type, requirement, reason))
                }
                AllocationOutcome::Allocated(_) => None,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, AllocationOutcome::Allocated(_)))
    }

    pub fn total_cost(&self) -> f64 {
        self.allocations().iter().map(|a| a.cost).sum()
    }
}

// ==========================================
// OptimizedSchedule - 单个请求的排程决策
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedSchedule {
    pub request: MaintenanceScheduleRequest,
    pub interval: TimeInterval,
    pub priority_weight: u8,
    pub score: f64,
    pub allocation: AllocationPlan,
    pub conflicts: Option<SchedulingConflict>,
    pub alternatives: Vec<SchedulingWindow>,
}

/// 请求无法排程的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnscheduledReason {
    NoWindowAvailable,
    InvalidInterval(String),
}

/// 批量排程的单项结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleOutcome {
    Scheduled(OptimizedSchedule),
    #[serde(rename_all = "camelCase")]
    Unscheduled {
        request: MaintenanceScheduleRequest,
        reason: UnscheduledReason,
    },
}

impl ScheduleOutcome {
    pub fn request(&self) -> &MaintenanceScheduleRequest {
        match self {
            ScheduleOutcome::Scheduled(s) => &s.request,
            ScheduleOutcome::Unscheduled { request, .. } => request,
        }
    }

    pub fn as_scheduled(&self) -> Option<&OptimizedSchedule> {
        match self {
            ScheduleOutcome::Scheduled(s) => Some(s),
            ScheduleOutcome::Unscheduled { .. } => None,
        }
    }
}

// ==========================================
// PreemptionResult - 紧急抢占结果
// ==========================================

/// 抢占中对兄弟记录执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreemptionAction {
    Postpone,
    Reschedule,
}

/// 单条兄弟记录更新失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreemptionFailure {
    pub record_id: String,
    pub action: PreemptionAction,
    pub error: String,
}

/// 被顺移记录的新区间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustedRecord {
    pub record_id: String,
    pub previous: TimeInterval,
    pub adjusted: TimeInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreemptionResult {
    pub scheduled_time: TimeInterval,
    pub preempted_record_ids: Vec<String>,
    pub adjusted_record_ids: Vec<String>,
    pub adjustments: Vec<AdjustedRecord>,
    pub failures: Vec<PreemptionFailure>,
    /// 顺移后新区间上的后续冲突（仅提示，不再级联处理）
    pub follow_on_conflicts: Vec<SchedulingConflict>,
}

impl PreemptionResult {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
