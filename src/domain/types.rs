// ==========================================
// 机位维护排程系统 - 领域类型定义
// ==========================================
// 职责: 优先级、维护状态、冲突严重度、资源类型等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库/HTTP 层一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 维护优先级 (Priority)
// ==========================================
// 顺序: Low < Medium < High < Urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,    // 低
    Medium, // 中
    High,   // 高
    Urgent, // 紧急
}

impl Priority {
    /// 优先级权重（批量排程排序用）
    pub fn weight(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// 是否可被紧急工单直接挤出（LOW / MEDIUM）
    pub fn is_bumpable(&self) -> bool {
        matches!(self, Priority::Low | Priority::Medium)
    }

    /// 从字符串解析优先级（大小写不敏感）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            "URGENT" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Urgent => write!(f, "URGENT"),
        }
    }
}

// ==========================================
// 维护状态 (Maintenance Status)
// ==========================================
// 红线: 记录只做状态流转，不做物理删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Scheduled,  // 已排程
    InProgress, // 执行中
    Completed,  // 已完成
    Cancelled,  // 已取消
    Postponed,  // 已顺延（被紧急工单挤出，待重新排程）
}

impl MaintenanceStatus {
    /// 参与冲突判定的状态集合
    pub const ACTIVE: [MaintenanceStatus; 2] =
        [MaintenanceStatus::Scheduled, MaintenanceStatus::InProgress];

    /// 是否仍占用机位时段
    pub fn is_active(&self) -> bool {
        matches!(self, MaintenanceStatus::Scheduled | MaintenanceStatus::InProgress)
    }

    /// 从字符串解析状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Some(MaintenanceStatus::Scheduled),
            "IN_PROGRESS" => Some(MaintenanceStatus::InProgress),
            "COMPLETED" => Some(MaintenanceStatus::Completed),
            "CANCELLED" => Some(MaintenanceStatus::Cancelled),
            "POSTPONED" => Some(MaintenanceStatus::Postponed),
            _ => None,
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceStatus::Scheduled => write!(f, "SCHEDULED"),
            MaintenanceStatus::InProgress => write!(f, "IN_PROGRESS"),
            MaintenanceStatus::Completed => write!(f, "COMPLETED"),
            MaintenanceStatus::Cancelled => write!(f, "CANCELLED"),
            MaintenanceStatus::Postponed => write!(f, "POSTPONED"),
        }
    }
}

// ==========================================
// 冲突严重度 (Conflict Severity)
// ==========================================
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictSeverity::Low => write!(f, "LOW"),
            ConflictSeverity::Medium => write!(f, "MEDIUM"),
            ConflictSeverity::High => write!(f, "HIGH"),
            ConflictSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 资源类型 (Resource Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Technician, // 技术人员
    Equipment,  // 设备
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Technician => write!(f, "TECHNICIAN"),
            ResourceType::Equipment => write!(f, "EQUIPMENT"),
        }
    }
}

// ==========================================
// 资源可用性 (Availability)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,   // 全时段可用
    Partial,     // 部分时段可用
    Unavailable, // 不可用
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "AVAILABLE"),
            Availability::Partial => write!(f, "PARTIAL"),
            Availability::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}
