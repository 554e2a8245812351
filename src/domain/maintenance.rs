// ==========================================
// 机位维护排程系统 - 维护记录领域模型
// ==========================================
// 职责: 维护记录实体、排程请求、排程约束
// 红线: 不含数据访问逻辑，不含引擎逻辑
// ==========================================

use crate::domain::interval::{InvalidIntervalError, TimeInterval};
use crate::domain::types::{MaintenanceStatus, Priority};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ==========================================
// MaintenanceRecord - 维护记录（持久化实体）
// ==========================================
// 对齐: maintenance_record 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    // ===== 标识 =====
    pub id: String,              // 记录ID (存储层分配)
    pub resource_id: String,     // 机位/资产ID
    pub organization_id: String, // 租户范围 (不解释，仅透传)

    // ===== 时间 =====
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,

    // ===== 分类 =====
    pub maintenance_type: String,
    pub priority: Priority,
    pub status: MaintenanceStatus,

    // ===== 资源需求 =====
    pub required_skills: BTreeSet<String>,
    pub required_equipment: BTreeSet<String>,

    // ===== 成本 =====
    pub estimated_cost: f64,
    pub actual_cost: Option<f64>,

    // ===== 并发控制 =====
    pub revision: i32, // 乐观锁版本号，每次更新 +1

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceRecord {
    /// 计划时长
    pub fn scheduled_duration(&self) -> Duration {
        self.scheduled_end - self.scheduled_start
    }

    /// 计划区间
    pub fn scheduled_interval(&self) -> Result<TimeInterval, InvalidIntervalError> {
        TimeInterval::new(self.scheduled_start, self.scheduled_end)
    }

    /// 是否与给定区间重叠
    pub fn overlaps(&self, interval: &TimeInterval) -> bool {
        interval.overlaps_range(self.scheduled_start, self.scheduled_end)
    }

    /// 实际作业时长（小时），仅当实际起止均存在时返回
    pub fn actual_duration_hours(&self) -> Option<f64> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) if end > start => {
                Some((end - start).num_seconds() as f64 / 3600.0)
            }
            _ => None,
        }
    }
}

// ==========================================
// NewMaintenanceRecord - 待创建记录
// ==========================================
// id / revision / 时间戳由存储层分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceRecord {
    pub resource_id: String,
    pub organization_id: String,
    pub interval: TimeInterval,
    pub maintenance_type: String,
    pub priority: Priority,
    pub required_skills: BTreeSet<String>,
    pub required_equipment: BTreeSet<String>,
    pub estimated_cost: f64,
}

// ==========================================
// MaintenanceScheduleRequest - 排程请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceScheduleRequest {
    /// 调用方自带的请求引用（用于回显/批次内标识），可空
    #[serde(default)]
    pub reference: Option<String>,
    pub resource_id: String,
    pub organization_id: String,
    pub maintenance_type: String,
    pub priority: Priority,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    #[serde(default)]
    pub required_equipment: BTreeSet<String>,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub constraints: Option<SchedulingConstraints>,
}

impl MaintenanceScheduleRequest {
    /// 请求的原始区间
    pub fn requested_interval(&self) -> Result<TimeInterval, InvalidIntervalError> {
        TimeInterval::new(self.scheduled_start, self.scheduled_end)
    }

    /// 请求时长
    pub fn duration(&self) -> Duration {
        self.scheduled_end - self.scheduled_start
    }

    /// 用于日志/批次内占位的标识
    pub fn label(&self) -> String {
        match &self.reference {
            Some(r) if !r.trim().is_empty() => r.clone(),
            _ => format!("{}@{}", self.resource_id, self.scheduled_start.to_rfc3339()),
        }
    }

    /// 以选定区间生成待创建记录
    pub fn to_new_record(&self, interval: TimeInterval) -> NewMaintenanceRecord {
        NewMaintenanceRecord {
            resource_id: self.resource_id.clone(),
            organization_id: self.organization_id.clone(),
            interval,
            maintenance_type: self.maintenance_type.clone(),
            priority: self.priority,
            required_skills: self.required_skills.clone(),
            required_equipment: self.required_equipment.clone(),
            estimated_cost: self.estimated_cost,
        }
    }
}

// ==========================================
// SchedulingConstraints - 排程约束
// ==========================================
// 各约束独立生效，均为可选
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingConstraints {
    /// 硬约束: 起止时刻都在 08:00-18:00 内（同一天）
    #[serde(default)]
    pub business_hours: bool,
    /// 硬约束: 起点或终点落在周六/周日
    #[serde(default)]
    pub weekends_only: bool,
    /// 硬约束: 起点时刻须落在至少一个维护窗口内
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindowSpec>,
    /// 软偏好: 越接近该时间得分越高
    #[serde(default)]
    pub preferred_start: Option<DateTime<Utc>>,
}

impl SchedulingConstraints {
    pub fn business_hours() -> Self {
        Self {
            business_hours: true,
            ..Self::default()
        }
    }

    pub fn with_preferred_start(mut self, preferred_start: DateTime<Utc>) -> Self {
        self.preferred_start = Some(preferred_start);
        self
    }
}

// ==========================================
// MaintenanceWindowSpec - 维护窗口 ("HH:MM-HH:MM")
// ==========================================
// 支持跨零点窗口，如 "22:00-06:00"

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("维护窗口格式错误: '{0}'（期望 HH:MM-HH:MM）")]
pub struct WindowSpecParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaintenanceWindowSpec {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl MaintenanceWindowSpec {
    pub fn parse(raw: &str) -> Result<Self, WindowSpecParseError> {
        let normalized = raw.trim().replace('–', "-");
        let (from, to) = normalized
            .split_once('-')
            .ok_or_else(|| WindowSpecParseError(raw.to_string()))?;
        let from = NaiveTime::parse_from_str(from.trim(), "%H:%M")
            .map_err(|_| WindowSpecParseError(raw.to_string()))?;
        let to = NaiveTime::parse_from_str(to.trim(), "%H:%M")
            .map_err(|_| WindowSpecParseError(raw.to_string()))?;
        Ok(Self { from, to })
    }

    /// 时刻是否落在窗口内（含起点，不含终点；from == to 视为全天）
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.from == self.to {
            return true;
        }
        if self.from < self.to {
            time >= self.from && time < self.to
        } else {
            time >= self.from || time < self.to
        }
    }
}

impl TryFrom<String> for MaintenanceWindowSpec {
    type Error = WindowSpecParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MaintenanceWindowSpec> for String {
    fn from(spec: MaintenanceWindowSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for MaintenanceWindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from.format("%H:%M"), self.to.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_spec_parse() {
        let spec = MaintenanceWindowSpec::parse("02:00-05:30").unwrap();
        assert_eq!(spec.from, t(2, 0));
        assert_eq!(spec.to, t(5, 30));
        assert_eq!(spec.to_string(), "02:00-05:30");

        let dash = MaintenanceWindowSpec::parse("02:00–05:30").unwrap();
        assert_eq!(dash, spec);

        assert!(MaintenanceWindowSpec::parse("0200-0530").is_err());
        assert!(MaintenanceWindowSpec::parse("25:00-26:00").is_err());
    }

    #[test]
    fn test_window_spec_contains() {
        let day = MaintenanceWindowSpec::parse("08:00-12:00").unwrap();
        assert!(day.contains(t(8, 0)));
        assert!(day.contains(t(11, 59)));
        assert!(!day.contains(t(12, 0)));

        let night = MaintenanceWindowSpec::parse("22:00-06:00").unwrap();
        assert!(night.contains(t(23, 0)));
        assert!(night.contains(t(1, 0)));
        assert!(!night.contains(t(6, 0)));
        assert!(!night.contains(t(12, 0)));
    }

    #[test]
    fn test_constraints_deserialize_from_strings() {
        let json = r#"{"businessHours":true,"maintenanceWindows":["01:00-04:00"]}"#;
        let c: SchedulingConstraints = serde_json::from_str(json).unwrap();
        assert!(c.business_hours);
        assert!(!c.weekends_only);
        assert_eq!(c.maintenance_windows.len(), 1);
        assert!(c.preferred_start.is_none());
    }
}
