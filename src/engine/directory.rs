// ==========================================
// 机位维护排程系统 - 资源目录
// ==========================================
// 职责: 技术人员/设备的可用性查询接口
// 实现者: StaticResourceDirectory（名册）/ 调用方自有目录服务
// ==========================================

use crate::domain::interval::TimeInterval;
use crate::domain::types::{Availability, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// 资源目录错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("资源目录查询超时")]
    Timeout,

    #[error("资源目录不可用: {0}")]
    Unavailable(String),
}

/// 目录返回的可用资源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandle {
    pub resource_id: String,
    pub resource_type: ResourceType,
    /// 小时费率；None 时由分配器按资源类型取配置默认值
    pub hourly_rate: Option<f64>,
    pub availability: Availability,
}

// ==========================================
// ResourceDirectory Trait
// ==========================================
pub trait ResourceDirectory: Send + Sync {
    /// 查询在区间内可用、具备指定技能/设备标签的资源
    ///
    /// # 返回
    /// - `Ok(Some(handle))`: 找到资源（可能仅部分时段可用）
    /// - `Ok(None)`: 没有匹配资源
    fn find_available(
        &self,
        kind: ResourceType,
        tag: &str,
        interval: &TimeInterval,
    ) -> Result<Option<ResourceHandle>, DirectoryError>;
}

// ==========================================
// StaticResourceDirectory - 静态名册目录
// ==========================================

/// 名册条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    /// 不可用时段（休假、检修等）
    #[serde(default)]
    pub unavailable: Vec<TimeInterval>,
}

impl RosterEntry {
    fn availability_for(&self, interval: &TimeInterval) -> Availability {
        let blocked: Vec<&TimeInterval> = self
            .unavailable
            .iter()
            .filter(|u| u.overlaps(interval))
            .collect();

        if blocked.is_empty() {
            Availability::Available
        } else if blocked
            .iter()
            .any(|u| u.start() <= interval.start() && u.end() >= interval.end())
        {
            Availability::Unavailable
        } else {
            Availability::Partial
        }
    }
}

pub struct StaticResourceDirectory {
    entries: Vec<RosterEntry>,
    placeholder: bool,
}

impl StaticResourceDirectory {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self {
            entries,
            placeholder: false,
        }
    }

    /// 占位目录: 任意标签都视为可用，费率使用配置默认值
    pub fn placeholder() -> Self {
        Self {
            entries: Vec::new(),
            placeholder: true,
        }
    }

    /// 从 JSON 名册加载
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<RosterEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries))
    }
}

impl ResourceDirectory for StaticResourceDirectory {
    fn find_available(
        &self,
        kind: ResourceType,
        tag: &str,
        interval: &TimeInterval,
    ) -> Result<Option<ResourceHandle>, DirectoryError> {
        if self.placeholder {
            return Ok(Some(ResourceHandle {
                resource_id: format!("{}-{}", kind, tag),
                resource_type: kind,
                hourly_rate: None,
                availability: Availability::Available,
            }));
        }

        let mut partial: Option<&RosterEntry> = None;
        for entry in self
            .entries
            .iter()
            .filter(|e| e.resource_type == kind && e.tags.contains(tag))
        {
            match entry.availability_for(interval) {
                Availability::Available => {
                    return Ok(Some(ResourceHandle {
                        resource_id: entry.resource_id.clone(),
                        resource_type: kind,
                        hourly_rate: entry.hourly_rate,
                        availability: Availability::Available,
                    }));
                }
                Availability::Partial if partial.is_none() => partial = Some(entry),
                _ => {}
            }
        }

        Ok(partial.map(|entry| ResourceHandle {
            resource_id: entry.resource_id.clone(),
            resource_type: kind,
            hourly_rate: entry.hourly_rate,
            availability: Availability::Partial,
        }))
    }
}
