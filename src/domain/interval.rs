// ==========================================
// 机位维护排程系统 - 时间区间值对象
// ==========================================
// 红线: 所有区间均为半开区间 [start, end)，且 start < end
// ==========================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 非法区间错误（start >= end）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("非法时间区间: start={start} 必须早于 end={end}")]
pub struct InvalidIntervalError {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ==========================================
// TimeInterval - 半开时间区间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TimeIntervalRaw")]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// 反序列化中间结构，经 TimeInterval::new 校验后转换
#[derive(Deserialize)]
struct TimeIntervalRaw {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<TimeIntervalRaw> for TimeInterval {
    type Error = InvalidIntervalError;

    fn try_from(raw: TimeIntervalRaw) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    /// 创建区间，start >= end 时返回错误
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidIntervalError> {
        if start >= end {
            return Err(InvalidIntervalError { start, end });
        }
        Ok(Self { start, end })
    }

    /// 以起点 + 时长创建区间（终点溢出视为非法区间）
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self, InvalidIntervalError> {
        let end = start.checked_add_signed(duration).unwrap_or(start);
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 时长（小时，带小数）
    pub fn duration_hours(&self) -> f64 {
        self.duration().num_seconds() as f64 / 3600.0
    }

    /// 区间重叠判定
    ///
    /// 覆盖四种情况（新区间起点落在已有区间内 / 终点落在已有区间内 /
    /// 新区间包含已有区间 / 已有区间包含新区间），统一为:
    /// `self.start < other.end && other.start < self.end`
    ///
    /// 该判定对两个参数对称。
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 与原始起止时间比较的重叠判定（用于未构造为区间的记录字段）
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }

    /// 整体平移
    pub fn shifted_to(&self, new_start: DateTime<Utc>) -> TimeInterval {
        TimeInterval {
            start: new_start,
            end: new_start + self.duration(),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
