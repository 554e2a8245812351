// ==========================================
// 机位维护排程系统 - 排程参数
// ==========================================
// 职责: 排程引擎使用的全部可调参数（含默认值）
// 来源: config_kv 覆写（ConfigManager） / 调用方直接构造
// ==========================================

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置数据库访问失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("配置锁获取失败: {0}")]
    Lock(String),

    #[error("配置快照解析失败: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("配置值非法 (key={key}): {message}")]
    InvalidValue { key: String, message: String },
}

// ==========================================
// SchedulerConfig - 排程参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    // ===== 时间窗搜索 =====
    pub search_horizon_days: i64,  // 默认搜索范围（天）
    pub search_step_minutes: i64,  // 游标步长（分钟）
    pub max_alternatives: usize,   // 备选窗口数量上限
    pub utc_offset_minutes: i32,   // 业务时区偏移（用于营业时段/工作日判断）

    // ===== 抢占 =====
    pub preemption_buffer_minutes: i64, // 顺移缓冲

    // ===== 资源费率（目录未提供费率时的兜底） =====
    pub technician_hourly_rate: f64,
    pub equipment_hourly_rate: f64,

    // ===== 报表建议阈值 =====
    pub budget_variance_threshold_pct: f64,
    pub on_time_rate_threshold_pct: f64,
    pub urgent_share_threshold_pct: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            search_horizon_days: 30,
            search_step_minutes: 60,
            max_alternatives: 3,
            utc_offset_minutes: 0,
            preemption_buffer_minutes: 60,
            technician_hourly_rate: 100.0,
            equipment_hourly_rate: 50.0,
            budget_variance_threshold_pct: 20.0,
            on_time_rate_threshold_pct: 80.0,
            urgent_share_threshold_pct: 10.0,
        }
    }
}

impl SchedulerConfig {
    pub fn search_horizon(&self) -> Duration {
        Duration::days(self.search_horizon_days)
    }

    /// 搜索范围终点（超出可表示范围时取最大时刻）
    pub fn search_end_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_signed(self.search_horizon())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn search_step(&self) -> Duration {
        Duration::minutes(self.search_step_minutes.max(1))
    }

    pub fn preemption_buffer(&self) -> Duration {
        Duration::minutes(self.preemption_buffer_minutes.max(0))
    }

    /// 业务时区
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// 参数合法性校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_horizon_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "search_horizon_days".to_string(),
                message: format!("必须为正数，实际 {}", self.search_horizon_days),
            });
        }
        if self.search_step_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "search_step_minutes".to_string(),
                message: format!("必须为正数，实际 {}", self.search_step_minutes),
            });
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue {
                key: "utc_offset_minutes".to_string(),
                message: format!("超出 ±24h，实际 {}", self.utc_offset_minutes),
            });
        }
        if self.technician_hourly_rate < 0.0 || self.equipment_hourly_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "hourly_rate".to_string(),
                message: "费率不能为负".to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// SchedulerConfigReader Trait
// ==========================================
// 用途: 引擎装配时读取排程参数
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SchedulerConfigReader: Send + Sync {
    /// 读取完整排程参数（缺省项使用默认值）
    async fn load_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError>;
}
