// ==========================================
// 机位维护排程系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::scheduler_config::{ConfigError, SchedulerConfig, SchedulerConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::Lock(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.get_config_value(key)
    }

    /// 读取并解析配置值，缺失或格式错误时使用默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default_value = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 写入（覆盖）global scope 配置
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 记录批量排程时使用的参数，便于复盘
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 注意
    /// - 此方法会覆盖现有的 global 配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, ConfigError> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    /// 同步读取排程参数（缺省项使用默认值）
    pub fn read_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let d = SchedulerConfig::default();

        let config = SchedulerConfig {
            search_horizon_days: self
                .get_parsed_or(config_keys::SEARCH_HORIZON_DAYS, d.search_horizon_days)?,
            search_step_minutes: self
                .get_parsed_or(config_keys::SEARCH_STEP_MINUTES, d.search_step_minutes)?,
            max_alternatives: self.get_parsed_or(config_keys::MAX_ALTERNATIVES, d.max_alternatives)?,
            utc_offset_minutes: self
                .get_parsed_or(config_keys::UTC_OFFSET_MINUTES, d.utc_offset_minutes)?,
            preemption_buffer_minutes: self.get_parsed_or(
                config_keys::PREEMPTION_BUFFER_MINUTES,
                d.preemption_buffer_minutes,
            )?,
            technician_hourly_rate: self
                .get_parsed_or(config_keys::TECHNICIAN_HOURLY_RATE, d.technician_hourly_rate)?,
            equipment_hourly_rate: self
                .get_parsed_or(config_keys::EQUIPMENT_HOURLY_RATE, d.equipment_hourly_rate)?,
            budget_variance_threshold_pct: self.get_parsed_or(
                config_keys::BUDGET_VARIANCE_THRESHOLD_PCT,
                d.budget_variance_threshold_pct,
            )?,
            on_time_rate_threshold_pct: self.get_parsed_or(
                config_keys::ON_TIME_RATE_THRESHOLD_PCT,
                d.on_time_rate_threshold_pct,
            )?,
            urgent_share_threshold_pct: self.get_parsed_or(
                config_keys::URGENT_SHARE_THRESHOLD_PCT,
                d.urgent_share_threshold_pct,
            )?,
        };

        config.validate()?;
        Ok(config)
    }
}

// ==========================================
// SchedulerConfigReader Trait 实现
// ==========================================
#[async_trait]
impl SchedulerConfigReader for ConfigManager {
    async fn load_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        self.read_scheduler_config()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 时间窗搜索
    pub const SEARCH_HORIZON_DAYS: &str = "search_horizon_days";
    pub const SEARCH_STEP_MINUTES: &str = "search_step_minutes";
    pub const MAX_ALTERNATIVES: &str = "max_alternatives";
    pub const UTC_OFFSET_MINUTES: &str = "utc_offset_minutes";

    // 抢占
    pub const PREEMPTION_BUFFER_MINUTES: &str = "preemption_buffer_minutes";

    // 资源费率
    pub const TECHNICIAN_HOURLY_RATE: &str = "technician_hourly_rate";
    pub const EQUIPMENT_HOURLY_RATE: &str = "equipment_hourly_rate";

    // 报表建议阈值
    pub const BUDGET_VARIANCE_THRESHOLD_PCT: &str = "budget_variance_threshold_pct";
    pub const ON_TIME_RATE_THRESHOLD_PCT: &str = "on_time_rate_threshold_pct";
    pub const URGENT_SHARE_THRESHOLD_PCT: &str = "urgent_share_threshold_pct";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let cm = manager();
        assert_eq!(cm.read_scheduler_config().unwrap(), SchedulerConfig::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cm = manager();
        cm.set_global_config_value(config_keys::SEARCH_HORIZON_DAYS, "7").unwrap();
        cm.set_global_config_value(config_keys::TECHNICIAN_HOURLY_RATE, "abc").unwrap();

        let config = cm.read_scheduler_config().unwrap();
        assert_eq!(config.search_horizon_days, 7);
        assert_eq!(config.technician_hourly_rate, 100.0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let cm = manager();
        cm.set_global_config_value(config_keys::MAX_ALTERNATIVES, "5").unwrap();
        let snapshot = cm.get_config_snapshot().unwrap();

        cm.set_global_config_value(config_keys::MAX_ALTERNATIVES, "1").unwrap();
        let restored = cm.restore_config_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, 1);
        assert_eq!(cm.read_scheduler_config().unwrap().max_alternatives, 5);
    }

    #[tokio::test]
    async fn test_async_reader() {
        let cm = manager();
        let config = cm.load_scheduler_config().await.unwrap();
        assert_eq!(config.preemption_buffer_minutes, 60);
    }
}
