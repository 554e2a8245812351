// ==========================================
// 机位维护排程系统 - 维护记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: revision 乐观锁（每次更新 +1）
// ==========================================

use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenanceRecord};
use crate::domain::types::{MaintenanceStatus, Priority};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// MaintenanceRecordStore Trait
// ==========================================
// 用途: 排程引擎消费的维护记录存储接口
// 实现者: MaintenanceRecordRepository（rusqlite）/ InMemoryMaintenanceStore
// 约束: 同一资源在单次调用内须满足读己之写
pub trait MaintenanceRecordStore: Send + Sync {
    /// 查询资源上与 [start, end) 重叠、状态属于 `statuses` 的记录
    ///
    /// # 参数
    /// - exclude_id: 排除的记录ID（自身排除）
    ///
    /// # 返回
    /// 按 scheduled_start 升序
    fn find_overlapping(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[MaintenanceStatus],
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>>;

    /// 更新状态（带乐观锁）
    fn update_status(
        &self,
        id: &str,
        status: MaintenanceStatus,
        expected_revision: i32,
    ) -> RepositoryResult<()>;

    /// 更新计划区间（带乐观锁）
    fn update_interval(
        &self,
        id: &str,
        interval: TimeInterval,
        expected_revision: i32,
    ) -> RepositoryResult<()>;

    /// 按租户范围查询计划起点落在 [start, end] 内的记录
    fn query_by_scope_and_range(
        &self,
        scope: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>>;

    /// 批量创建（事务化，全部成功或全部失败），新记录状态为 SCHEDULED
    fn create_batch(&self, records: &[NewMaintenanceRecord]) -> RepositoryResult<Vec<MaintenanceRecord>>;

    /// 按ID查询
    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MaintenanceRecord>>;
}

// ==========================================
// 时间/集合编解码
// ==========================================
// 时间统一存为定宽 RFC3339 UTC 字符串（9 位纳秒），保证字典序即时间序，且不丢失亚秒精度

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn parse_tags(idx: usize, raw: &str) -> rusqlite::Result<BTreeSet<String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

const RECORD_COLUMNS: &str = r#"
    id, resource_id, organization_id, maintenance_type, priority, status,
    scheduled_start, scheduled_end, actual_start, actual_end,
    required_skills, required_equipment, estimated_cost, actual_cost,
    revision, created_at, updated_at
"#;

fn map_record(row: &Row<'_>) -> rusqlite::Result<MaintenanceRecord> {
    let priority_raw: String = row.get(4)?;
    let status_raw: String = row.get(5)?;
    let priority = Priority::parse(&priority_raw)
        .ok_or_else(|| conversion_error(4, format!("未知优先级: {}", priority_raw)))?;
    let status = MaintenanceStatus::parse(&status_raw)
        .ok_or_else(|| conversion_error(5, format!("未知状态: {}", status_raw)))?;

    Ok(MaintenanceRecord {
        id: row.get(0)?,
        resource_id: row.get(1)?,
        organization_id: row.get(2)?,
        maintenance_type: row.get(3)?,
        priority,
        status,
        scheduled_start: parse_ts(6, &row.get::<_, String>(6)?)?,
        scheduled_end: parse_ts(7, &row.get::<_, String>(7)?)?,
        actual_start: parse_opt_ts(8, row.get(8)?)?,
        actual_end: parse_opt_ts(9, row.get(9)?)?,
        required_skills: parse_tags(10, &row.get::<_, String>(10)?)?,
        required_equipment: parse_tags(11, &row.get::<_, String>(11)?)?,
        estimated_cost: row.get(12)?,
        actual_cost: row.get(13)?,
        revision: row.get(14)?,
        created_at: parse_ts(15, &row.get::<_, String>(15)?)?,
        updated_at: parse_ts(16, &row.get::<_, String>(16)?)?,
    })
}

// ==========================================
// MaintenanceRecordRepository - 维护记录仓储
// ==========================================

/// 维护记录仓储
/// 职责: 管理 maintenance_record 表的读写
pub struct MaintenanceRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaintenanceRecordRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 乐观锁更新失败后区分"记录不存在"与"revision 冲突"
    fn explain_update_miss(
        conn: &Connection,
        id: &str,
        expected_revision: i32,
    ) -> RepositoryError {
        let actual = conn
            .query_row(
                "SELECT revision FROM maintenance_record WHERE id = ?1",
                params![id],
                |row| row.get::<_, i32>(0),
            )
            .optional();

        match actual {
            Ok(Some(actual)) => RepositoryError::OptimisticLockFailure {
                record_id: id.to_string(),
                expected: expected_revision,
                actual,
            },
            Ok(None) => RepositoryError::NotFound {
                entity: "MaintenanceRecord".to_string(),
                id: id.to_string(),
            },
            Err(e) => e.into(),
        }
    }

    /// 按资源查询全部记录（不区分状态）
    pub fn find_by_resource(&self, resource_id: &str) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM maintenance_record WHERE resource_id = ?1 ORDER BY scheduled_start",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![resource_id], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// 记录完工信息（外部工作流回写，供报表统计）
    pub fn record_completion(
        &self,
        id: &str,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
        actual_cost: f64,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        if actual_start >= actual_end {
            return Err(RepositoryError::ValidationError(format!(
                "actual_start={} 必须早于 actual_end={}",
                format_ts(actual_start),
                format_ts(actual_end)
            )));
        }

        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE maintenance_record
               SET status = ?1, actual_start = ?2, actual_end = ?3, actual_cost = ?4,
                   revision = revision + 1, updated_at = ?5
             WHERE id = ?6 AND revision = ?7
            "#,
            params![
                MaintenanceStatus::Completed.to_string(),
                format_ts(actual_start),
                format_ts(actual_end),
                actual_cost,
                format_ts(Utc::now()),
                id,
                expected_revision,
            ],
        )?;

        if affected == 0 {
            return Err(Self::explain_update_miss(&conn, id, expected_revision));
        }
        Ok(())
    }
}

impl MaintenanceRecordStore for MaintenanceRecordRepository {
    fn find_overlapping(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[MaintenanceStatus],
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        if statuses.is_empty() || start >= end {
            return Ok(Vec::new());
        }

        let mut values: Vec<String> = vec![resource_id.to_string(), format_ts(end), format_ts(start)];
        let status_placeholders: Vec<String> = statuses
            .iter()
            .map(|s| {
                values.push(s.to_string());
                format!("?{}", values.len())
            })
            .collect();

        let mut sql = format!(
            r#"
            SELECT {}
            FROM maintenance_record
            WHERE resource_id = ?1
              AND scheduled_start < ?2
              AND scheduled_end > ?3
              AND status IN ({})
            "#,
            RECORD_COLUMNS,
            status_placeholders.join(", ")
        );
        if let Some(exclude) = exclude_id {
            values.push(exclude.to_string());
            sql.push_str(&format!(" AND id != ?{}", values.len()));
        }
        sql.push_str(" ORDER BY scheduled_start, id");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn update_status(
        &self,
        id: &str,
        status: MaintenanceStatus,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE maintenance_record
               SET status = ?1, revision = revision + 1, updated_at = ?2
             WHERE id = ?3 AND revision = ?4
            "#,
            params![status.to_string(), format_ts(Utc::now()), id, expected_revision],
        )?;

        if affected == 0 {
            return Err(Self::explain_update_miss(&conn, id, expected_revision));
        }
        Ok(())
    }

    fn update_interval(
        &self,
        id: &str,
        interval: TimeInterval,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE maintenance_record
               SET scheduled_start = ?1, scheduled_end = ?2,
                   revision = revision + 1, updated_at = ?3
             WHERE id = ?4 AND revision = ?5
            "#,
            params![
                format_ts(interval.start()),
                format_ts(interval.end()),
                format_ts(Utc::now()),
                id,
                expected_revision,
            ],
        )?;

        if affected == 0 {
            return Err(Self::explain_update_miss(&conn, id, expected_revision));
        }
        Ok(())
    }

    fn query_by_scope_and_range(
        &self,
        scope: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM maintenance_record
            WHERE organization_id = ?1
              AND scheduled_start BETWEEN ?2 AND ?3
            ORDER BY scheduled_start, id
            "#,
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![scope, format_ts(start), format_ts(end)], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn create_batch(&self, records: &[NewMaintenanceRecord]) -> RepositoryResult<Vec<MaintenanceRecord>> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(records.len());

        for new_record in records {
            let record = MaintenanceRecord {
                id: Uuid::new_v4().to_string(),
                resource_id: new_record.resource_id.clone(),
                organization_id: new_record.organization_id.clone(),
                scheduled_start: new_record.interval.start(),
                scheduled_end: new_record.interval.end(),
                actual_start: None,
                actual_end: None,
                maintenance_type: new_record.maintenance_type.clone(),
                priority: new_record.priority,
                status: MaintenanceStatus::Scheduled,
                required_skills: new_record.required_skills.clone(),
                required_equipment: new_record.required_equipment.clone(),
                estimated_cost: new_record.estimated_cost,
                actual_cost: None,
                revision: 0,
                created_at: now,
                updated_at: now,
            };

            let skills_json = serde_json::to_string(&record.required_skills)
                .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
            let equipment_json = serde_json::to_string(&record.required_equipment)
                .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

            tx.execute(
                r#"
                INSERT INTO maintenance_record (
                    id, resource_id, organization_id, maintenance_type, priority, status,
                    scheduled_start, scheduled_end, actual_start, actual_end,
                    required_skills, required_equipment, estimated_cost, actual_cost,
                    revision, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL, ?9, ?10, ?11, NULL, 0, ?12, ?12)
                "#,
                params![
                    record.id,
                    record.resource_id,
                    record.organization_id,
                    record.maintenance_type,
                    record.priority.to_string(),
                    record.status.to_string(),
                    format_ts(record.scheduled_start),
                    format_ts(record.scheduled_end),
                    skills_json,
                    equipment_json,
                    record.estimated_cost,
                    format_ts(now),
                ],
            )?;

            created.push(record);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::debug!(count = created.len(), "维护记录批量创建完成");
        Ok(created)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MaintenanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM maintenance_record WHERE id = ?1", RECORD_COLUMNS);
        let record = conn.query_row(&sql, params![id], map_record).optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_ts_is_fixed_width_and_ordered() {
        let base = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let later = base + Duration::milliseconds(700);

        let a = format_ts(base);
        let b = format_ts(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_ts(0, &b).unwrap(), later);
    }
}
