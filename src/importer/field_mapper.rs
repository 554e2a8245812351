// ==========================================
// 机位维护排程系统 - 字段映射器实现
// ==========================================
// 职责: 原始行记录 → MaintenanceScheduleRequest + 类型转换
// 列名: 支持英文列名与中文别名
// ==========================================

use crate::domain::maintenance::{
    MaintenanceScheduleRequest, MaintenanceWindowSpec, SchedulingConstraints,
};
use crate::domain::types::Priority;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeSet;

/// 本地日期时间格式（无时区时按业务时区解释）
const LOCAL_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

pub struct RequestFieldMapper {
    offset: FixedOffset,
}

impl RequestFieldMapper {
    /// # 参数
    /// - offset: 无时区日期时间所属的业务时区
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// 映射单行
    ///
    /// # 参数
    /// - row_number: 文件中的行号（表头为第 1 行）
    pub fn map_row(&self, row: &RawRow, row_number: usize) -> ImportResult<MaintenanceScheduleRequest> {
        let scheduled_start = self.require_datetime(row, "scheduled_start", row_number)?;
        let scheduled_end = self.require_datetime(row, "scheduled_end", row_number)?;
        if scheduled_start >= scheduled_end {
            return Err(ImportError::InvalidInterval {
                row: row_number,
                message: format!(
                    "scheduled_start={} 必须早于 scheduled_end={}",
                    scheduled_start.to_rfc3339(),
                    scheduled_end.to_rfc3339()
                ),
            });
        }

        let priority_raw = self.require_string(row, "priority", row_number)?;
        let priority = Priority::parse(&priority_raw).ok_or_else(|| ImportError::TypeConversionError {
            row: row_number,
            field: "priority".to_string(),
            message: format!("未知优先级: {}", priority_raw),
        })?;

        Ok(MaintenanceScheduleRequest {
            reference: self.get_string(row, "reference"),
            resource_id: self.require_string(row, "resource_id", row_number)?,
            organization_id: self.require_string(row, "organization_id", row_number)?,
            maintenance_type: self.require_string(row, "maintenance_type", row_number)?,
            priority,
            scheduled_start,
            scheduled_end,
            required_skills: self.get_tags(row, "required_skills"),
            required_equipment: self.get_tags(row, "required_equipment"),
            estimated_cost: self.parse_f64(row, "estimated_cost", row_number)?.unwrap_or(0.0),
            constraints: self.parse_constraints(row, row_number)?,
        })
    }

    fn aliases(key: &str) -> &'static [&'static str] {
        match key {
            "reference" => &["reference", "工单号", "请求编号"],
            "resource_id" => &["resource_id", "机位", "机位号"],
            "organization_id" => &["organization_id", "机构", "所属机构"],
            "maintenance_type" => &["maintenance_type", "维护类型"],
            "priority" => &["priority", "优先级"],
            "scheduled_start" => &["scheduled_start", "计划开始"],
            "scheduled_end" => &["scheduled_end", "计划结束"],
            "required_skills" => &["required_skills", "所需技能"],
            "required_equipment" => &["required_equipment", "所需设备"],
            "estimated_cost" => &["estimated_cost", "预算", "预估成本"],
            "business_hours" => &["business_hours", "仅营业时段"],
            "weekends_only" => &["weekends_only", "仅周末"],
            "maintenance_windows" => &["maintenance_windows", "维护窗口"],
            "preferred_start" => &["preferred_start", "偏好开始"],
            _ => &[],
        }
    }

    /// 提取字符串字段（返回 Option），按别名依次尝试
    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        Self::aliases(key)
            .iter()
            .filter_map(|alias| row.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn require_string(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<String> {
        self.get_string(row, key).ok_or_else(|| ImportError::FieldMissing {
            row: row_number,
            field: key.to_string(),
        })
    }

    /// 标签列表，分隔符 ; | ，
    fn get_tags(&self, row: &RawRow, key: &str) -> BTreeSet<String> {
        self.get_string(row, key)
            .map(|raw| {
                raw.split(|c: char| c == ';' || c == '|' || c == '，')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_f64(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<f64>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|e| ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    fn parse_bool(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<bool> {
        match self.get_string(row, key) {
            None => Ok(false),
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "y" | "yes" | "是" => Ok(true),
                "false" | "0" | "n" | "no" | "否" => Ok(false),
                _ => Err(ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: format!("无法识别的布尔值: {}", raw),
                }),
            },
        }
    }

    fn parse_datetime(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<DateTime<Utc>>> {
        let raw = match self.get_string(row, key) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }

        LOCAL_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .ok_or(ImportError::DateFormatError {
                row: row_number,
                field: key.to_string(),
                value: raw,
            })
    }

    fn require_datetime(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<DateTime<Utc>> {
        self.parse_datetime(row, key, row_number)?
            .ok_or_else(|| ImportError::FieldMissing {
                row: row_number,
                field: key.to_string(),
            })
    }

    /// 约束列全部为空时返回 None
    fn parse_constraints(&self, row: &RawRow, row_number: usize) -> ImportResult<Option<SchedulingConstraints>> {
        let business_hours = self.parse_bool(row, "business_hours", row_number)?;
        let weekends_only = self.parse_bool(row, "weekends_only", row_number)?;
        let preferred_start = self.parse_datetime(row, "preferred_start", row_number)?;

        let maintenance_windows = self
            .get_string(row, "maintenance_windows")
            .map(|raw| {
                raw.split(|c: char| c == ';' || c == '|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        MaintenanceWindowSpec::parse(s).map_err(|e| ImportError::TypeConversionError {
                            row: row_number,
                            field: "maintenance_windows".to_string(),
                            message: e.to_string(),
                        })
                    })
                    .collect::<ImportResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let constraints = SchedulingConstraints {
            business_hours,
            weekends_only,
            maintenance_windows,
            preferred_start,
        };

        if constraints == SchedulingConstraints::default() {
            Ok(None)
        } else {
            Ok(Some(constraints))
        }
    }
}
