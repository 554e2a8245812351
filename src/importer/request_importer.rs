// ==========================================
// 机位维护排程系统 - 排程请求导入器
// ==========================================
// 流程: 文件解析 → 字段映射（行级错误收集）→ 请求列表
// 支持: .csv / .xlsx / .xls / .json
// 说明: 行级错误不阻断整批，文件级错误直接返回
// ==========================================

use crate::domain::maintenance::MaintenanceScheduleRequest;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::RequestFieldMapper;
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use chrono::FixedOffset;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 行级导入错误（用于汇总输出）
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: Option<usize>,
    pub message: String,
}

/// 导入结果
#[derive(Debug, Default)]
pub struct RequestImportOutcome {
    pub requests: Vec<MaintenanceScheduleRequest>,
    pub errors: Vec<RowError>,
}

impl RequestImportOutcome {
    pub fn total_rows(&self) -> usize {
        self.requests.len() + self.errors.len()
    }
}

pub struct RequestImporter {
    parser: Box<dyn FileParser>,
    mapper: RequestFieldMapper,
}

impl RequestImporter {
    /// # 参数
    /// - offset: 表格中无时区日期时间所属的业务时区
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_parser(Box::new(UniversalFileParser), offset)
    }

    pub fn with_parser(parser: Box<dyn FileParser>, offset: FixedOffset) -> Self {
        Self {
            parser,
            mapper: RequestFieldMapper::new(offset),
        }
    }

    /// 导入排程请求文件
    ///
    /// # 返回
    /// - Ok(RequestImportOutcome): 成功映射的请求 + 行级错误
    /// - Err: 文件不存在、格式不支持、解析失败
    #[instrument(skip_all, fields(file = %file_path.display()))]
    pub fn import_file(&self, file_path: &Path) -> ImportResult<RequestImportOutcome> {
        info!("开始导入排程请求");

        let is_json = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let outcome = if is_json {
            self.import_json(file_path)?
        } else {
            self.import_table(file_path)?
        };

        info!(
            total = outcome.total_rows(),
            imported = outcome.requests.len(),
            failed = outcome.errors.len(),
            "排程请求导入完成"
        );
        Ok(outcome)
    }

    fn import_table(&self, file_path: &Path) -> ImportResult<RequestImportOutcome> {
        let raw_rows = self.parser.parse_to_raw_records(file_path)?;
        let mut outcome = RequestImportOutcome::default();

        for (idx, raw) in raw_rows.iter().enumerate() {
            // 表头占第 1 行
            let row_number = idx + 2;
            match self.mapper.map_row(raw, row_number) {
                Ok(request) => outcome.requests.push(request),
                Err(e) => {
                    warn!(row_number, error = %e, "字段映射失败");
                    outcome.errors.push(RowError {
                        row: e.row(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// JSON 文件: MaintenanceScheduleRequest 数组（camelCase 字段，时间须带时区）
    fn import_json(&self, file_path: &Path) -> ImportResult<RequestImportOutcome> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let content = fs::read_to_string(file_path)?;
        let parsed: Vec<MaintenanceScheduleRequest> = serde_json::from_str(&content)?;
        let mut outcome = RequestImportOutcome::default();

        for (idx, request) in parsed.into_iter().enumerate() {
            let row_number = idx + 1;
            match request.requested_interval() {
                Ok(_) => outcome.requests.push(request),
                Err(e) => {
                    let err = ImportError::InvalidInterval {
                        row: row_number,
                        message: e.to_string(),
                    };
                    warn!(row_number, error = %err, "请求时间区间非法");
                    outcome.errors.push(RowError {
                        row: Some(row_number),
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_import_csv_collects_row_errors() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "resource_id,organization_id,maintenance_type,priority,scheduled_start,scheduled_end"
        )
        .unwrap();
        writeln!(file, "S1,ORG1,INSPECTION,HIGH,2026-03-10 10:00,2026-03-10 12:00").unwrap();
        writeln!(file, "S2,ORG1,INSPECTION,HIGH,2026-03-10 12:00,2026-03-10 10:00").unwrap();
        writeln!(file, ",ORG1,INSPECTION,LOW,2026-03-10 10:00,2026-03-10 12:00").unwrap();

        let outcome = RequestImporter::new(offset()).import_file(file.path()).unwrap();
        assert_eq!(outcome.requests.len(), 1);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].row, Some(3));
        assert_eq!(outcome.errors[1].row, Some(4));
    }

    #[test]
    fn test_import_json_array() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{
                "resourceId": "S1",
                "organizationId": "ORG1",
                "maintenanceType": "REPAIR",
                "priority": "URGENT",
                "scheduledStart": "2026-03-10T10:00:00Z",
                "scheduledEnd": "2026-03-10T12:00:00Z",
                "estimatedCost": 500.0
            }}]"#
        )
        .unwrap();

        let outcome = RequestImporter::new(offset()).import_file(file.path()).unwrap();
        assert_eq!(outcome.requests.len(), 1);
        assert!(outcome.errors.is_empty());
    }
}
