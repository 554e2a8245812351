// ==========================================
// 机位维护排程系统 - 导入层
// ==========================================
// 职责: 外部排程请求文件导入
// 支持: Excel, CSV, JSON
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod request_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::RequestFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
pub use request_importer::{RequestImportOutcome, RequestImporter, RowError};
