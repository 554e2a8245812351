// ==========================================
// 机位维护排程系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供维护记录存储接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod maintenance_repo;
pub mod memory_store;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use maintenance_repo::{MaintenanceRecordRepository, MaintenanceRecordStore};
pub use memory_store::InMemoryMaintenanceStore;
