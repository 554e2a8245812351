// ==========================================
// 机位维护排程系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 冲突检测与排程决策引擎（调用方负责鉴权与接口暴露）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排程规则
pub mod engine;

// 导入层 - 外部请求文件
pub mod importer;

// 配置层 - 排程参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Availability, ConflictSeverity, MaintenanceStatus, Priority, ResourceType};

// 领域实体
pub use domain::{
    interval::TimeInterval,
    maintenance::{MaintenanceRecord, MaintenanceScheduleRequest, SchedulingConstraints},
    report::MaintenanceReport,
    schedule::{AllocationPlan, PreemptionResult, ScheduleOutcome, SchedulingConflict, SchedulingWindow},
};

// 引擎
pub use engine::{MaintenanceScheduler, SchedulingError, SchedulingResult};

// 配置
pub use config::SchedulerConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "机位维护排程系统";
