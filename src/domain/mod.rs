// ==========================================
// 机位维护排程系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod interval;
pub mod maintenance;
pub mod report;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use interval::{InvalidIntervalError, TimeInterval};
pub use maintenance::{
    MaintenanceRecord, MaintenanceScheduleRequest, MaintenanceWindowSpec, NewMaintenanceRecord,
    SchedulingConstraints, WindowSpecParseError,
};
pub use report::{BreakdownEntry, CostAnalysis, MaintenanceReport, ReportSummary};
pub use schedule::{
    AdjustedRecord, AllocationOutcome, AllocationPlan, OptimizedSchedule, PreemptionAction,
    PreemptionFailure, PreemptionResult, ResourceAllocation, ScheduleOutcome, SchedulingConflict,
    SchedulingWindow, UnmetReason, UnscheduledReason,
};
pub use types::{Availability, ConflictSeverity, MaintenanceStatus, Priority, ResourceType};
