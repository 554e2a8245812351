// ==========================================
// 机位维护排程系统 - 引擎层
// ==========================================
// 职责: 冲突检测、时间窗搜索、资源分配、批量排程、紧急抢占、报表
// 红线: Engine 不拼 SQL，只通过存储 trait 访问记录
// ==========================================

pub mod allocator;
pub mod conflict;
pub mod directory;
pub mod error;
pub mod events;
pub mod notifier;
pub mod optimizer;
pub mod preemption;
pub mod report;
pub mod resource_lock;
pub mod scheduler;
pub mod window_search;

// 重导出核心引擎
pub use allocator::ResourceAllocator;
pub use conflict::ConflictDetector;
pub use directory::{
    DirectoryError, ResourceDirectory, ResourceHandle, RosterEntry, StaticResourceDirectory,
};
pub use error::{SchedulingError, SchedulingResult};
pub use events::{MaintenanceEvent, MaintenanceEventType, NoOpNotificationSink, NotificationSink};
pub use notifier::{ChannelNotificationSink, NotificationHub, NotificationListener};
pub use optimizer::{BatchOptimizer, BookedBatch, BookedSchedule};
pub use preemption::PreemptionHandler;
pub use report::ReportGenerator;
pub use resource_lock::ResourceLockRegistry;
pub use scheduler::MaintenanceScheduler;
pub use window_search::{TentativeReservation, WindowSearcher};
