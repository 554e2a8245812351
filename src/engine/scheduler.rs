// ==========================================
// 机位维护排程系统 - 排程门面
// ==========================================
// 职责: 统一装配各引擎，对调用方暴露排程操作
// 依赖注入: 存储 / 资源目录 / 通知发送者 / 排程参数
// 说明: 同一门面内的引擎共享一份资源锁登记表
// ==========================================

use crate::config::{ConfigError, SchedulerConfig, SchedulerConfigReader};
use crate::domain::maintenance::{MaintenanceRecord, MaintenanceScheduleRequest, SchedulingConstraints};
use crate::domain::report::MaintenanceReport;
use crate::domain::schedule::{AllocationPlan, PreemptionResult, ScheduleOutcome, SchedulingConflict, SchedulingWindow};
use crate::engine::allocator::ResourceAllocator;
use crate::engine::conflict::ConflictDetector;
use crate::engine::directory::ResourceDirectory;
use crate::engine::error::SchedulingResult;
use crate::engine::events::NotificationSink;
use crate::engine::optimizer::{BatchOptimizer, BookedBatch, BookedSchedule};
use crate::engine::preemption::PreemptionHandler;
use crate::engine::report::ReportGenerator;
use crate::engine::resource_lock::ResourceLockRegistry;
use crate::engine::window_search::WindowSearcher;
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

// ==========================================
// MaintenanceScheduler - 排程门面
// ==========================================
pub struct MaintenanceScheduler {
    config: SchedulerConfig,
    detector: ConflictDetector,
    searcher: WindowSearcher,
    allocator: ResourceAllocator,
    optimizer: BatchOptimizer,
    preemption: PreemptionHandler,
    reporter: ReportGenerator,
}

impl MaintenanceScheduler {
    /// 创建排程门面
    ///
    /// # 参数
    /// - store: 维护记录存储（唯一数据源）
    /// - directory: 技术人员/设备目录
    /// - sink: 通知发送者（可用 NoOpNotificationSink）
    /// - config: 排程参数
    pub fn new(
        store: Arc<dyn MaintenanceRecordStore>,
        directory: Arc<dyn ResourceDirectory>,
        sink: Arc<dyn NotificationSink>,
        config: SchedulerConfig,
    ) -> Self {
        let locks = Arc::new(ResourceLockRegistry::new());

        Self {
            detector: ConflictDetector::new(store.clone()),
            searcher: WindowSearcher::new(store.clone(), config.clone()),
            allocator: ResourceAllocator::new(directory.clone(), config.clone()),
            optimizer: BatchOptimizer::new(
                store.clone(),
                directory,
                sink.clone(),
                locks.clone(),
                config.clone(),
            ),
            preemption: PreemptionHandler::new(store.clone(), sink, locks, config.clone()),
            reporter: ReportGenerator::new(store, config.clone()),
            config,
        }
    }

    /// 通过配置读取器装配
    pub async fn from_reader(
        store: Arc<dyn MaintenanceRecordStore>,
        directory: Arc<dyn ResourceDirectory>,
        sink: Arc<dyn NotificationSink>,
        reader: &dyn SchedulerConfigReader,
    ) -> Result<Self, ConfigError> {
        let config = reader.load_scheduler_config().await?;
        config.validate()?;
        Ok(Self::new(store, directory, sink, config))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ===== 只读查询 =====

    pub fn detect_conflicts(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> SchedulingResult<Option<SchedulingConflict>> {
        self.detector.detect_conflicts(resource_id, start, end, exclude_id)
    }

    pub fn find_windows(
        &self,
        resource_id: &str,
        duration: Duration,
        search_start: Option<DateTime<Utc>>,
        search_end: Option<DateTime<Utc>>,
        constraints: Option<&SchedulingConstraints>,
    ) -> SchedulingResult<Vec<SchedulingWindow>> {
        self.searcher
            .find_windows(resource_id, duration, search_start, search_end, constraints)
    }

    pub fn allocate(
        &self,
        request: &MaintenanceScheduleRequest,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulingResult<AllocationPlan> {
        self.allocator.allocate(request, start, end)
    }

    pub fn generate_report(
        &self,
        scope: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> SchedulingResult<MaintenanceReport> {
        self.reporter.generate_report(scope, start_date, end_date)
    }

    // ===== 决策 / 写入 =====

    pub fn optimize(
        &self,
        requests: Vec<MaintenanceScheduleRequest>,
    ) -> SchedulingResult<Vec<ScheduleOutcome>> {
        self.optimizer.optimize(requests)
    }

    pub fn optimize_and_book(
        &self,
        requests: Vec<MaintenanceScheduleRequest>,
    ) -> SchedulingResult<BookedBatch> {
        self.optimizer.optimize_and_book(requests)
    }

    pub fn schedule_request(
        &self,
        request: MaintenanceScheduleRequest,
    ) -> SchedulingResult<BookedSchedule> {
        self.optimizer.schedule_request(request)
    }

    pub fn preempt(&self, request: &MaintenanceScheduleRequest) -> SchedulingResult<PreemptionResult> {
        self.preemption.preempt(request)
    }

    pub fn preempt_and_book(
        &self,
        request: &MaintenanceScheduleRequest,
    ) -> SchedulingResult<(PreemptionResult, MaintenanceRecord)> {
        self.preemption.preempt_and_book(request)
    }
}
