// ==========================================
// 机位维护排程系统 - 批量排程优化引擎
// ==========================================
// 职责: 按优先级为一批请求逐个选定时间窗并分配资源
// 输入: Vec<MaintenanceScheduleRequest>
// 输出: Vec<ScheduleOutcome>（按处理顺序，无法排程的请求显式返回）
// 红线: 批次内已选时段对后续请求视为占用；单个请求失败不影响整批
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, MaintenanceScheduleRequest, SchedulingConstraints};
use crate::domain::schedule::{AllocationPlan, OptimizedSchedule, ScheduleOutcome, SchedulingWindow, UnscheduledReason};
use crate::engine::allocator::ResourceAllocator;
use crate::engine::conflict::ConflictDetector;
use crate::engine::directory::ResourceDirectory;
use crate::engine::error::{SchedulingError, SchedulingResult};
use crate::engine::events::{MaintenanceEvent, MaintenanceEventType, NotificationSink};
use crate::engine::resource_lock::ResourceLockRegistry;
use crate::engine::window_search::{TentativeReservation, WindowSearcher};
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// 批量排程并落库的结果
#[derive(Debug, Clone)]
pub struct BookedBatch {
    pub outcomes: Vec<ScheduleOutcome>,
    pub records: Vec<MaintenanceRecord>, // 与已排程结果一一对应，按处理顺序
}

/// 单请求排程并落库的结果
#[derive(Debug, Clone)]
pub struct BookedSchedule {
    pub record: MaintenanceRecord,
    pub allocation: AllocationPlan,
    pub score: f64,
    pub alternatives: Vec<SchedulingWindow>,
}

// ==========================================
// BatchOptimizer - 批量排程优化引擎
// ==========================================
pub struct BatchOptimizer {
    store: Arc<dyn MaintenanceRecordStore>,
    searcher: WindowSearcher,
    allocator: ResourceAllocator,
    detector: ConflictDetector,
    locks: Arc<ResourceLockRegistry>,
    sink: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
}

impl BatchOptimizer {
    pub fn new(
        store: Arc<dyn MaintenanceRecordStore>,
        directory: Arc<dyn ResourceDirectory>,
        sink: Arc<dyn NotificationSink>,
        locks: Arc<ResourceLockRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            searcher: WindowSearcher::new(store.clone(), config.clone()),
            allocator: ResourceAllocator::new(directory, config.clone()),
            detector: ConflictDetector::new(store.clone()),
            store,
            locks,
            sink,
            config,
        }
    }

    /// 批量排程
    ///
    /// # 流程
    /// 1. 按优先级权重降序稳定排序
    /// 2. 逐个请求: 搜索时间窗 → 取最高分 → 分配资源 → 冲突提示 → 备选窗口
    /// 3. 选定时段记为批次内占位，供同资源后续请求避让
    ///
    /// # 返回
    /// 与处理顺序一致的结果列表；存储故障时整体返回错误
    #[instrument(skip_all, fields(request_count = requests.len()))]
    pub fn optimize(
        &self,
        requests: Vec<MaintenanceScheduleRequest>,
    ) -> SchedulingResult<Vec<ScheduleOutcome>> {
        let (outcomes, _) = self.run_batch(requests, false)?;
        Ok(outcomes)
    }

    /// 批量排程并落库
    ///
    /// 每个已排程结果在同一把资源锁内完成「读-决策-写」，
    /// 并发调用方看到的是已落库的记录而不是过期的空闲时段
    #[instrument(skip_all, fields(request_count = requests.len()))]
    pub fn optimize_and_book(
        &self,
        requests: Vec<MaintenanceScheduleRequest>,
    ) -> SchedulingResult<BookedBatch> {
        let (outcomes, records) = self.run_batch(requests, true)?;
        Ok(BookedBatch { outcomes, records })
    }

    fn run_batch(
        &self,
        requests: Vec<MaintenanceScheduleRequest>,
        book: bool,
    ) -> SchedulingResult<(Vec<ScheduleOutcome>, Vec<MaintenanceRecord>)> {
        let mut ordered = requests;
        ordered.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));

        let mut reservations: HashMap<String, Vec<TentativeReservation>> = HashMap::new();
        let mut outcomes = Vec::with_capacity(ordered.len());
        let mut records = Vec::new();

        for request in ordered {
            let resource_id = request.resource_id.clone();
            let placed = reservations.entry(resource_id.clone()).or_default();

            let (outcome, record) = self.locks.with_lock(
                &resource_id,
                || -> SchedulingResult<(ScheduleOutcome, Option<MaintenanceRecord>)> {
                    let outcome = self.plan_one(request, placed)?;
                    let record = match &outcome {
                        ScheduleOutcome::Scheduled(schedule) if book => Some(self.persist(schedule)?),
                        _ => None,
                    };
                    Ok((outcome, record))
                },
            )?;

            // 已落库的记录由存储负责占用，无需再记批次内占位
            if let (ScheduleOutcome::Scheduled(schedule), None) = (&outcome, &record) {
                placed.push(TentativeReservation {
                    label: schedule.request.label(),
                    priority: schedule.request.priority,
                    interval: schedule.interval,
                });
            }
            self.emit_outcome(&outcome, record.as_ref());
            outcomes.push(outcome);
            records.extend(record);
        }

        let scheduled = outcomes.iter().filter(|o| o.as_scheduled().is_some()).count();
        tracing::info!(
            scheduled,
            unscheduled = outcomes.len() - scheduled,
            persisted = records.len(),
            "批量排程完成"
        );

        Ok((outcomes, records))
    }

    /// 单请求排程并落库
    ///
    /// 只采用无重叠的时间窗；没有时返回 NoWindowAvailable
    #[instrument(skip_all, fields(resource_id = %request.resource_id, priority = %request.priority))]
    pub fn schedule_request(
        &self,
        request: MaintenanceScheduleRequest,
    ) -> SchedulingResult<BookedSchedule> {
        let resource_id = request.resource_id.clone();

        self.locks.with_lock(&resource_id, || -> SchedulingResult<BookedSchedule> {
            let windows = self.candidate_windows(&request, &[])?;
            let mut available = windows.into_iter().filter(|w| w.available);
            let best = available.next().ok_or_else(|| SchedulingError::NoWindowAvailable {
                resource_id: resource_id.clone(),
            })?;
            let alternatives: Vec<SchedulingWindow> =
                available.take(self.config.max_alternatives).collect();

            let allocation = self
                .allocator
                .allocate(&request, best.interval.start(), best.interval.end())?;

            let record = self.store_new_record(&request, best.interval)?;

            tracing::info!(record_id = %record.id, interval = %best.interval, "请求已排程并落库");
            self.sink.emit(
                MaintenanceEvent::for_record(
                    MaintenanceEventType::ScheduleOptimized,
                    &resource_id,
                    &record.id,
                    Some(best.interval),
                )
                .with_detail(request.label()),
            );

            Ok(BookedSchedule {
                record,
                allocation,
                score: best.score,
                alternatives,
            })
        })
    }

    fn persist(&self, schedule: &OptimizedSchedule) -> SchedulingResult<MaintenanceRecord> {
        self.store_new_record(&schedule.request, schedule.interval)
    }

    fn store_new_record(
        &self,
        request: &MaintenanceScheduleRequest,
        interval: TimeInterval,
    ) -> SchedulingResult<MaintenanceRecord> {
        self.store
            .create_batch(&[request.to_new_record(interval)])?
            .pop()
            .ok_or_else(|| SchedulingError::StoreUnavailable("批量创建未返回记录".to_string()))
    }

    fn plan_one(
        &self,
        request: MaintenanceScheduleRequest,
        placed: &[TentativeReservation],
    ) -> SchedulingResult<ScheduleOutcome> {
        if let Err(e) = request.requested_interval() {
            return Ok(ScheduleOutcome::Unscheduled {
                request,
                reason: UnscheduledReason::InvalidInterval(e.to_string()),
            });
        }

        let windows = match self.candidate_windows(&request, placed) {
            Ok(windows) => windows,
            Err(SchedulingError::InvalidInterval(msg)) => {
                return Ok(ScheduleOutcome::Unscheduled {
                    request,
                    reason: UnscheduledReason::InvalidInterval(msg),
                })
            }
            Err(e) => return Err(e),
        };

        let mut ranked = windows.into_iter();
        let best = match ranked.next() {
            Some(best) => best,
            None => {
                return Ok(ScheduleOutcome::Unscheduled {
                    request,
                    reason: UnscheduledReason::NoWindowAvailable,
                })
            }
        };
        let alternatives: Vec<SchedulingWindow> = ranked.take(self.config.max_alternatives).collect();

        let allocation = self
            .allocator
            .allocate(&request, best.interval.start(), best.interval.end())?;

        // 仅提示，不阻断
        let conflicts =
            self.detector
                .detect_with_reservations(&request.resource_id, best.interval, None, placed)?;

        Ok(ScheduleOutcome::Scheduled(OptimizedSchedule {
            priority_weight: request.priority.weight(),
            interval: best.interval,
            score: best.score,
            allocation,
            conflicts,
            alternatives,
            request,
        }))
    }

    /// 每个请求重新搜索（不缓存）: [请求起点, 请求起点 + 搜索范围]
    fn candidate_windows(
        &self,
        request: &MaintenanceScheduleRequest,
        placed: &[TentativeReservation],
    ) -> SchedulingResult<Vec<SchedulingWindow>> {
        let search_start = request.scheduled_start;
        let search_end = self.config.search_end_from(search_start);

        let mut constraints: SchedulingConstraints = request.constraints.clone().unwrap_or_default();
        if constraints.preferred_start.is_none() {
            constraints.preferred_start = Some(request.scheduled_start);
        }

        self.searcher.search(
            &request.resource_id,
            request.duration(),
            search_start,
            search_end,
            Some(&constraints),
            placed,
        )
    }

    fn emit_outcome(&self, outcome: &ScheduleOutcome, record: Option<&MaintenanceRecord>) {
        match outcome {
            ScheduleOutcome::Scheduled(schedule) => {
                let resource_id = schedule.request.resource_id.as_str();
                let event = match record {
                    Some(record) => MaintenanceEvent::for_record(
                        MaintenanceEventType::ScheduleOptimized,
                        resource_id,
                        &record.id,
                        Some(schedule.interval),
                    ),
                    None => MaintenanceEvent::for_resource(
                        MaintenanceEventType::ScheduleOptimized,
                        resource_id,
                        Some(schedule.interval),
                    ),
                };
                self.sink.emit(event.with_detail(schedule.request.label()));
                if !schedule.allocation.is_complete() {
                    self.sink.emit(
                        MaintenanceEvent::for_resource(
                            MaintenanceEventType::PartialAllocation,
                            &schedule.request.resource_id,
                            Some(schedule.interval),
                        )
                        .with_detail(schedule.allocation.unmet_requirements().join(", ")),
                    );
                }
            }
            ScheduleOutcome::Unscheduled { request, reason } => {
                tracing::warn!(request = %request.label(), reason = ?reason, "请求无法排程");
                self.sink.emit(
                    MaintenanceEvent::for_resource(
                        MaintenanceEventType::RequestUnscheduled,
                        &request.resource_id,
                        None,
                    )
                    .with_detail(format!("{}: {:?}", request.label(), reason)),
                );
            }
        }
    }
}
