// ==========================================
// 机位维护排程系统 - 紧急抢占引擎
// ==========================================
// 职责: URGENT 请求直接获得请求时段，处理被占用的已有记录
// 规则:
// - LOW / MEDIUM → POSTPONED（待重新排程）
// - HIGH / URGENT → 顺移到紧急工单结束 + 缓冲之后，逐个级联
// 红线: 尽力而为，单条失败不回滚其他记录，失败明细随结果返回
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, MaintenanceScheduleRequest};
use crate::domain::schedule::{AdjustedRecord, PreemptionAction, PreemptionFailure, PreemptionResult};
use crate::domain::types::{MaintenanceStatus, Priority};
use crate::engine::conflict::ConflictDetector;
use crate::engine::error::{SchedulingError, SchedulingResult};
use crate::engine::events::{MaintenanceEvent, MaintenanceEventType, NotificationSink};
use crate::engine::resource_lock::ResourceLockRegistry;
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// PreemptionHandler - 紧急抢占引擎
// ==========================================
pub struct PreemptionHandler {
    store: Arc<dyn MaintenanceRecordStore>,
    detector: ConflictDetector,
    locks: Arc<ResourceLockRegistry>,
    sink: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
}

impl PreemptionHandler {
    pub fn new(
        store: Arc<dyn MaintenanceRecordStore>,
        sink: Arc<dyn NotificationSink>,
        locks: Arc<ResourceLockRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            detector: ConflictDetector::new(store.clone()),
            store,
            locks,
            sink,
            config,
        }
    }

    /// 紧急抢占
    ///
    /// # 返回
    /// - `Err(InvalidPriority)`: 非 URGENT 请求
    /// - `Ok(result)`: 紧急工单获得其请求时段；落库由调用方负责
    #[instrument(skip_all, fields(resource_id = %request.resource_id))]
    pub fn preempt(&self, request: &MaintenanceScheduleRequest) -> SchedulingResult<PreemptionResult> {
        let interval = Self::validate(request)?;
        self.locks
            .with_lock(&request.resource_id, || self.run(request, interval))
    }

    /// 紧急抢占并落库紧急工单（同一把资源锁内完成）
    #[instrument(skip_all, fields(resource_id = %request.resource_id))]
    pub fn preempt_and_book(
        &self,
        request: &MaintenanceScheduleRequest,
    ) -> SchedulingResult<(PreemptionResult, MaintenanceRecord)> {
        let interval = Self::validate(request)?;
        self.locks.with_lock(
            &request.resource_id,
            || -> SchedulingResult<(PreemptionResult, MaintenanceRecord)> {
                let result = self.run(request, interval)?;
                let record = self
                    .store
                    .create_batch(&[request.to_new_record(interval)])?
                    .pop()
                    .ok_or_else(|| {
                        SchedulingError::StoreUnavailable("批量创建未返回记录".to_string())
                    })?;
                tracing::info!(record_id = %record.id, "紧急工单已落库");
                Ok((result, record))
            },
        )
    }

    fn validate(request: &MaintenanceScheduleRequest) -> SchedulingResult<TimeInterval> {
        if request.priority != Priority::Urgent {
            return Err(SchedulingError::InvalidPriority {
                priority: request.priority,
            });
        }
        Ok(request.requested_interval()?)
    }

    fn run(
        &self,
        request: &MaintenanceScheduleRequest,
        interval: TimeInterval,
    ) -> SchedulingResult<PreemptionResult> {
        let resource_id = request.resource_id.as_str();
        let buffer = self.config.preemption_buffer();

        let mut overlapping = self.store.find_overlapping(
            resource_id,
            interval.start(),
            interval.end(),
            &MaintenanceStatus::ACTIVE,
            None,
        )?;
        // 优先级升序，同优先级按起点
        overlapping.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.scheduled_start.cmp(&b.scheduled_start))
        });

        let mut result = PreemptionResult {
            scheduled_time: interval,
            preempted_record_ids: Vec::new(),
            adjusted_record_ids: Vec::new(),
            adjustments: Vec::new(),
            failures: Vec::new(),
            follow_on_conflicts: Vec::new(),
        };

        // 下一条顺移记录的起点
        let mut next_start = interval.end() + buffer;

        for record in overlapping {
            if record.priority.is_bumpable() {
                match self
                    .store
                    .update_status(&record.id, MaintenanceStatus::Postponed, record.revision)
                {
                    Ok(()) => {
                        tracing::info!(record_id = %record.id, priority = %record.priority, "记录已顺延");
                        self.sink.emit(MaintenanceEvent::for_record(
                            MaintenanceEventType::RecordPostponed,
                            resource_id,
                            &record.id,
                            Some(interval),
                        ));
                        result.preempted_record_ids.push(record.id);
                    }
                    Err(e) => {
                        tracing::warn!(record_id = %record.id, error = %e, "顺延记录失败");
                        result.failures.push(PreemptionFailure {
                            record_id: record.id,
                            action: PreemptionAction::Postpone,
                            error: e.to_string(),
                        });
                    }
                }
                continue;
            }

            let previous = match record.scheduled_interval() {
                Ok(previous) => previous,
                Err(e) => {
                    result.failures.push(PreemptionFailure {
                        record_id: record.id,
                        action: PreemptionAction::Reschedule,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let adjusted = previous.shifted_to(next_start);

            match self
                .store
                .update_interval(&record.id, adjusted, record.revision)
            {
                Ok(()) => {
                    tracing::info!(
                        record_id = %record.id,
                        previous = %previous,
                        adjusted = %adjusted,
                        "记录已顺移"
                    );
                    self.sink.emit(MaintenanceEvent::for_record(
                        MaintenanceEventType::RecordRescheduled,
                        resource_id,
                        &record.id,
                        Some(adjusted),
                    ));
                    next_start = adjusted.end() + buffer;
                    result.adjusted_record_ids.push(record.id.clone());
                    result.adjustments.push(AdjustedRecord {
                        record_id: record.id,
                        previous,
                        adjusted,
                    });
                }
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "顺移记录失败");
                    result.failures.push(PreemptionFailure {
                        record_id: record.id,
                        action: PreemptionAction::Reschedule,
                        error: e.to_string(),
                    });
                }
            }
        }

        // 顺移后新区间上的后续冲突（仅提示）
        for adjustment in &result.adjustments {
            match self.detector.detect_conflicts(
                resource_id,
                adjustment.adjusted.start(),
                adjustment.adjusted.end(),
                Some(&adjustment.record_id),
            ) {
                Ok(Some(conflict)) => result.follow_on_conflicts.push(conflict),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(record_id = %adjustment.record_id, error = %e, "后续冲突检测失败")
                }
            }
        }

        self.sink.emit(
            MaintenanceEvent::for_resource(MaintenanceEventType::UrgentSlotGranted, resource_id, Some(interval))
                .with_detail(request.label()),
        );

        tracing::info!(
            preempted = result.preempted_record_ids.len(),
            adjusted = result.adjusted_record_ids.len(),
            failures = result.failures.len(),
            follow_on = result.follow_on_conflicts.len(),
            "紧急抢占完成"
        );

        Ok(result)
    }
}
