// ==========================================
// 机位维护排程系统 - 资源分配引擎
// ==========================================
// 职责: 为请求的每项技能/设备需求在目录中查找可用资源
// 输入: 排程请求 + 选定区间
// 输出: AllocationPlan（逐项 Allocated / Unmet）
// 红线: 目录异常只影响单项需求，不使整次分配失败
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::MaintenanceScheduleRequest;
use crate::domain::schedule::{AllocationOutcome, AllocationPlan, ResourceAllocation, UnmetReason};
use crate::domain::types::{Availability, ResourceType};
use crate::engine::directory::{DirectoryError, ResourceDirectory};
use crate::engine::error::{SchedulingError, SchedulingResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ResourceAllocator - 资源分配引擎
// ==========================================
pub struct ResourceAllocator {
    directory: Arc<dyn ResourceDirectory>,
    config: SchedulerConfig,
}

impl ResourceAllocator {
    pub fn new(directory: Arc<dyn ResourceDirectory>, config: SchedulerConfig) -> Self {
        Self { directory, config }
    }

    /// 为请求分配技术人员与设备
    ///
    /// # 说明
    /// - 技能需求查询 TECHNICIAN，设备需求查询 EQUIPMENT
    /// - 成本 = 小时费率 × 区间时长（小时）
    #[instrument(skip_all, fields(resource_id = %request.resource_id))]
    pub fn allocate(
        &self,
        request: &MaintenanceScheduleRequest,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulingResult<AllocationPlan> {
        let interval = TimeInterval::new(start, end)?;

        let requirements = request
            .required_skills
            .iter()
            .map(|tag| (ResourceType::Technician, tag))
            .chain(
                request
                    .required_equipment
                    .iter()
                    .map(|tag| (ResourceType::Equipment, tag)),
            );

        let outcomes: Vec<AllocationOutcome> = requirements
            .map(|(kind, tag)| self.allocate_one(kind, tag, &interval))
            .collect();

        let plan = AllocationPlan { outcomes };
        if !plan.is_complete() {
            tracing::warn!(
                unmet = ?plan.unmet_requirements(),
                "部分资源需求未满足"
            );
        }
        Ok(plan)
    }

    fn allocate_one(&self, kind: ResourceType, tag: &str, interval: &TimeInterval) -> AllocationOutcome {
        let unmet = |reason: UnmetReason| AllocationOutcome::Unmet {
            requirement: tag.to_string(),
            resource_type: kind,
            reason,
        };

        match self.directory.find_available(kind, tag, interval) {
            Ok(Some(handle)) if handle.availability != Availability::Unavailable => {
                let rate = handle
                    .hourly_rate
                    .unwrap_or_else(|| self.default_rate(kind));
                AllocationOutcome::Allocated(ResourceAllocation {
                    resource_id: handle.resource_id,
                    resource_type: kind,
                    requirement: tag.to_string(),
                    interval: *interval,
                    cost: rate * interval.duration_hours(),
                    availability: handle.availability,
                })
            }
            Ok(_) => unmet(UnmetReason::NoMatch),
            Err(DirectoryError::Timeout) => {
                tracing::warn!(requirement = tag, kind = %kind, "资源目录查询超时");
                unmet(UnmetReason::Timeout)
            }
            Err(DirectoryError::Unavailable(e)) => {
                tracing::warn!(requirement = tag, kind = %kind, error = %e, "资源目录查询失败");
                unmet(UnmetReason::DirectoryError)
            }
        }
    }

    fn default_rate(&self, kind: ResourceType) -> f64 {
        match kind {
            ResourceType::Technician => self.config.technician_hourly_rate,
            ResourceType::Equipment => self.config.equipment_hourly_rate,
        }
    }
}

impl AllocationPlan {
    /// 严格模式: 存在未满足需求时返回 PartialAllocationFailure
    pub fn into_strict(self) -> SchedulingResult<AllocationPlan> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(SchedulingError::PartialAllocationFailure {
                unmet: self.unmet_requirements(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Priority;
    use crate::engine::directory::{ResourceHandle, StaticResourceDirectory};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    struct FlakyDirectory;

    impl ResourceDirectory for FlakyDirectory {
        fn find_available(
            &self,
            kind: ResourceType,
            tag: &str,
            _interval: &TimeInterval,
        ) -> Result<Option<ResourceHandle>, DirectoryError> {
            match tag {
                "slow" => Err(DirectoryError::Timeout),
                "broken" => Err(DirectoryError::Unavailable("down".to_string())),
                "missing" => Ok(None),
                _ => Ok(Some(ResourceHandle {
                    resource_id: format!("R-{}", tag),
                    resource_type: kind,
                    hourly_rate: Some(40.0),
                    availability: Availability::Partial,
                })),
            }
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap()
    }

    fn request(skills: &[&str], equipment: &[&str]) -> MaintenanceScheduleRequest {
        MaintenanceScheduleRequest {
            reference: None,
            resource_id: "S1".to_string(),
            organization_id: "ORG1".to_string(),
            maintenance_type: "INSPECTION".to_string(),
            priority: Priority::Medium,
            scheduled_start: at(10),
            scheduled_end: at(12),
            required_skills: skills.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            required_equipment: equipment.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            estimated_cost: 0.0,
            constraints: None,
        }
    }

    #[test]
    fn test_placeholder_directory_uses_default_rates() {
        let allocator = ResourceAllocator::new(
            Arc::new(StaticResourceDirectory::placeholder()),
            SchedulerConfig::default(),
        );
        let plan = allocator
            .allocate(&request(&["electrical"], &["lift"]), at(10), at(12))
            .unwrap();

        assert!(plan.is_complete());
        assert_eq!(plan.allocations().len(), 2);
        // 技术人员 100×2 + 设备 50×2
        assert_eq!(plan.total_cost(), 300.0);
    }

    #[test]
    fn test_directory_failures_become_unmet() {
        let allocator = ResourceAllocator::new(Arc::new(FlakyDirectory), SchedulerConfig::default());
        let plan = allocator
            .allocate(&request(&["slow", "welding"], &["broken", "missing"]), at(10), at(12))
            .unwrap();

        assert!(!plan.is_complete());
        assert_eq!(plan.allocations().len(), 1);
        assert_eq!(plan.allocations()[0].availability, Availability::Partial);
        assert_eq!(plan.total_cost(), 80.0);

        let reasons: Vec<UnmetReason> = plan
            .outcomes
            .iter()
            .filter_map(|o| match o {
                AllocationOutcome::Unmet { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![UnmetReason::Timeout, UnmetReason::DirectoryError, UnmetReason::NoMatch]
        );

        assert!(matches!(
            plan.into_strict(),
            Err(SchedulingError::PartialAllocationFailure { unmet }) if unmet.len() == 3
        ));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let allocator = ResourceAllocator::new(
            Arc::new(StaticResourceDirectory::placeholder()),
            SchedulerConfig::default(),
        );
        assert!(matches!(
            allocator.allocate(&request(&[], &[]), at(12), at(10)),
            Err(SchedulingError::InvalidInterval(_))
        ));
    }
}
