// ==========================================
// 机位维护排程系统 - 引擎层通知事件
// ==========================================
// 职责: 定义排程通知事件与发送 trait，实现依赖倒置
// 说明: Engine 层只负责 emit，投递方式由调用方注入
// 红线: emit 为发后即忘，投递失败不得影响排程结果
// ==========================================

use crate::domain::interval::TimeInterval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// 通知事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceEventType {
    /// 批量排程为请求选定了时间窗
    ScheduleOptimized,
    /// 请求无法排程
    RequestUnscheduled,
    /// 记录被紧急工单挤出（POSTPONED）
    RecordPostponed,
    /// 记录被紧急工单顺移
    RecordRescheduled,
    /// 紧急工单获得请求时段
    UrgentSlotGranted,
    /// 资源需求未全部满足
    PartialAllocation,
}

impl MaintenanceEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            MaintenanceEventType::ScheduleOptimized => "ScheduleOptimized",
            MaintenanceEventType::RequestUnscheduled => "RequestUnscheduled",
            MaintenanceEventType::RecordPostponed => "RecordPostponed",
            MaintenanceEventType::RecordRescheduled => "RecordRescheduled",
            MaintenanceEventType::UrgentSlotGranted => "UrgentSlotGranted",
            MaintenanceEventType::PartialAllocation => "PartialAllocation",
        }
    }
}

/// 排程通知事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEvent {
    pub event_type: MaintenanceEventType,
    pub resource_id: String,
    /// 受影响的记录ID（请求级事件为 None）
    pub record_id: Option<String>,
    pub interval: Option<TimeInterval>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl MaintenanceEvent {
    /// 创建资源级事件
    pub fn for_resource(
        event_type: MaintenanceEventType,
        resource_id: impl Into<String>,
        interval: Option<TimeInterval>,
    ) -> Self {
        Self {
            event_type,
            resource_id: resource_id.into(),
            record_id: None,
            interval,
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    /// 创建记录级事件
    pub fn for_record(
        event_type: MaintenanceEventType,
        resource_id: impl Into<String>,
        record_id: impl Into<String>,
        interval: Option<TimeInterval>,
    ) -> Self {
        Self {
            record_id: Some(record_id.into()),
            ..Self::for_resource(event_type, resource_id, interval)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// 通知发送 Trait
// ==========================================

/// 通知发送者 Trait
///
/// # 实现说明
/// - `ChannelNotificationSink` 将事件投递到 `NotificationHub`
/// - `NoOpNotificationSink` 丢弃事件
/// - 实现方不得阻塞调用线程，也不得向调用方返回错误
pub trait NotificationSink: Send + Sync {
    fn emit(&self, event: MaintenanceEvent);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn emit(&self, event: MaintenanceEvent) {
        (**self).emit(event)
    }
}

/// 空操作通知发送者
///
/// 用于不需要通知的场景（如单元测试、批处理命令行）
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn emit(&self, event: MaintenanceEvent) {
        tracing::debug!(
            "NoOpNotificationSink: 跳过通知 - resource_id={}, event_type={}",
            event.resource_id,
            event.event_type.as_str()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let event = MaintenanceEvent::for_record(
            MaintenanceEventType::RecordPostponed,
            "S1",
            "R1",
            None,
        )
        .with_detail("URGENT 抢占");

        assert_eq!(event.resource_id, "S1");
        assert_eq!(event.record_id.as_deref(), Some("R1"));
        assert_eq!(event.detail.as_deref(), Some("URGENT 抢占"));
        assert_eq!(event.event_type.as_str(), "RecordPostponed");
    }

    #[test]
    fn test_noop_sink() {
        let sink: Arc<dyn NotificationSink> = Arc::new(NoOpNotificationSink);
        sink.emit(MaintenanceEvent::for_resource(
            MaintenanceEventType::ScheduleOptimized,
            "S1",
            None,
        ));
    }
}
