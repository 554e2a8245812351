// ==========================================
// 机位维护排程系统 - 日志通知监听者
// ==========================================

use crate::engine::events::MaintenanceEvent;
use crate::engine::notifier::NotificationListener;
use async_trait::async_trait;

/// 将排程事件写入日志
pub struct TracingNotificationListener;

#[async_trait]
impl NotificationListener for TracingNotificationListener {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn on_event(&self, event: &MaintenanceEvent) -> anyhow::Result<()> {
        tracing::info!(
            event_type = event.event_type.as_str(),
            resource_id = %event.resource_id,
            record_id = ?event.record_id,
            detail = ?event.detail,
            "排程事件"
        );
        Ok(())
    }
}
