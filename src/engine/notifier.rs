// ==========================================
// 机位维护排程系统 - 通知分发中心
// ==========================================
// 职责: 将引擎 emit 的事件异步分发给各监听者
// 模型: tokio 无界通道 → 分发任务 → 每个监听者独立通道 + 独立任务
// 红线: 单个监听者出错/panic 不影响其他监听者，也不影响排程调用
// ==========================================

use crate::engine::events::{MaintenanceEvent, NotificationSink};
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ==========================================
// NotificationListener Trait
// ==========================================
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// 监听者名称（日志用）
    fn name(&self) -> &str;

    /// 处理单个事件
    async fn on_event(&self, event: &MaintenanceEvent) -> anyhow::Result<()>;
}

enum HubMessage {
    Event(MaintenanceEvent),
    Shutdown,
}

// ==========================================
// ChannelNotificationSink - 引擎侧发送端
// ==========================================
#[derive(Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<HubMessage>,
}

impl NotificationSink for ChannelNotificationSink {
    fn emit(&self, event: MaintenanceEvent) {
        let event_type = event.event_type;
        if self.tx.send(HubMessage::Event(event)).is_err() {
            tracing::debug!(
                event_type = event_type.as_str(),
                "通知中心已关闭，丢弃事件"
            );
        }
    }
}

// ==========================================
// NotificationHub - 通知分发中心
// ==========================================
pub struct NotificationHub {
    tx: mpsc::UnboundedSender<HubMessage>,
    dispatcher: Option<JoinHandle<()>>,
}

impl NotificationHub {
    /// 启动分发中心
    ///
    /// # 注意
    /// - 必须在 tokio runtime 上下文中调用
    pub fn start(listeners: Vec<Arc<dyn NotificationListener>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(Self::dispatch(rx, listeners));

        Self {
            tx,
            dispatcher: Some(dispatcher),
        }
    }

    /// 获取可注入引擎的发送端
    pub fn sink(&self) -> ChannelNotificationSink {
        ChannelNotificationSink {
            tx: self.tx.clone(),
        }
    }

    /// 关闭分发中心
    ///
    /// 已入队的事件会先投递完毕，再等待全部监听者任务退出
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(HubMessage::Shutdown);
        if let Some(handle) = self.dispatcher.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "通知分发任务异常退出");
            }
        }
    }

    async fn dispatch(
        mut rx: mpsc::UnboundedReceiver<HubMessage>,
        listeners: Vec<Arc<dyn NotificationListener>>,
    ) {
        let mut senders = Vec::with_capacity(listeners.len());
        let mut handles = Vec::with_capacity(listeners.len());

        for listener in listeners {
            let (listener_tx, listener_rx) = mpsc::unbounded_channel::<MaintenanceEvent>();
            senders.push(listener_tx);
            handles.push(tokio::spawn(Self::run_listener(listener, listener_rx)));
        }

        while let Some(message) = rx.recv().await {
            match message {
                HubMessage::Event(event) => {
                    for sender in &senders {
                        // 监听者任务已退出时忽略
                        let _ = sender.send(event.clone());
                    }
                }
                HubMessage::Shutdown => break,
            }
        }

        drop(senders);
        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "监听者任务异常退出");
            }
        }
    }

    async fn run_listener(
        listener: Arc<dyn NotificationListener>,
        mut rx: mpsc::UnboundedReceiver<MaintenanceEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            let outcome = AssertUnwindSafe(listener.on_event(&event))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    listener = listener.name(),
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "监听者处理事件失败"
                ),
                Err(_) => tracing::warn!(
                    listener = listener.name(),
                    event_type = event.event_type.as_str(),
                    "监听者处理事件时 panic"
                ),
            }
        }
    }
}
