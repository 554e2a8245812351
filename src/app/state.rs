// ==========================================
// 机位维护排程系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享资源和排程门面
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::directory::{ResourceDirectory, StaticResourceDirectory};
use crate::engine::events::NotificationSink;
use crate::engine::scheduler::MaintenanceScheduler;
use crate::repository::maintenance_repo::MaintenanceRecordRepository;

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 维护记录仓储
    pub record_repo: Arc<MaintenanceRecordRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 排程门面
    pub scheduler: Arc<MaintenanceScheduler>,
}

impl AppState {
    /// 创建应用状态
    ///
    /// # 参数
    /// - db_path: 数据库路径（不存在时自动建表）
    /// - directory: 技术人员/设备目录
    /// - sink: 排程事件发送者
    pub async fn new(
        db_path: String,
        directory: Arc<dyn ResourceDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        init_schema(&conn).context("初始化数据库表结构失败")?;
        let conn = Arc::new(Mutex::new(conn));

        // 仓储与配置共享同一连接
        let record_repo = Arc::new(MaintenanceRecordRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn)?);

        let scheduler = MaintenanceScheduler::from_reader(
            record_repo.clone(),
            directory,
            sink,
            config_manager.as_ref(),
        )
        .await?;

        tracing::info!(
            search_horizon_days = scheduler.config().search_horizon_days,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            record_repo,
            config_manager,
            scheduler: Arc::new(scheduler),
        })
    }
}

/// 加载资源目录
///
/// 未提供名册文件时使用占位目录（任意技能/设备均可用）
pub fn load_resource_directory(roster_path: Option<&Path>) -> anyhow::Result<Arc<dyn ResourceDirectory>> {
    match roster_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取资源名册: {}", path.display()))?;
            let directory = StaticResourceDirectory::from_json_str(&raw)
                .with_context(|| format!("资源名册格式错误: {}", path.display()))?;
            Ok(Arc::new(directory))
        }
        None => {
            tracing::warn!("未配置资源名册，使用占位目录");
            Ok(Arc::new(StaticResourceDirectory::placeholder()))
        }
    }
}

/// 获取默认数据库路径
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("STAND_MAINTENANCE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./stand_maintenance.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("stand-maintenance");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("stand_maintenance.db");
        }
    }

    path.to_string_lossy().to_string()
}
