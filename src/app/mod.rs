// ==========================================
// 机位维护排程系统 - 应用层
// ==========================================
// 职责: 组件装配（数据库 / 配置 / 资源目录 / 通知 / 排程门面）
// ==========================================

pub mod listener;
pub mod state;

// 重导出
pub use listener::TracingNotificationListener;
pub use state::{get_default_db_path, load_resource_directory, AppState};
