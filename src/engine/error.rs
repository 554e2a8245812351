// ==========================================
// 机位维护排程系统 - 引擎层错误类型
// ==========================================
// 职责: 排程操作对调用方暴露的统一错误
// 说明: HTTP 状态码映射由调用方负责
// ==========================================

use crate::config::ConfigError;
use crate::domain::interval::InvalidIntervalError;
use crate::domain::types::Priority;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 排程错误类型
#[derive(Error, Debug)]
pub enum SchedulingError {
    // ===== 输入错误 =====
    #[error("非法时间区间: {0}")]
    InvalidInterval(String),

    #[error("资源或记录不存在: {0}")]
    ResourceNotFound(String),

    #[error("priority scheduling only available for URGENT requests (got {priority})")]
    InvalidPriority { priority: Priority },

    // ===== 排程结果 =====
    #[error("资源 {resource_id} 在搜索范围内无可用时间窗")]
    NoWindowAvailable { resource_id: String },

    #[error("资源需求未全部满足: {}", unmet.join(", "))]
    PartialAllocationFailure { unmet: Vec<String> },

    // ===== 基础设施 =====
    #[error("维护记录存储不可用: {0}")]
    StoreUnavailable(String),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl From<InvalidIntervalError> for SchedulingError {
    fn from(err: InvalidIntervalError) -> Self {
        SchedulingError::InvalidInterval(err.to_string())
    }
}

impl From<RepositoryError> for SchedulingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                SchedulingError::ResourceNotFound(format!("{}: {}", entity, id))
            }
            other => SchedulingError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type SchedulingResult<T> = Result<T, SchedulingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_mapping() {
        let not_found: SchedulingError = RepositoryError::NotFound {
            entity: "MaintenanceRecord".to_string(),
            id: "R1".to_string(),
        }
        .into();
        assert!(matches!(not_found, SchedulingError::ResourceNotFound(ref s) if s.contains("R1")));

        let busy: SchedulingError = RepositoryError::LockError("busy".to_string()).into();
        assert!(matches!(busy, SchedulingError::StoreUnavailable(_)));
    }

    #[test]
    fn test_invalid_priority_message() {
        let err = SchedulingError::InvalidPriority {
            priority: Priority::High,
        };
        assert!(err
            .to_string()
            .contains("priority scheduling only available for URGENT requests"));
    }
}
