// ==========================================
// 项目进度管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换仓储/引擎错误为用户友好的错误消息
// 硬错误: 手动进度状态不允许、手动进度越界、无法识别的状态编码
// ==========================================

use crate::domain::types::UnknownCodeError;
use crate::engine::lifecycle_sync::StatusChangeError;
use crate::engine::manual_override::ManualProgressError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 进度规则错误
    // ==========================================
    /// 当前状态不允许手动设置进度
    #[error("当前状态不允许该操作: {0}")]
    InvalidState(String),

    /// 手动进度超出当前阶段区间
    #[error("进度 {value} 超出允许范围 [{lo}, {hi}]")]
    OutOfRange { lo: i32, hi: i32, value: i32 },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "{}(id={})已被其他操作修改（期望revision={}，实际revision={}）",
                entity, id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("检查约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从引擎错误转换
// ==========================================
impl From<ManualProgressError> for ApiError {
    fn from(err: ManualProgressError) -> Self {
        match err {
            ManualProgressError::InvalidState { .. } => ApiError::InvalidState(err.to_string()),
            ManualProgressError::OutOfRange { lo, hi, value } => {
                ApiError::OutOfRange { lo, hi, value }
            }
        }
    }
}

impl From<StatusChangeError> for ApiError {
    fn from(err: StatusChangeError) -> Self {
        match err {
            StatusChangeError::WrongFamily { .. } => ApiError::InvalidInput(err.to_string()),
            StatusChangeError::FromTerminal { from, to }
            | StatusChangeError::Regression { from, to } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
        }
    }
}

impl From<UnknownCodeError> for ApiError {
    fn from(err: UnknownCodeError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
