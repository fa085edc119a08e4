// ==========================================
// 轮值工作流引擎 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为调用方可理解的错误
// 每个错误对应一个 HTTP 等价状态码
// ==========================================

use crate::engine::error::WorkflowError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 工作流错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: {entity}(id={id}) from={from} to={to}")]
    InvalidStateTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    #[error("存在待审核报告: shift_id={shift_id}, open_reports={open_reports}")]
    PendingReviews { shift_id: String, open_reports: i64 },

    #[error("报告已审核完毕: report_id={report_id}, status={status}")]
    AlreadyReviewed { report_id: String, status: String },

    #[error("无可派发任务: member_id={0}")]
    NoEligibleTask(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP 等价状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::InvalidStateTransition { .. }
            | ApiError::AlreadyReviewed { .. }
            | ApiError::NoEligibleTask(_) => 400,
            ApiError::PendingReviews { .. } | ApiError::BusinessRuleViolation(_) => 409,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::StatusConflict {
                entity,
                id,
                actual,
                attempted,
                ..
            } => ApiError::InvalidStateTransition {
                entity,
                id,
                from: actual,
                to: attempted,
            },
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
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
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            WorkflowError::InvalidState {
                entity,
                id,
                current,
                attempted,
            } => ApiError::InvalidStateTransition {
                entity,
                id,
                from: current,
                to: attempted,
            },
            WorkflowError::NoEligibleTask { member_id } => ApiError::NoEligibleTask(member_id),
            WorkflowError::PendingReviews {
                shift_id,
                open_reports,
            } => ApiError::PendingReviews {
                shift_id,
                open_reports,
            },
            WorkflowError::AlreadyReviewed { report_id, status } => {
                ApiError::AlreadyReviewed { report_id, status }
            }
            WorkflowError::Validation(msg) => ApiError::ValidationError(msg),
            WorkflowError::Repository(err) => err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 解析字符串形式的ID
pub(crate) fn parse_id(field: &str, raw: &str) -> ApiResult<uuid::Uuid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    uuid::Uuid::parse_str(trimmed)
        .map_err(|e| ApiError::InvalidInput(format!("{}格式错误: {}", field, e)))
}
