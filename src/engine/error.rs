// ==========================================
// 轮值工作流引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 工作流错误属于"局部决策失败", 原样返回给调用方
// 基础设施错误 (Repository) 不在引擎层重试
// ==========================================

use crate::config::ConfigError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 工作流错误类型
#[derive(Error, Debug)]
pub enum WorkflowError {
    // ===== 决策失败 =====
    #[error("记录未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    /// 当前状态不允许目标迁移
    #[error("非法状态迁移: {entity}(id={id}) current={current}, attempted={attempted}")]
    InvalidState {
        entity: String,
        id: String,
        current: String,
        attempted: String,
    },

    /// 任务池耗尽 (可恢复: 当日跳过该成员)
    #[error("无可派发任务: member_id={member_id}")]
    NoEligibleTask { member_id: String },

    /// 存在未结束的报告, 无法结束轮值
    #[error("存在待处理报告, 无法结束轮值: shift_id={shift_id}, open_reports={open_reports}")]
    PendingReviews { shift_id: String, open_reports: i64 },

    /// 报告已处于终态
    #[error("报告已审核完毕: report_id={report_id}, status={status}")]
    AlreadyReviewed { report_id: String, status: String },

    #[error("参数校验失败: {0}")]
    Validation(String),

    // ===== 基础设施 =====
    #[error(transparent)]
    Repository(RepositoryError),
}

impl WorkflowError {
    pub fn invalid_state(
        entity: &str,
        id: impl ToString,
        current: impl ToString,
        attempted: impl ToString,
    ) -> Self {
        WorkflowError::InvalidState {
            entity: entity.to_string(),
            id: id.to_string(),
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// 是否为可恢复的批处理错误 (批量派发时仅跳过该成员)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WorkflowError::NoEligibleTask { .. })
    }
}

// CAS 冲突即"并发下的非法迁移": 失败方看到的是胜出方留下的状态
impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            RepositoryError::StatusConflict {
                entity,
                id,
                actual,
                attempted,
                ..
            } => WorkflowError::InvalidState {
                entity,
                id,
                current: actual,
                attempted,
            },
            other => WorkflowError::Repository(other),
        }
    }
}

impl From<ConfigError> for WorkflowError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Repository(e) => e.into(),
            other => WorkflowError::Validation(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
