// ==========================================
// 轮值工作流引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 每个实体一个仓储 trait, 引擎只依赖 trait
// 约束: 所有查询使用参数化, 状态变更一律 CAS
// ==========================================

pub mod error;
pub mod member_repo;
pub mod report_repo;
pub mod request_repo;
pub mod shift_repo;
pub mod sql_utils;
pub mod task_repo;
pub mod user_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use member_repo::{MemberRepository, SqliteMemberRepository};
pub use report_repo::{ReportRepository, SqliteReportRepository};
pub use request_repo::{RequestRepository, SqliteRequestRepository};
pub use shift_repo::{ShiftRepository, SqliteShiftRepository};
pub use task_repo::{SqliteTaskRepository, TaskRepository};
pub use user_repo::{SqliteUserRepository, UserRepository};
