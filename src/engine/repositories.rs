// ==========================================
// 轮值工作流引擎 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合工作流组件所需的所有 Repository
// ==========================================

use std::sync::Arc;

use crate::db::Database;
use crate::repository::{
    MemberRepository, ReportRepository, RequestRepository, ShiftRepository,
    SqliteMemberRepository, SqliteReportRepository, SqliteRequestRepository,
    SqliteShiftRepository, SqliteTaskRepository, SqliteUserRepository, TaskRepository,
    UserRepository,
};

/// 工作流仓储集合
///
/// 各组件只依赖 trait 对象, 测试时可整体替换
#[derive(Clone)]
pub struct WorkflowRepositories {
    pub shifts: Arc<dyn ShiftRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub requests: Arc<dyn RequestRepository>,
}

impl WorkflowRepositories {
    /// 基于同一 SQLite 连接构建全部仓储
    pub fn sqlite(db: &Database) -> Self {
        Self {
            shifts: Arc::new(SqliteShiftRepository::new(db.clone())),
            members: Arc::new(SqliteMemberRepository::new(db.clone())),
            users: Arc::new(SqliteUserRepository::new(db.clone())),
            tasks: Arc::new(SqliteTaskRepository::new(db.clone())),
            reports: Arc::new(SqliteReportRepository::new(db.clone())),
            requests: Arc::new(SqliteRequestRepository::new(db.clone())),
        }
    }
}
