// ==========================================
// 轮值工作流引擎 - 引擎层
// ==========================================
// 职责: 实现工作流状态机与规则, 不拼 SQL
// 红线: Engine 只依赖仓储 trait 与通知网关 trait
// ==========================================

pub mod enrollment;
pub mod error;
pub mod member_exclusion;
pub mod notification;
pub mod report_review;
pub mod repositories;
pub mod shift_lifecycle;
pub mod task_assignment;

// 重导出核心引擎
pub use enrollment::EnrollmentWorkflow;
pub use error::{WorkflowError, WorkflowResult};
pub use member_exclusion::{exclusion_window, ExclusionOutcome, MemberExclusionEvaluator};
pub use notification::{
    NoOpNotificationGateway, NotificationDispatcher, NotificationError, NotificationEvent,
    NotificationGateway, TracingNotificationGateway,
};
pub use report_review::ReportReviewWorkflow;
pub use repositories::WorkflowRepositories;
pub use shift_lifecycle::{
    DailyTickReport, DailyTickSummary, ShiftCancelOutcome, ShiftLifecycleManager,
    ShiftStartOutcome, ShiftTickFailure,
};
pub use task_assignment::{
    AssignmentBatch, AssignmentOutcome, AssignmentPlan, PlannedAssignment, TaskAssignmentEngine,
};
