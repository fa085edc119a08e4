// ==========================================
// 轮值工作流引擎 - 领域模型层
// ==========================================
// 职责: 定义实体、状态类型与值对象
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod member;
pub mod report;
pub mod request;
pub mod shift;
pub mod task;
pub mod types;
pub mod user;

// 重导出核心类型
pub use member::{Member, MemberWithUser};
pub use report::{Report, ReportFilter, ReportSummary, ReportWithTask, ReviewDecision};
pub use request::{Request, RequestWithUser};
pub use shift::{NewShift, Shift, ShiftFilter, ShiftSort, ShiftUpdate, ShiftWithTotalUsers};
pub use task::Task;
pub use types::{MemberStatus, ReportStatus, RequestStatus, ShiftStatus};
pub use user::User;
