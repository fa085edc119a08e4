// ==========================================
// 轮值工作流引擎 - API 层
// ==========================================
// 职责: 面向管理端/机器人的业务接口, 负责参数校验与错误映射
// ==========================================

pub mod catalog_api;
pub mod config_api;
pub mod dto;
pub mod enrollment_api;
pub mod error;
pub mod report_api;
pub mod shift_api;

// 重导出核心类型
pub use catalog_api::CatalogApi;
pub use config_api::{ConfigApi, ConfigItem};
pub use dto::{MemberInfo, NewUser, RequestInfo, ShiftInfo};
pub use enrollment_api::EnrollmentApi;
pub use error::{ApiError, ApiResult};
pub use report_api::ReportApi;
pub use shift_api::ShiftApi;
