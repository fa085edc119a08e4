// ==========================================
// 轮值工作流引擎 - 核心库
// ==========================================
// 系统定位: 志愿者轮值 (Shift) 的成员/任务/报告生命周期管理
// 技术栈: Rust + SQLite + tokio
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "ru");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 工作流状态机
pub mod engine;

// 配置层 - 工作流配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema）
pub mod db;

// 日志系统
pub mod logging;

// 国际化（通知文案）
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MemberStatus, ReportStatus, RequestStatus, ShiftStatus};

// 领域实体
pub use domain::{Member, Report, Request, Shift, Task, User};

// 引擎
pub use engine::{
    EnrollmentWorkflow, MemberExclusionEvaluator, NotificationGateway, ReportReviewWorkflow,
    ShiftLifecycleManager, TaskAssignmentEngine, WorkflowError,
};

// API
pub use api::{CatalogApi, EnrollmentApi, ReportApi, ShiftApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "shift-workflow";
