// ==========================================
// 轮值工作流引擎 - 配置层
// ==========================================
// 职责: 工作流配置读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod workflow_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigError, ConfigManager};
pub use workflow_config_trait::{WorkflowConfigReader, WorkflowSettings};
