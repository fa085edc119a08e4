// ==========================================
// 轮值工作流引擎 - 工作流配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口 (不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkflowConfigReader Trait
// ==========================================
// 实现者: ConfigManager (从 config_kv 表读取)
#[async_trait]
pub trait WorkflowConfigReader: Send + Sync {
    /// 淘汰阈值: 连续缺交天数
    ///
    /// # 默认值
    /// - 5
    async fn get_exclusion_task_amount(&self) -> Result<u32, ConfigError>;

    /// 报告宽限天数 (task_date 早于 today - grace 的 Waiting 报告将被跳过)
    ///
    /// # 默认值
    /// - 0
    async fn get_report_grace_days(&self) -> Result<u32, ConfigError>;

    /// 通知语言
    ///
    /// # 默认值
    /// - ru
    async fn get_locale(&self) -> Result<String, ConfigError>;

    /// 一次读取全部工作流配置
    async fn load_settings(&self) -> Result<WorkflowSettings, ConfigError> {
        Ok(WorkflowSettings {
            exclusion_task_amount: self.get_exclusion_task_amount().await?,
            report_grace_days: self.get_report_grace_days().await?,
            locale: self.get_locale().await?,
        })
    }
}

/// 工作流配置快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub exclusion_task_amount: u32,
    pub report_grace_days: u32,
    pub locale: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            exclusion_task_amount: 5,
            report_grace_days: 0,
            locale: "ru".to_string(),
        }
    }
}

/// 固定配置 (测试与嵌入式使用)
#[async_trait]
impl WorkflowConfigReader for WorkflowSettings {
    async fn get_exclusion_task_amount(&self) -> Result<u32, ConfigError> {
        Ok(self.exclusion_task_amount)
    }

    async fn get_report_grace_days(&self) -> Result<u32, ConfigError> {
        Ok(self.report_grace_days)
    }

    async fn get_locale(&self) -> Result<String, ConfigError> {
        Ok(self.locale.clone())
    }
}
