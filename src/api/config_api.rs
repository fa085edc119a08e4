// ==========================================
// 轮值工作流引擎 - 配置管理 API
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigError, ConfigManager, WorkflowConfigReader, WorkflowSettings};

/// 配置项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Repository(e) => e.into(),
            other => ApiError::ValidationError(other.to_string()),
        }
    }
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 已持久化的配置项 (按 key 排序)
    pub async fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let snapshot = self.config_manager.get_config_snapshot().await?;
        Ok(snapshot
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    /// 生效配置 (未设置的项取默认值)
    pub async fn effective_settings(&self) -> ApiResult<WorkflowSettings> {
        Ok(self.config_manager.load_settings().await?)
    }

    /// 更新单个配置 (先校验再写入)
    pub async fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("key不能为空".to_string()));
        }
        self.config_manager.set_config_value(key.trim(), value.trim()).await?;
        Ok(())
    }
}
