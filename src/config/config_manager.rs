// ==========================================
// 轮值工作流引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::db::Database;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置值非法 (key={key}, value={value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("未知配置项: {0}")]
    UnknownKey(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Clone)]
pub struct ConfigManager {
    db: Database,
}

impl ConfigManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub async fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let key = key.to_string();
        let value = self
            .db
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM config_kv WHERE key = ?1",
                        params![key],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    /// 写入配置值 (校验后 UPSERT)
    pub async fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        validate(key, value)?;
        let (k, v) = (key.to_string(), value.trim().to_string());
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                    params![k, v],
                )?;
                Ok(())
            })
            .await?;
        info!(key, value, "配置已更新");
        Ok(())
    }

    /// 所有已覆写配置的快照
    pub async fn get_config_snapshot(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let snapshot = self
            .db
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(snapshot)
    }

    async fn get_u32_or_default(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        match self.get_config_value(key).await? {
            Some(raw) => parse_u32(key, &raw),
            None => Ok(default),
        }
    }
}

fn parse_u32(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
}

fn validate(key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        config_keys::EXCLUSION_TASK_AMOUNT | config_keys::REPORT_GRACE_DAYS => {
            parse_u32(key, value).map(|_| ())
        }
        config_keys::LOCALE => {
            if config_keys::SUPPORTED_LOCALES.contains(&value.trim()) {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    message: format!("支持的语言: {}", config_keys::SUPPORTED_LOCALES.join(", ")),
                })
            }
        }
        other => Err(ConfigError::UnknownKey(other.to_string())),
    }
}

// ==========================================
// WorkflowConfigReader Trait 实现
// ==========================================
#[async_trait]
impl WorkflowConfigReader for ConfigManager {
    async fn get_exclusion_task_amount(&self) -> Result<u32, ConfigError> {
        self.get_u32_or_default(config_keys::EXCLUSION_TASK_AMOUNT, 5)
            .await
    }

    async fn get_report_grace_days(&self) -> Result<u32, ConfigError> {
        self.get_u32_or_default(config_keys::REPORT_GRACE_DAYS, 0).await
    }

    async fn get_locale(&self) -> Result<String, ConfigError> {
        let value = self.get_config_value(config_keys::LOCALE).await?;
        match value {
            Some(locale) => {
                validate(config_keys::LOCALE, &locale)?;
                Ok(locale.trim().to_string())
            }
            None => Ok("ru".to_string()),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 淘汰
    pub const EXCLUSION_TASK_AMOUNT: &str = "exclusion_task_amount";

    // 报告逾期
    pub const REPORT_GRACE_DAYS: &str = "report_grace_days";

    // 通知语言
    pub const LOCALE: &str = "locale";
    pub const SUPPORTED_LOCALES: [&str; 2] = ["ru", "en"];
}
