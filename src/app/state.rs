// ==========================================
// 轮值工作流引擎 - 应用状态
// ==========================================
// 职责: 装配仓储/引擎/API, 管理共享资源
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::api::{CatalogApi, ConfigApi, EnrollmentApi, ReportApi, ShiftApi};
use crate::config::{ConfigManager, WorkflowConfigReader};
use crate::db::Database;
use crate::engine::{
    EnrollmentWorkflow, NotificationDispatcher, NotificationGateway, ShiftLifecycleManager,
    WorkflowRepositories,
};
use crate::repository::RepositoryResult;

/// 默认数据库路径的环境变量
pub const DB_PATH_ENV: &str = "SHIFT_WORKFLOW_DB";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    pub db: Database,
    pub config: Arc<ConfigManager>,
    pub lifecycle: Arc<ShiftLifecycleManager>,

    pub shift_api: Arc<ShiftApi>,
    pub report_api: Arc<ReportApi>,
    pub enrollment_api: Arc<EnrollmentApi>,
    pub catalog_api: Arc<CatalogApi>,
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 从已打开的数据库装配
    ///
    /// # 参数
    /// - db: 数据库句柄 (schema 已初始化)
    /// - gateway: 通知网关
    pub fn new(db: Database, gateway: Arc<dyn NotificationGateway>) -> Self {
        let repos = WorkflowRepositories::sqlite(&db);
        let notifier = NotificationDispatcher::new(gateway);
        let config = Arc::new(ConfigManager::new(db.clone()));
        let config_reader: Arc<dyn WorkflowConfigReader> = config.clone();

        let lifecycle = Arc::new(ShiftLifecycleManager::new(
            repos.clone(),
            config_reader,
            notifier.clone(),
        ));
        let enrollment = Arc::new(EnrollmentWorkflow::new(repos.clone(), notifier));

        Self {
            shift_api: Arc::new(ShiftApi::new(lifecycle.clone())),
            report_api: Arc::new(ReportApi::new(lifecycle.review().clone())),
            enrollment_api: Arc::new(EnrollmentApi::new(enrollment, repos.users.clone())),
            catalog_api: Arc::new(CatalogApi::new(repos.users.clone(), repos.tasks.clone())),
            config_api: Arc::new(ConfigApi::new(config.clone())),
            db,
            config,
            lifecycle,
        }
    }

    /// 打开数据库文件并装配
    pub fn open(db_path: &str, gateway: Arc<dyn NotificationGateway>) -> RepositoryResult<Self> {
        let db = Database::open(db_path)?;
        info!(db_path, "应用状态已初始化");
        Ok(Self::new(db, gateway))
    }
}

/// 获取默认数据库路径
///
/// 优先读取环境变量, 其次使用用户数据目录, 最后回退到当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./shift-workflow.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shift-workflow");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("shift-workflow.db");
        }
    }
    path.to_string_lossy().to_string()
}
