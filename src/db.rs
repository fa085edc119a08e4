// ==========================================
// 轮值工作流引擎 - SQLite 连接与 schema
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为 (外键 / busy_timeout)
// - 统一 schema 初始化 (幂等, CREATE IF NOT EXISTS)
// - 将阻塞的 rusqlite 调用放到 tokio 阻塞线程池, 不占用异步工作线程
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 时间戳存储格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    surname TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    city TEXT NOT NULL,
    phone_number TEXT NOT NULL UNIQUE,
    telegram_id INTEGER NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shifts (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    title TEXT NOT NULL,
    final_message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (finished_at >= started_at)
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    description TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL UNIQUE,
    is_archived INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS members (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    shift_id TEXT NOT NULL REFERENCES shifts(id),
    status TEXT NOT NULL,
    numbers_lombaryers INTEGER NOT NULL DEFAULT 0 CHECK (numbers_lombaryers >= 0),
    created_at TEXT NOT NULL,
    UNIQUE (user_id, shift_id)
);

CREATE TABLE IF NOT EXISTS requests (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    shift_id TEXT NOT NULL REFERENCES shifts(id),
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    shift_id TEXT NOT NULL REFERENCES shifts(id),
    member_id TEXT NOT NULL REFERENCES members(id),
    task_id TEXT NOT NULL REFERENCES tasks(id),
    task_date TEXT NOT NULL,
    status TEXT NOT NULL,
    photo_url TEXT,
    uploaded_at TEXT,
    reviewer_id TEXT,
    decline_reason TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (member_id, task_id),
    UNIQUE (member_id, task_date)
);

CREATE INDEX IF NOT EXISTS idx_reports_shift_status ON reports (shift_id, status);
CREATE INDEX IF NOT EXISTS idx_reports_task_date ON reports (task_date);
CREATE INDEX IF NOT EXISTS idx_members_shift_status ON members (shift_id, status);
CREATE INDEX IF NOT EXISTS idx_requests_shift_status ON requests (shift_id, status);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

// ==========================================
// Database - 共享连接句柄
// ==========================================

/// 共享 SQLite 连接
///
/// 所有仓储共用同一连接; 每次访问在阻塞线程池中持锁执行,
/// 因此同一数据库上的写操作天然串行化。
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 打开数据库文件并初始化 schema
    pub fn open(db_path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        configure_sqlite_connection(&conn)?;
        init_schema(&conn)?;
        info!(path = %path.display(), "数据库已打开");
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 内存数据库 (测试/演示)
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        configure_sqlite_connection(&conn)?;
        init_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 在阻塞线程池中执行数据库操作
    pub async fn call<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Connection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            f(&mut guard)
        })
        .await?
    }

    /// 当前 schema 版本
    pub async fn schema_version(&self) -> RepositoryResult<Option<i64>> {
        let version = self
            .call(|conn| Ok(read_schema_version(conn)?))
            .await?;
        debug!(?version, "读取 schema_version");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[tokio::test]
    async fn test_database_call_runs_on_blocking_pool() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM shifts", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(db.schema_version().await.unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
