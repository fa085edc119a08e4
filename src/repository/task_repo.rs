// ==========================================
// 轮值工作流引擎 - 任务目录仓储
// ==========================================

use crate::db::Database;
use crate::domain::task::Task;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::get_uuid;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<Task>;

    async fn create(&self, task: &Task) -> RepositoryResult<()>;

    /// 任务目录 (include_archived=false 时仅返回可派发任务)
    async fn list(&self, include_archived: bool) -> RepositoryResult<Vec<Task>>;

    async fn set_archived(&self, id: Uuid, archived: bool) -> RepositoryResult<()>;
}

pub struct SqliteTaskRepository {
    db: Database,
}

impl SqliteTaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn map_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: get_uuid(row, 0)?,
        description: row.get(1)?,
        url: row.get(2)?,
        is_archived: row.get(3)?,
    })
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Task> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, description, url, is_archived FROM tasks WHERE id = ?1",
                    params![id.to_string()],
                    map_task,
                )
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("Task", id))
            })
            .await
    }

    async fn create(&self, task: &Task) -> RepositoryResult<()> {
        let task = task.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tasks (id, description, url, is_archived) VALUES (?1, ?2, ?3, ?4)",
                    params![task.id.to_string(), task.description, task.url, task.is_archived],
                )?;
                Ok(())
            })
            .await
    }

    async fn list(&self, include_archived: bool) -> RepositoryResult<Vec<Task>> {
        self.db
            .call(move |conn| {
                let sql = if include_archived {
                    "SELECT id, description, url, is_archived FROM tasks ORDER BY description ASC"
                } else {
                    "SELECT id, description, url, is_archived FROM tasks WHERE is_archived = 0 ORDER BY description ASC"
                };
                let mut stmt = conn.prepare(sql)?;
                let tasks = stmt
                    .query_map([], map_task)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(tasks)
            })
            .await
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> RepositoryResult<()> {
        self.db
            .call(move |conn| {
                let rows = conn.execute(
                    "UPDATE tasks SET is_archived = ?1 WHERE id = ?2",
                    params![archived, id.to_string()],
                )?;
                if rows == 0 {
                    return Err(RepositoryError::not_found("Task", id));
                }
                Ok(())
            })
            .await
    }
}
