// ==========================================
// 轮值工作流引擎 - 用户数据仓储
// ==========================================

use crate::db::Database;
use crate::domain::user::User;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{fmt_date, fmt_datetime, get_date, get_datetime, get_uuid};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<User>;

    async fn create(&self, user: &User) -> RepositoryResult<()>;

    /// 更新资料字段 (telegram_id 与创建时间不可变)
    async fn update_profile(&self, user: &User) -> RepositoryResult<()>;

    async fn get_by_telegram_id(&self, telegram_id: i64) -> RepositoryResult<Option<User>>;
}

pub struct SqliteUserRepository {
    db: Database,
}

impl SqliteUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, name, surname, date_of_birth, city, phone_number, telegram_id, created_at";

/// 从 `offset` 列开始映射用户 (联表查询复用)
pub(crate) fn map_user_at(row: &Row, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, offset)?,
        name: row.get(offset + 1)?,
        surname: row.get(offset + 2)?,
        date_of_birth: get_date(row, offset + 3)?,
        city: row.get(offset + 4)?,
        phone_number: row.get(offset + 5)?,
        telegram_id: row.get(offset + 6)?,
        created_at: get_datetime(row, offset + 7)?,
    })
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    map_user_at(row, 0)
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<User> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                conn.query_row(&sql, params![id.to_string()], map_user)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("User", id))
            })
            .await
    }

    async fn create(&self, user: &User) -> RepositoryResult<()> {
        let user = user.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users (
                        id, name, surname, date_of_birth, city, phone_number, telegram_id, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        user.id.to_string(),
                        user.name,
                        user.surname,
                        fmt_date(user.date_of_birth),
                        user.city,
                        user.phone_number,
                        user.telegram_id,
                        fmt_datetime(user.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn update_profile(&self, user: &User) -> RepositoryResult<()> {
        let user = user.clone();
        self.db
            .call(move |conn| {
                let rows = conn.execute(
                    r#"
                    UPDATE users
                       SET name = ?1, surname = ?2, date_of_birth = ?3, city = ?4, phone_number = ?5
                     WHERE id = ?6
                    "#,
                    params![
                        user.name,
                        user.surname,
                        fmt_date(user.date_of_birth),
                        user.city,
                        user.phone_number,
                        user.id.to_string(),
                    ],
                )?;
                if rows == 0 {
                    return Err(RepositoryError::not_found("User", user.id));
                }
                Ok(())
            })
            .await
    }

    async fn get_by_telegram_id(&self, telegram_id: i64) -> RepositoryResult<Option<User>> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS);
                let user = conn.query_row(&sql, params![telegram_id], map_user).optional()?;
                Ok(user)
            })
            .await
    }
}
