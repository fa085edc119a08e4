// ==========================================
// 轮值工作流引擎 - 入组申请仓储
// ==========================================
// 批准申请与创建成员在同一事务内完成
// ==========================================

use crate::db::Database;
use crate::domain::member::Member;
use crate::domain::request::{Request, RequestWithUser};
use crate::domain::types::RequestStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::member_repo::insert_member;
use crate::repository::sql_utils::{
    fmt_datetime, get_datetime, get_enum, get_uuid, resolve_cas_miss, WhereBuilder,
};
use crate::repository::user_repo::map_user_at;
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<Request>;

    async fn create(&self, request: &Request) -> RepositoryResult<()>;

    /// 用户对某轮值的全部申请 (时间升序)
    async fn list_by_user_and_shift(
        &self,
        user_id: Uuid,
        shift_id: Uuid,
    ) -> RepositoryResult<Vec<Request>>;

    /// 管理端: 轮值申请列表 (+可选状态), 附用户资料
    async fn list_with_users(
        &self,
        shift_id: Uuid,
        status: Option<RequestStatus>,
    ) -> RepositoryResult<Vec<RequestWithUser>>;

    /// 状态 CAS
    async fn transition_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> RepositoryResult<()>;

    /// 事务: CAS from → Approved + 写入成员
    async fn approve_with_member(
        &self,
        id: Uuid,
        from: RequestStatus,
        member: &Member,
    ) -> RepositoryResult<()>;
}

pub struct SqliteRequestRepository {
    db: Database,
}

impl SqliteRequestRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const REQUEST_COLUMNS: &str = "q.id, q.user_id, q.shift_id, q.status, q.created_at";

fn map_request(row: &Row) -> rusqlite::Result<Request> {
    Ok(Request {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        shift_id: get_uuid(row, 2)?,
        status: get_enum(row, 3, "RequestStatus", RequestStatus::from_db_str)?,
        created_at: get_datetime(row, 4)?,
    })
}

fn cas_request_status(
    conn: &Connection,
    id: &str,
    from: RequestStatus,
    to: RequestStatus,
) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE requests SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to.as_db_str(), id, from.as_db_str()],
    )?;
    if rows == 0 {
        return Err(resolve_cas_miss(
            conn,
            "requests",
            "Request",
            id,
            from.as_db_str(),
            to.as_db_str(),
        ));
    }
    Ok(())
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Request> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {} FROM requests q WHERE q.id = ?1", REQUEST_COLUMNS);
                conn.query_row(&sql, params![id.to_string()], map_request)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("Request", id))
            })
            .await
    }

    async fn create(&self, request: &Request) -> RepositoryResult<()> {
        let request = request.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO requests (id, user_id, shift_id, status, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        request.id.to_string(),
                        request.user_id.to_string(),
                        request.shift_id.to_string(),
                        request.status.as_db_str(),
                        fmt_datetime(request.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn list_by_user_and_shift(
        &self,
        user_id: Uuid,
        shift_id: Uuid,
    ) -> RepositoryResult<Vec<Request>> {
        self.db
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM requests q WHERE q.user_id = ?1 AND q.shift_id = ?2 ORDER BY q.created_at ASC",
                    REQUEST_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let requests = stmt
                    .query_map(params![user_id.to_string(), shift_id.to_string()], map_request)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(requests)
            })
            .await
    }

    async fn list_with_users(
        &self,
        shift_id: Uuid,
        status: Option<RequestStatus>,
    ) -> RepositoryResult<Vec<RequestWithUser>> {
        let mut builder = WhereBuilder::new();
        builder
            .eq("q.shift_id", Some(shift_id.to_string()))
            .eq("q.status", status.map(|s| s.as_db_str().to_string()));

        self.db
            .call(move |conn| {
                let sql = format!(
                    r#"
                    SELECT {}, u.id, u.name, u.surname, u.date_of_birth, u.city,
                           u.phone_number, u.telegram_id, u.created_at
                      FROM requests q
                      JOIN users u ON u.id = q.user_id{}
                     ORDER BY q.created_at ASC
                    "#,
                    REQUEST_COLUMNS,
                    builder.where_sql()
                );
                let params = builder.into_params();
                let mut stmt = conn.prepare(&sql)?;
                let requests = stmt
                    .query_map(params_from_iter(params.iter()), |row| {
                        Ok(RequestWithUser {
                            request: map_request(row)?,
                            user: map_user_at(row, 5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(requests)
            })
            .await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> RepositoryResult<()> {
        self.db
            .call(move |conn| cas_request_status(conn, &id.to_string(), from, to))
            .await
    }

    async fn approve_with_member(
        &self,
        id: Uuid,
        from: RequestStatus,
        member: &Member,
    ) -> RepositoryResult<()> {
        let member = member.clone();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                cas_request_status(&tx, &id.to_string(), from, RequestStatus::Approved)?;
                insert_member(&tx, &member)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }
}
