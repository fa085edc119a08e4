// ==========================================
// 轮值工作流引擎 - 成员数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::Database;
use crate::domain::member::{Member, MemberWithUser};
use crate::domain::types::{MemberStatus, ReportStatus, ShiftStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{
    build_in_clause, fmt_date, fmt_datetime, get_datetime, get_enum, get_uuid, resolve_cas_miss,
    WhereBuilder,
};
use crate::repository::user_repo::map_user_at;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

// ==========================================
// MemberRepository Trait
// ==========================================
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<Member>;

    async fn create(&self, member: &Member) -> RepositoryResult<()>;

    async fn get_by_user_and_shift(
        &self,
        user_id: Uuid,
        shift_id: Uuid,
    ) -> RepositoryResult<Option<Member>>;

    /// 按轮值 (+可选状态) 查询成员
    async fn list_by_shift(
        &self,
        shift_id: Uuid,
        status: Option<MemberStatus>,
    ) -> RepositoryResult<Vec<Member>>;

    /// 按轮值 (+可选状态) 查询成员及用户资料
    async fn list_with_users(
        &self,
        shift_id: Uuid,
        status: Option<MemberStatus>,
    ) -> RepositoryResult<Vec<MemberWithUser>>;

    /// 状态 CAS
    async fn transition_status(
        &self,
        id: Uuid,
        from: MemberStatus,
        to: MemberStatus,
    ) -> RepositoryResult<()>;

    /// 用户在运行中轮值 (Started / ReadyForComplete) 的成员记录
    async fn find_in_running_shift(&self, user_id: Uuid) -> RepositoryResult<Option<Member>>;

    /// 活跃成员中, [from, to] 区间内 Skipped 报告数 >= min_skipped 的成员
    async fn list_with_skipped_at_least(
        &self,
        shift_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        min_skipped: i64,
    ) -> RepositoryResult<Vec<MemberWithUser>>;

    /// 活跃成员中, `date` 当日报告仍为 Waiting 的成员
    async fn list_waiting_on(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<MemberWithUser>>;
}

// ==========================================
// SqliteMemberRepository
// ==========================================
pub struct SqliteMemberRepository {
    db: Database,
}

impl SqliteMemberRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const MEMBER_COLUMNS: &str =
    "m.id, m.user_id, m.shift_id, m.status, m.numbers_lombaryers, m.created_at";

fn map_member(row: &Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        shift_id: get_uuid(row, 2)?,
        status: get_enum(row, 3, "MemberStatus", MemberStatus::from_db_str)?,
        numbers_lombaryers: row.get(4)?,
        created_at: get_datetime(row, 5)?,
    })
}

/// 写入单条成员 (供跨实体事务复用)
pub(crate) fn insert_member(conn: &Connection, member: &Member) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO members (id, user_id, shift_id, status, numbers_lombaryers, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            member.id.to_string(),
            member.user_id.to_string(),
            member.shift_id.to_string(),
            member.status.as_db_str(),
            member.numbers_lombaryers,
            fmt_datetime(member.created_at),
        ],
    )?;
    Ok(())
}

const MEMBER_WITH_USER_SELECT: &str = r#"
    SELECT m.id, m.user_id, m.shift_id, m.status, m.numbers_lombaryers, m.created_at,
           u.id, u.name, u.surname, u.date_of_birth, u.city,
           u.phone_number, u.telegram_id, u.created_at
      FROM members m
      JOIN users u ON u.id = m.user_id
"#;

fn map_member_with_user(row: &Row) -> rusqlite::Result<MemberWithUser> {
    Ok(MemberWithUser {
        member: map_member(row)?,
        user: map_user_at(row, 6)?,
    })
}

fn shift_status_filter(shift_id: Uuid, status: Option<MemberStatus>) -> WhereBuilder {
    let mut builder = WhereBuilder::new();
    builder
        .eq("m.shift_id", Some(shift_id.to_string()))
        .eq("m.status", status.map(|s| s.as_db_str().to_string()));
    builder
}

#[async_trait]
impl MemberRepository for SqliteMemberRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Member> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {} FROM members m WHERE m.id = ?1", MEMBER_COLUMNS);
                conn.query_row(&sql, params![id.to_string()], map_member)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("Member", id))
            })
            .await
    }

    async fn create(&self, member: &Member) -> RepositoryResult<()> {
        let member = member.clone();
        self.db.call(move |conn| insert_member(conn, &member)).await
    }

    async fn get_by_user_and_shift(
        &self,
        user_id: Uuid,
        shift_id: Uuid,
    ) -> RepositoryResult<Option<Member>> {
        self.db
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM members m WHERE m.user_id = ?1 AND m.shift_id = ?2",
                    MEMBER_COLUMNS
                );
                let member = conn
                    .query_row(
                        &sql,
                        params![user_id.to_string(), shift_id.to_string()],
                        map_member,
                    )
                    .optional()?;
                Ok(member)
            })
            .await
    }

    async fn list_by_shift(
        &self,
        shift_id: Uuid,
        status: Option<MemberStatus>,
    ) -> RepositoryResult<Vec<Member>> {
        let builder = shift_status_filter(shift_id, status);
        self.db
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM members m{} ORDER BY m.created_at ASC",
                    MEMBER_COLUMNS,
                    builder.where_sql()
                );
                let params = builder.into_params();
                let mut stmt = conn.prepare(&sql)?;
                let members = stmt
                    .query_map(params_from_iter(params.iter()), map_member)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(members)
            })
            .await
    }

    async fn list_with_users(
        &self,
        shift_id: Uuid,
        status: Option<MemberStatus>,
    ) -> RepositoryResult<Vec<MemberWithUser>> {
        let builder = shift_status_filter(shift_id, status);
        self.db
            .call(move |conn| {
                let sql = format!(
                    "{}{} ORDER BY u.surname ASC, u.name ASC",
                    MEMBER_WITH_USER_SELECT,
                    builder.where_sql()
                );
                let params = builder.into_params();
                let mut stmt = conn.prepare(&sql)?;
                let members = stmt
                    .query_map(params_from_iter(params.iter()), map_member_with_user)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(members)
            })
            .await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: MemberStatus,
        to: MemberStatus,
    ) -> RepositoryResult<()> {
        self.db
            .call(move |conn| {
                let member_id = id.to_string();
                let rows = conn.execute(
                    "UPDATE members SET status = ?1 WHERE id = ?2 AND status = ?3",
                    params![to.as_db_str(), member_id, from.as_db_str()],
                )?;
                if rows == 0 {
                    return Err(resolve_cas_miss(
                        conn,
                        "members",
                        "Member",
                        &member_id,
                        from.as_db_str(),
                        to.as_db_str(),
                    ));
                }
                Ok(())
            })
            .await
    }

    async fn find_in_running_shift(&self, user_id: Uuid) -> RepositoryResult<Option<Member>> {
        self.db
            .call(move |conn| {
                let running = [ShiftStatus::Started, ShiftStatus::ReadyForComplete];
                let sql = format!(
                    r#"
                    SELECT {}
                      FROM members m
                      JOIN shifts s ON s.id = m.shift_id
                     WHERE m.user_id = ? AND {}
                     ORDER BY s.started_at DESC
                     LIMIT 1
                    "#,
                    MEMBER_COLUMNS,
                    build_in_clause("s.status", running.len())
                );
                let mut values = vec![user_id.to_string()];
                values.extend(running.iter().map(|s| s.as_db_str().to_string()));
                let member = conn
                    .query_row(&sql, params_from_iter(values.iter()), map_member)
                    .optional()?;
                Ok(member)
            })
            .await
    }

    async fn list_with_skipped_at_least(
        &self,
        shift_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        min_skipped: i64,
    ) -> RepositoryResult<Vec<MemberWithUser>> {
        self.db
            .call(move |conn| {
                let sql = format!(
                    r#"{}
                     WHERE m.shift_id = ?1 AND m.status = ?2
                       AND (SELECT COUNT(*) FROM reports r
                             WHERE r.member_id = m.id AND r.status = ?3
                               AND r.task_date >= ?4 AND r.task_date <= ?5) >= ?6
                     ORDER BY u.surname ASC, u.name ASC
                    "#,
                    MEMBER_WITH_USER_SELECT
                );
                let mut stmt = conn.prepare(&sql)?;
                let members = stmt
                    .query_map(
                        params![
                            shift_id.to_string(),
                            MemberStatus::Active.as_db_str(),
                            ReportStatus::Skipped.as_db_str(),
                            fmt_date(from),
                            fmt_date(to),
                            min_skipped,
                        ],
                        map_member_with_user,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(members)
            })
            .await
    }

    async fn list_waiting_on(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<MemberWithUser>> {
        self.db
            .call(move |conn| {
                let sql = format!(
                    r#"{}
                      JOIN reports r ON r.member_id = m.id
                     WHERE m.shift_id = ?1 AND m.status = ?2
                       AND r.status = ?3 AND r.task_date = ?4
                     ORDER BY u.surname ASC, u.name ASC
                    "#,
                    MEMBER_WITH_USER_SELECT
                );
                let mut stmt = conn.prepare(&sql)?;
                let members = stmt
                    .query_map(
                        params![
                            shift_id.to_string(),
                            MemberStatus::Active.as_db_str(),
                            ReportStatus::Waiting.as_db_str(),
                            fmt_date(date),
                        ],
                        map_member_with_user,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(members)
            })
            .await
    }
}
