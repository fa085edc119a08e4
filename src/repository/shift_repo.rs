// ==========================================
// 轮值工作流引擎 - 轮值数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: 状态变更一律 CAS (WHERE id = ? AND status = ?)
// ==========================================

use crate::db::Database;
use crate::domain::report::Report;
use crate::domain::shift::{Shift, ShiftFilter, ShiftSort, ShiftWithTotalUsers};
use crate::domain::types::{ReportStatus, ShiftStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::report_repo::insert_report;
use crate::repository::sql_utils::{
    build_in_clause, fmt_date, fmt_datetime, get_date, get_datetime, get_enum, get_uuid,
    resolve_cas_miss, WhereBuilder,
};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

// ==========================================
// ShiftRepository Trait
// ==========================================
#[async_trait]
pub trait ShiftRepository: Send + Sync {
    /// 按ID查询 (不存在返回 NotFound)
    async fn get(&self, id: Uuid) -> RepositoryResult<Shift>;

    async fn create(&self, shift: &Shift) -> RepositoryResult<()>;

    /// 更新资料字段, 要求当前状态仍为 `expected_status`
    async fn update(&self, shift: &Shift, expected_status: ShiftStatus) -> RepositoryResult<()>;

    /// 按状态过滤并排序, 附带成员总数
    async fn list(&self, filter: &ShiftFilter) -> RepositoryResult<Vec<ShiftWithTotalUsers>>;

    /// 状态 CAS
    async fn transition_status(
        &self,
        id: Uuid,
        from: ShiftStatus,
        to: ShiftStatus,
    ) -> RepositoryResult<()>;

    /// 事务: 统计未结束报告, 为 0 时沿 `path` 逐段 CAS (如 Started → ReadyForComplete → Finished)
    ///
    /// # 返回
    /// 未结束 (Waiting/Reviewing) 报告数; 大于 0 时状态不变
    async fn finish_if_settled(&self, id: Uuid, path: Vec<ShiftStatus>) -> RepositoryResult<i64>;

    /// 事务: Preparing → Started + 写入首日报告
    async fn start_with_reports(&self, id: Uuid, reports: Vec<Report>) -> RepositoryResult<()>;

    /// 事务: from → Cancelled + 所有未结束报告置为 Skipped
    ///
    /// # 返回
    /// 被跳过的报告数
    async fn cancel_with_reports(&self, id: Uuid, from: ShiftStatus) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteShiftRepository
// ==========================================
pub struct SqliteShiftRepository {
    db: Database,
}

impl SqliteShiftRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const SHIFT_COLUMNS: &str =
    "id, status, started_at, finished_at, title, final_message, created_at, updated_at";

fn map_shift(row: &Row) -> rusqlite::Result<Shift> {
    Ok(Shift {
        id: get_uuid(row, 0)?,
        status: get_enum(row, 1, "ShiftStatus", ShiftStatus::from_db_str)?,
        started_at: get_date(row, 2)?,
        finished_at: get_date(row, 3)?,
        title: row.get(4)?,
        final_message: row.get(5)?,
        created_at: get_datetime(row, 6)?,
        updated_at: get_datetime(row, 7)?,
    })
}

fn cas_shift_status(
    conn: &Connection,
    id: &str,
    from: ShiftStatus,
    to: ShiftStatus,
) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE shifts SET status = ?1, updated_at = datetime('now') WHERE id = ?2 AND status = ?3",
        params![to.as_db_str(), id, from.as_db_str()],
    )?;
    if rows == 0 {
        return Err(resolve_cas_miss(
            conn,
            "shifts",
            "Shift",
            id,
            from.as_db_str(),
            to.as_db_str(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ShiftRepository for SqliteShiftRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Shift> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {} FROM shifts WHERE id = ?1", SHIFT_COLUMNS);
                conn.query_row(&sql, params![id.to_string()], map_shift)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("Shift", id))
            })
            .await
    }

    async fn create(&self, shift: &Shift) -> RepositoryResult<()> {
        let shift = shift.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO shifts (
                        id, status, started_at, finished_at, title, final_message,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        shift.id.to_string(),
                        shift.status.as_db_str(),
                        fmt_date(shift.started_at),
                        fmt_date(shift.finished_at),
                        shift.title,
                        shift.final_message,
                        fmt_datetime(shift.created_at),
                        fmt_datetime(shift.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn update(&self, shift: &Shift, expected_status: ShiftStatus) -> RepositoryResult<()> {
        let shift = shift.clone();
        self.db
            .call(move |conn| {
                let id = shift.id.to_string();
                let rows = conn.execute(
                    r#"
                    UPDATE shifts
                       SET title = ?1, started_at = ?2, finished_at = ?3,
                           final_message = ?4, updated_at = ?5
                     WHERE id = ?6 AND status = ?7
                    "#,
                    params![
                        shift.title,
                        fmt_date(shift.started_at),
                        fmt_date(shift.finished_at),
                        shift.final_message,
                        fmt_datetime(shift.updated_at),
                        id,
                        expected_status.as_db_str(),
                    ],
                )?;
                if rows == 0 {
                    return Err(resolve_cas_miss(
                        conn,
                        "shifts",
                        "Shift",
                        &id,
                        expected_status.as_db_str(),
                        expected_status.as_db_str(),
                    ));
                }
                Ok(())
            })
            .await
    }

    async fn list(&self, filter: &ShiftFilter) -> RepositoryResult<Vec<ShiftWithTotalUsers>> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_db_str().to_string())
            .collect();
        let order_by = match filter.sort {
            ShiftSort::StartedAt => "s.started_at DESC",
            ShiftSort::FinishedAt => "s.finished_at DESC",
        };

        self.db
            .call(move |conn| {
                let mut where_builder = WhereBuilder::new();
                where_builder.any_of("s.status", statuses);

                let sql = format!(
                    r#"
                    SELECT s.id, s.status, s.started_at, s.finished_at, s.title, s.final_message,
                           s.created_at, s.updated_at,
                           (SELECT COUNT(*) FROM members m WHERE m.shift_id = s.id) AS total_users
                      FROM shifts s{}
                     ORDER BY {}
                    "#,
                    where_builder.where_sql(),
                    order_by
                );
                let params = where_builder.into_params();

                let mut stmt = conn.prepare(&sql)?;
                let shifts = stmt
                    .query_map(params_from_iter(params.iter()), |row| {
                        Ok(ShiftWithTotalUsers {
                            shift: map_shift(row)?,
                            total_users: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(shifts)
            })
            .await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: ShiftStatus,
        to: ShiftStatus,
    ) -> RepositoryResult<()> {
        self.db
            .call(move |conn| cas_shift_status(conn, &id.to_string(), from, to))
            .await
    }

    async fn finish_if_settled(&self, id: Uuid, path: Vec<ShiftStatus>) -> RepositoryResult<i64> {
        self.db
            .call(move |conn| {
                let shift_id = id.to_string();
                let tx = conn.transaction()?;

                let sql = format!(
                    "SELECT COUNT(*) FROM reports WHERE shift_id = ? AND {}",
                    build_in_clause("status", ReportStatus::OPEN.len())
                );
                let mut values = vec![shift_id.clone()];
                values.extend(ReportStatus::OPEN.iter().map(|s| s.as_db_str().to_string()));
                let open_reports: i64 =
                    tx.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
                if open_reports > 0 {
                    return Ok(open_reports);
                }

                for step in path.windows(2) {
                    cas_shift_status(&tx, &shift_id, step[0], step[1])?;
                }
                tx.commit()?;
                Ok(0)
            })
            .await
    }

    async fn start_with_reports(&self, id: Uuid, reports: Vec<Report>) -> RepositoryResult<()> {
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                cas_shift_status(&tx, &id.to_string(), ShiftStatus::Preparing, ShiftStatus::Started)?;
                for report in &reports {
                    insert_report(&tx, report)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn cancel_with_reports(&self, id: Uuid, from: ShiftStatus) -> RepositoryResult<usize> {
        self.db
            .call(move |conn| {
                let shift_id = id.to_string();
                let tx = conn.transaction()?;
                cas_shift_status(&tx, &shift_id, from, ShiftStatus::Cancelled)?;

                let sql = format!(
                    "UPDATE reports SET status = ? WHERE shift_id = ? AND {}",
                    build_in_clause("status", ReportStatus::OPEN.len())
                );
                let mut values = vec![ReportStatus::Skipped.as_db_str().to_string(), shift_id];
                values.extend(ReportStatus::OPEN.iter().map(|s| s.as_db_str().to_string()));
                let skipped = tx.execute(&sql, params_from_iter(values.iter()))?;

                tx.commit()?;
                Ok(skipped)
            })
            .await
    }
}
