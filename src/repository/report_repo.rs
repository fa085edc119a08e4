// ==========================================
// 轮值工作流引擎 - 报告数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: 状态 CAS; 审核与成员积分在同一事务内提交
// ==========================================

use crate::db::Database;
use crate::domain::report::{Report, ReportFilter, ReportSummary, ReviewDecision};
use crate::domain::types::{ReportStatus, ShiftStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{
    fmt_date, fmt_datetime, get_date, get_datetime, get_enum, get_opt_datetime, get_opt_uuid,
    get_uuid, resolve_cas_miss, WhereBuilder,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

// ==========================================
// ReportRepository Trait
// ==========================================
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<Report>;

    /// 写入新报告
    ///
    /// # 返回
    /// - `Err(StatusConflict)`: 所属轮值已不是 Started
    /// - `Err(UniqueConstraintViolation)`: 违反 (member, task)/(member, task_date) 唯一性
    async fn create(&self, report: &Report) -> RepositoryResult<()>;

    /// 按条件查询, task_date 降序
    async fn list(&self, filter: &ReportFilter) -> RepositoryResult<Vec<Report>>;

    /// 管理端摘要 (联表 member/user/task/shift), task_date 降序
    async fn list_summaries(&self, filter: &ReportFilter) -> RepositoryResult<Vec<ReportSummary>>;

    /// CAS: Waiting → Reviewing, 附加照片
    async fn submit_photo(
        &self,
        id: Uuid,
        photo_url: String,
        uploaded_at: NaiveDateTime,
    ) -> RepositoryResult<Report>;

    /// 事务: CAS Reviewing → Approved/Declined + 成员积分增量
    async fn apply_review(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
    ) -> RepositoryResult<Report>;

    /// 将 task_date 早于 `cutoff` 的 Waiting 报告置为 Skipped (幂等)
    async fn skip_waiting_before(&self, shift_id: Uuid, cutoff: NaiveDate) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteReportRepository
// ==========================================
pub struct SqliteReportRepository {
    db: Database,
}

impl SqliteReportRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const REPORT_COLUMNS: &str = "id, shift_id, member_id, task_id, task_date, status, photo_url, \
     uploaded_at, reviewer_id, decline_reason, created_at";

fn map_report(row: &Row) -> rusqlite::Result<Report> {
    Ok(Report {
        id: get_uuid(row, 0)?,
        shift_id: get_uuid(row, 1)?,
        member_id: get_uuid(row, 2)?,
        task_id: get_uuid(row, 3)?,
        task_date: get_date(row, 4)?,
        status: get_enum(row, 5, "ReportStatus", ReportStatus::from_db_str)?,
        photo_url: row.get(6)?,
        uploaded_at: get_opt_datetime(row, 7)?,
        reviewer_id: get_opt_uuid(row, 8)?,
        decline_reason: row.get(9)?,
        created_at: get_datetime(row, 10)?,
    })
}

/// 写入单条报告, 要求所属轮值当前为 Started (供跨实体事务复用)
///
/// 轮值状态检查与写入是同一条语句, 轮值已取消/结束时不会留下未结束报告
pub(crate) fn insert_report(conn: &Connection, report: &Report) -> RepositoryResult<()> {
    let shift_id = report.shift_id.to_string();
    let rows = conn.execute(
        r#"
        INSERT INTO reports (
            id, shift_id, member_id, task_id, task_date, status, photo_url,
            uploaded_at, reviewer_id, decline_reason, created_at
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
         WHERE EXISTS (SELECT 1 FROM shifts WHERE id = ?2 AND status = ?12)
        "#,
        params![
            report.id.to_string(),
            shift_id,
            report.member_id.to_string(),
            report.task_id.to_string(),
            fmt_date(report.task_date),
            report.status.as_db_str(),
            report.photo_url,
            report.uploaded_at.map(fmt_datetime),
            report.reviewer_id.map(|id| id.to_string()),
            report.decline_reason,
            fmt_datetime(report.created_at),
            ShiftStatus::Started.as_db_str(),
        ],
    )?;
    if rows == 0 {
        return Err(resolve_cas_miss(
            conn,
            "shifts",
            "Shift",
            &shift_id,
            ShiftStatus::Started.as_db_str(),
            "assign_task",
        ));
    }
    Ok(())
}

fn load_report(conn: &Connection, id: &str) -> RepositoryResult<Report> {
    let sql = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
    conn.query_row(&sql, params![id], map_report)
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Report", id))
}

/// 条件 → WHERE 子句 (列名带 r. 前缀, 兼容联表查询)
fn build_filter(filter: &ReportFilter) -> WhereBuilder {
    let mut builder = WhereBuilder::new();
    builder
        .eq("r.shift_id", filter.shift_id.map(|id| id.to_string()))
        .eq("r.member_id", filter.member_id.map(|id| id.to_string()))
        .any_of(
            "r.status",
            filter.statuses.iter().map(|s| s.as_db_str().to_string()).collect(),
        )
        .gte("r.task_date", filter.date_from.map(fmt_date))
        .lte("r.task_date", filter.date_to.map(fmt_date));
    builder
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Report> {
        self.db
            .call(move |conn| load_report(conn, &id.to_string()))
            .await
    }

    async fn create(&self, report: &Report) -> RepositoryResult<()> {
        let report = report.clone();
        self.db.call(move |conn| insert_report(conn, &report)).await
    }

    async fn list(&self, filter: &ReportFilter) -> RepositoryResult<Vec<Report>> {
        let builder = build_filter(filter);
        self.db
            .call(move |conn| {
                let columns = REPORT_COLUMNS
                    .split(", ")
                    .map(|c| format!("r.{}", c.trim()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "SELECT {} FROM reports r{} ORDER BY r.task_date DESC, r.created_at DESC",
                    columns,
                    builder.where_sql()
                );
                let params = builder.into_params();
                let mut stmt = conn.prepare(&sql)?;
                let reports = stmt
                    .query_map(params_from_iter(params.iter()), map_report)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(reports)
            })
            .await
    }

    async fn list_summaries(&self, filter: &ReportFilter) -> RepositoryResult<Vec<ReportSummary>> {
        let builder = build_filter(filter);
        self.db
            .call(move |conn| {
                let sql = format!(
                    r#"
                    SELECT r.id, r.shift_id, s.started_at, r.member_id, u.name, u.surname,
                           t.id, t.description, t.url, r.task_date, r.status, r.photo_url
                      FROM reports r
                      JOIN shifts s ON s.id = r.shift_id
                      JOIN members m ON m.id = r.member_id
                      JOIN users u ON u.id = m.user_id
                      JOIN tasks t ON t.id = r.task_id{}
                     ORDER BY r.task_date DESC, u.surname ASC
                    "#,
                    builder.where_sql()
                );
                let params = builder.into_params();
                let mut stmt = conn.prepare(&sql)?;
                let summaries = stmt
                    .query_map(params_from_iter(params.iter()), |row| {
                        Ok(ReportSummary {
                            report_id: get_uuid(row, 0)?,
                            shift_id: get_uuid(row, 1)?,
                            shift_started_at: get_date(row, 2)?,
                            member_id: get_uuid(row, 3)?,
                            user_name: row.get(4)?,
                            user_surname: row.get(5)?,
                            task_id: get_uuid(row, 6)?,
                            task_description: row.get(7)?,
                            task_url: row.get(8)?,
                            task_date: get_date(row, 9)?,
                            status: get_enum(row, 10, "ReportStatus", ReportStatus::from_db_str)?,
                            photo_url: row.get(11)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(summaries)
            })
            .await
    }

    async fn submit_photo(
        &self,
        id: Uuid,
        photo_url: String,
        uploaded_at: NaiveDateTime,
    ) -> RepositoryResult<Report> {
        self.db
            .call(move |conn| {
                let report_id = id.to_string();
                let rows = conn.execute(
                    r#"
                    UPDATE reports
                       SET status = ?1, photo_url = ?2, uploaded_at = ?3
                     WHERE id = ?4 AND status = ?5
                    "#,
                    params![
                        ReportStatus::Reviewing.as_db_str(),
                        photo_url,
                        fmt_datetime(uploaded_at),
                        report_id,
                        ReportStatus::Waiting.as_db_str(),
                    ],
                )?;
                if rows == 0 {
                    return Err(resolve_cas_miss(
                        conn,
                        "reports",
                        "Report",
                        &report_id,
                        ReportStatus::Waiting.as_db_str(),
                        ReportStatus::Reviewing.as_db_str(),
                    ));
                }
                load_report(conn, &report_id)
            })
            .await
    }

    async fn apply_review(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
    ) -> RepositoryResult<Report> {
        self.db
            .call(move |conn| {
                let report_id = id.to_string();
                let target = decision.target_status();
                let tx = conn.transaction()?;

                let rows = tx.execute(
                    r#"
                    UPDATE reports
                       SET status = ?1, reviewer_id = ?2, decline_reason = ?3
                     WHERE id = ?4 AND status = ?5
                    "#,
                    params![
                        target.as_db_str(),
                        reviewer_id.to_string(),
                        decision.reason(),
                        report_id,
                        ReportStatus::Reviewing.as_db_str(),
                    ],
                )?;
                if rows == 0 {
                    return Err(resolve_cas_miss(
                        &tx,
                        "reports",
                        "Report",
                        &report_id,
                        ReportStatus::Reviewing.as_db_str(),
                        target.as_db_str(),
                    ));
                }

                let delta = decision.lombaryer_delta();
                if delta != 0 {
                    tx.execute(
                        r#"
                        UPDATE members
                           SET numbers_lombaryers = numbers_lombaryers + ?1
                         WHERE id = (SELECT member_id FROM reports WHERE id = ?2)
                        "#,
                        params![delta, report_id],
                    )?;
                }

                let report = load_report(&tx, &report_id)?;
                tx.commit()?;
                Ok(report)
            })
            .await
    }

    async fn skip_waiting_before(&self, shift_id: Uuid, cutoff: NaiveDate) -> RepositoryResult<usize> {
        self.db
            .call(move |conn| {
                let skipped = conn.execute(
                    r#"
                    UPDATE reports
                       SET status = ?1
                     WHERE shift_id = ?2 AND status = ?3 AND task_date < ?4
                    "#,
                    params![
                        ReportStatus::Skipped.as_db_str(),
                        shift_id.to_string(),
                        ReportStatus::Waiting.as_db_str(),
                        fmt_date(cutoff),
                    ],
                )?;
                Ok(skipped)
            })
            .await
    }
}
