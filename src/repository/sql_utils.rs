// ==========================================
// 轮值工作流引擎 - SQL 工具模块
// ==========================================
// 职责: 动态 WHERE/IN 子句构建 + 行字段解析
// 约束: 所有值走参数绑定, 不拼接字面量
// ==========================================

use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::repository::error::RepositoryError;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

/// 构建 IN 子句的占位符片段
///
/// 空列表返回恒假条件, 避免生成非法 SQL
///
/// ```
/// use shift_workflow::repository::sql_utils::build_in_clause;
///
/// assert_eq!(build_in_clause("status", 2), "status IN (?, ?)");
/// assert_eq!(build_in_clause("status", 0), "1 = 0");
/// ```
pub fn build_in_clause(column_name: &str, count: usize) -> String {
    if count == 0 {
        return "1 = 0".to_string();
    }
    let placeholders = vec!["?"; count].join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

// ==========================================
// WhereBuilder - 可选条件累加器
// ==========================================

/// 按 AND 累加可选过滤条件, 参数统一为 TEXT
#[derive(Debug, Default)]
pub struct WhereBuilder {
    clauses: Vec<String>,
    params: Vec<String>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加 `column = ?`
    pub fn eq(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{} = ?", column));
            self.params.push(value);
        }
        self
    }

    /// 追加 `column IN (...)`, 空列表表示不过滤
    pub fn any_of(&mut self, column: &str, values: Vec<String>) -> &mut Self {
        if !values.is_empty() {
            self.clauses.push(build_in_clause(column, values.len()));
            self.params.extend(values);
        }
        self
    }

    /// 追加 `column >= ?`
    pub fn gte(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{} >= ?", column));
            self.params.push(value);
        }
        self
    }

    /// 追加 `column <= ?`
    pub fn lte(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{} <= ?", column));
            self.params.push(value);
        }
        self
    }

    /// 生成 WHERE 子句 (无条件时为空串)
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn into_params(self) -> Vec<String> {
        self.params
    }
}

// ==========================================
// 格式化 / 行解析
// ==========================================

pub fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn fmt_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// 数据库中出现未知的枚举字符串
#[derive(Debug, Error)]
#[error("未知的{kind}取值: {value}")]
pub struct UnknownEnumValue {
    pub kind: &'static str,
    pub value: String,
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_uuid(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| {
            NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

/// 解析状态类枚举列
pub fn get_enum<T>(
    row: &Row,
    idx: usize,
    kind: &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, UnknownEnumValue { kind, value: raw }))
}

// ==========================================
// 状态 CAS 辅助
// ==========================================

/// CAS 未命中时区分"记录不存在"与"状态冲突"
pub(crate) fn resolve_cas_miss(
    conn: &Connection,
    table: &str,
    entity: &str,
    id: &str,
    expected: &str,
    attempted: &str,
) -> RepositoryError {
    let actual: Result<Option<String>, _> = conn
        .query_row(
            &format!("SELECT status FROM {} WHERE id = ?1", table),
            params![id],
            |row| row.get(0),
        )
        .optional();

    match actual {
        Ok(Some(actual)) => RepositoryError::StatusConflict {
            entity: entity.to_string(),
            id: id.to_string(),
            expected: expected.to_string(),
            actual,
            attempted: attempted.to_string(),
        },
        Ok(None) => RepositoryError::not_found(entity, id),
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_builder_skips_empty_conditions() {
        let mut builder = WhereBuilder::new();
        builder
            .eq("shift_id", Some("S1".to_string()))
            .eq("member_id", None)
            .any_of("status", vec!["waiting".to_string(), "reviewing".to_string()])
            .gte("task_date", None);

        assert_eq!(
            builder.where_sql(),
            " WHERE shift_id = ? AND status IN (?, ?)"
        );
        assert_eq!(builder.into_params(), vec!["S1", "waiting", "reviewing"]);
    }

    #[test]
    fn test_where_builder_empty() {
        let builder = WhereBuilder::new();
        assert_eq!(builder.where_sql(), "");
    }

    #[test]
    fn test_date_format_roundtrip_shape() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(fmt_date(date), "2026-01-05");
        let ts = date.and_hms_opt(7, 8, 9).unwrap();
        assert_eq!(fmt_datetime(ts), "2026-01-05 07:08:09");
    }

    #[test]
    fn test_resolve_cas_miss_distinguishes_conflict_and_missing() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE shifts (id TEXT PRIMARY KEY, status TEXT NOT NULL);
             INSERT INTO shifts VALUES ('S1', 'cancelled');",
        )
        .unwrap();

        match resolve_cas_miss(&conn, "shifts", "Shift", "S1", "started", "assign_task") {
            RepositoryError::StatusConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, "started");
                assert_eq!(actual, "cancelled");
            }
            other => panic!("期望 StatusConflict, 实际 {:?}", other),
        }

        let missing = resolve_cas_miss(&conn, "shifts", "Shift", "S2", "started", "assign_task");
        assert!(matches!(missing, RepositoryError::NotFound { .. }));
    }
}
