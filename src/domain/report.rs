// ==========================================
// 轮值工作流引擎 - 报告领域模型
// ==========================================
// 报告 = 某成员在某日被派发的一项任务
// 唯一性: (member, task) 一个轮值内任务不重复; (member, task_date) 每日一条
// 红线: 报告从不物理删除, 只进入终态
// ==========================================

use crate::domain::task::Task;
use crate::domain::types::ReportStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Report - 每日任务报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,                           // 报告ID
    pub shift_id: Uuid,                     // 轮值ID
    pub member_id: Uuid,                    // 成员ID
    pub task_id: Uuid,                      // 任务ID
    pub task_date: NaiveDate,               // 派发日期
    pub status: ReportStatus,               // 状态
    pub photo_url: Option<String>,          // 完成照片
    pub uploaded_at: Option<NaiveDateTime>, // 照片提交时间
    pub reviewer_id: Option<Uuid>,          // 审核管理员
    pub decline_reason: Option<String>,     // 驳回原因
    pub created_at: NaiveDateTime,          // 创建时间
}

impl Report {
    /// 新派发的报告 (Waiting)
    pub fn waiting(
        shift_id: Uuid,
        member_id: Uuid,
        task_id: Uuid,
        task_date: NaiveDate,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            shift_id,
            member_id,
            task_id,
            task_date,
            status: ReportStatus::Waiting,
            photo_url: None,
            uploaded_at: None,
            reviewer_id: None,
            decline_reason: None,
            created_at: now,
        }
    }
}

// ==========================================
// ReportFilter - 报告查询条件
// ==========================================
// 所有条件为 AND 关系; 空集合/None 表示不过滤
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub shift_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub statuses: Vec<ReportStatus>,
    pub date_from: Option<NaiveDate>, // 含
    pub date_to: Option<NaiveDate>,   // 含
}

impl ReportFilter {
    pub fn for_shift(shift_id: Uuid) -> Self {
        Self {
            shift_id: Some(shift_id),
            ..Default::default()
        }
    }

    pub fn for_member(member_id: Uuid) -> Self {
        Self {
            member_id: Some(member_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[ReportStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn on(self, date: NaiveDate) -> Self {
        self.between(date, date)
    }
}

// ==========================================
// ReviewDecision - 审核结论
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    Approve,
    Decline { reason: Option<String> },
}

impl ReviewDecision {
    /// 审核结论对应的目标状态
    pub fn target_status(&self) -> ReportStatus {
        match self {
            ReviewDecision::Approve => ReportStatus::Approved,
            ReviewDecision::Decline { .. } => ReportStatus::Declined,
        }
    }

    /// 审核通过时成员积分增量
    pub fn lombaryer_delta(&self) -> i32 {
        match self {
            ReviewDecision::Approve => 1,
            ReviewDecision::Decline { .. } => 0,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReviewDecision::Approve => None,
            ReviewDecision::Decline { reason } => reason.as_deref(),
        }
    }
}

// ==========================================
// ReportSummary - 报告摘要 (管理端列表)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: Uuid,
    pub shift_id: Uuid,
    pub shift_started_at: NaiveDate,
    pub member_id: Uuid,
    pub user_name: String,
    pub user_surname: String,
    pub task_id: Uuid,
    pub task_description: String,
    pub task_url: String,
    pub task_date: NaiveDate,
    pub status: ReportStatus,
    pub photo_url: Option<String>,
}

/// 报告 + 任务详情 (单条查看)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportWithTask {
    pub report: Report,
    pub task: Task,
}
