// ==========================================
// 轮值工作流引擎 - 轮值领域模型
// ==========================================
// 不变量: finished_at >= started_at
// 状态单调推进, 仅取消可从任意非终态到达
// ==========================================

use crate::domain::types::ShiftStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Shift - 轮值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: Uuid,                  // 轮值ID
    pub status: ShiftStatus,       // 状态
    pub started_at: NaiveDate,     // 开始日期
    pub finished_at: NaiveDate,    // 结束日期 (含)
    pub title: String,             // 标题
    pub final_message: String,     // 结束时发送给成员的消息
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

impl Shift {
    /// 创建筹备中的轮值
    pub fn new(draft: NewShift, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ShiftStatus::Preparing,
            started_at: draft.started_at,
            finished_at: draft.finished_at,
            title: draft.title,
            final_message: draft.final_message,
            created_at: now,
            updated_at: now,
        }
    }

    /// 轮值是否覆盖该日期 (用于每日任务派发)
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.started_at <= date && date <= self.finished_at
    }

    /// 日期区间是否合法
    pub fn has_valid_dates(&self) -> bool {
        self.finished_at >= self.started_at
    }

    /// 应用更新字段 (未提供的字段保持不变)
    pub fn apply_update(&mut self, update: ShiftUpdate, now: NaiveDateTime) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(started_at) = update.started_at {
            self.started_at = started_at;
        }
        if let Some(finished_at) = update.finished_at {
            self.finished_at = finished_at;
        }
        if let Some(final_message) = update.final_message {
            self.final_message = final_message;
        }
        self.updated_at = now;
    }
}

/// 新建轮值参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub title: String,
    pub started_at: NaiveDate,
    pub finished_at: NaiveDate,
    pub final_message: String,
}

/// 轮值更新参数 (仅筹备中允许)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftUpdate {
    pub title: Option<String>,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub final_message: Option<String>,
}

/// 轮值列表排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftSort {
    #[default]
    StartedAt,
    FinishedAt,
}

/// 轮值列表查询条件
#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub statuses: Vec<ShiftStatus>, // 为空表示不过滤
    pub sort: ShiftSort,
}

impl ShiftFilter {
    pub fn with_status(status: ShiftStatus) -> Self {
        Self {
            statuses: vec![status],
            sort: ShiftSort::default(),
        }
    }
}

/// 轮值 + 成员总数 (列表视图)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftWithTotalUsers {
    pub shift: Shift,
    pub total_users: i64,
}
