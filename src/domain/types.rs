// ==========================================
// 轮值工作流引擎 - 领域状态类型
// ==========================================
// 持久化格式: snake_case 字符串 (与数据库一致, 必须精确往返)
// 红线: 状态转换处一律穷举匹配, 不允许通配分支
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 轮值状态 (Shift Status)
// ==========================================
// 合法边: Preparing→{Started,Cancelled}
//        Started→{ReadyForComplete,Cancelled}
//        ReadyForComplete→{Finished,Cancelled}
// 终态: Finished, Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Preparing,        // 筹备中
    Started,          // 进行中
    ReadyForComplete, // 待结束 (不再派发任务)
    Finished,         // 已结束
    Cancelled,        // 已取消
}

impl ShiftStatus {
    pub const ALL: [ShiftStatus; 5] = [
        ShiftStatus::Preparing,
        ShiftStatus::Started,
        ShiftStatus::ReadyForComplete,
        ShiftStatus::Finished,
        ShiftStatus::Cancelled,
    ];

    /// 转换为数据库字符串
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ShiftStatus::Preparing => "preparing",
            ShiftStatus::Started => "started",
            ShiftStatus::ReadyForComplete => "ready_for_complete",
            ShiftStatus::Finished => "finished",
            ShiftStatus::Cancelled => "cancelled",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "preparing" => Some(ShiftStatus::Preparing),
            "started" => Some(ShiftStatus::Started),
            "ready_for_complete" => Some(ShiftStatus::ReadyForComplete),
            "finished" => Some(ShiftStatus::Finished),
            "cancelled" => Some(ShiftStatus::Cancelled),
            _ => None,
        }
    }

    /// 判断 self → next 是否为合法边
    pub fn can_transition_to(&self, next: ShiftStatus) -> bool {
        match (self, next) {
            (ShiftStatus::Preparing, ShiftStatus::Started) => true,
            (ShiftStatus::Started, ShiftStatus::ReadyForComplete) => true,
            (ShiftStatus::ReadyForComplete, ShiftStatus::Finished) => true,
            (ShiftStatus::Preparing, ShiftStatus::Cancelled)
            | (ShiftStatus::Started, ShiftStatus::Cancelled)
            | (ShiftStatus::ReadyForComplete, ShiftStatus::Cancelled) => true,
            (ShiftStatus::Finished, _) | (ShiftStatus::Cancelled, _) => false,
            (ShiftStatus::Preparing, _)
            | (ShiftStatus::Started, _)
            | (ShiftStatus::ReadyForComplete, _) => false,
        }
    }

    /// self → target 的迁移路径 (含两端)
    ///
    /// 除直接边外, 只允许经 ReadyForComplete 中转 (Started → ReadyForComplete → Finished)
    pub fn path_to(&self, target: ShiftStatus) -> Option<Vec<ShiftStatus>> {
        if self.can_transition_to(target) {
            return Some(vec![*self, target]);
        }
        let via = ShiftStatus::ReadyForComplete;
        if self.can_transition_to(via) && via.can_transition_to(target) {
            Some(vec![*self, via, target])
        } else {
            None
        }
    }
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 成员状态 (Member Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,  // 待激活 (不参与任务分配)
    Active,   // 活跃
    Excluded, // 已除名
}

impl MemberStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Active => "active",
            MemberStatus::Excluded => "excluded",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MemberStatus::Pending),
            "active" => Some(MemberStatus::Active),
            "excluded" => Some(MemberStatus::Excluded),
            _ => None,
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 报告状态 (Report Status)
// ==========================================
// Waiting → Reviewing → {Approved, Declined}
// Waiting → Skipped (超过宽限期未提交)
// {Waiting, Reviewing} → Skipped (轮值取消)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Waiting,   // 已派发, 未提交
    Reviewing, // 已提交照片, 待审核
    Approved,  // 审核通过
    Declined,  // 审核驳回
    Skipped,   // 已跳过
}

impl ReportStatus {
    /// 未结束的状态集合 (阻塞轮值结束)
    pub const OPEN: [ReportStatus; 2] = [ReportStatus::Waiting, ReportStatus::Reviewing];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            ReportStatus::Waiting => "waiting",
            ReportStatus::Reviewing => "reviewing",
            ReportStatus::Approved => "approved",
            ReportStatus::Declined => "declined",
            ReportStatus::Skipped => "skipped",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(ReportStatus::Waiting),
            "reviewing" => Some(ReportStatus::Reviewing),
            "approved" => Some(ReportStatus::Approved),
            "declined" => Some(ReportStatus::Declined),
            "skipped" => Some(ReportStatus::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 申请状态 (Request Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Approved,        // 已批准
    Declined,        // 已拒绝
    Pending,         // 待审核
    RepeatedRequest, // 重复申请 (同一用户对同一轮值再次申请)
}

impl RequestStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
            RequestStatus::Pending => "pending",
            RequestStatus::RepeatedRequest => "repeated_request",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(RequestStatus::Approved),
            "declined" => Some(RequestStatus::Declined),
            "pending" => Some(RequestStatus::Pending),
            "repeated_request" => Some(RequestStatus::RepeatedRequest),
            _ => None,
        }
    }

    /// 是否仍待管理员处理
    pub fn is_reviewable(&self) -> bool {
        match self {
            RequestStatus::Pending | RequestStatus::RepeatedRequest => true,
            RequestStatus::Approved | RequestStatus::Declined => false,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}
