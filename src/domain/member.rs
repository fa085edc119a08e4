// ==========================================
// 轮值工作流引擎 - 成员领域模型
// ==========================================
// 不变量: 每个 (user, shift) 仅一条成员记录
// 不变量: numbers_lombaryers 单调不减
// ==========================================

use crate::domain::types::MemberStatus;
use crate::domain::user::User;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,                  // 成员ID
    pub user_id: Uuid,             // 用户ID
    pub shift_id: Uuid,            // 轮值ID
    pub status: MemberStatus,      // 状态
    pub numbers_lombaryers: i32,   // 奖励积分 ("ломбарьерчики")
    pub created_at: NaiveDateTime, // 加入时间
}

impl Member {
    /// 创建活跃成员 (申请批准时)
    pub fn active(user_id: Uuid, shift_id: Uuid, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            shift_id,
            status: MemberStatus::Active,
            numbers_lombaryers: 0,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// 成员 + 用户资料 (列表视图)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithUser {
    pub member: Member,
    pub user: User,
}
