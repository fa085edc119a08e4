// ==========================================
// 轮值工作流引擎 - 入组申请领域模型
// ==========================================

use crate::domain::types::RequestStatus;
use crate::domain::user::User;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,                  // 申请ID
    pub user_id: Uuid,             // 申请人
    pub shift_id: Uuid,            // 目标轮值
    pub status: RequestStatus,     // 状态
    pub created_at: NaiveDateTime, // 申请时间
}

/// 申请 + 用户资料 (管理端列表视图)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWithUser {
    pub request: Request,
    pub user: User,
}
