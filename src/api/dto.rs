// ==========================================
// 轮值工作流引擎 - API 数据传输对象
// ==========================================

use crate::domain::member::MemberWithUser;
use crate::domain::request::RequestWithUser;
use crate::domain::shift::{Shift, ShiftWithTotalUsers};
use crate::domain::types::{MemberStatus, RequestStatus, ShiftStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 轮值信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftInfo {
    pub shift_id: Uuid,
    pub title: String,
    pub status: ShiftStatus,
    pub started_at: NaiveDate,
    pub finished_at: NaiveDate,
    pub final_message: String,
    pub total_users: Option<i64>, // 仅列表视图返回
}

impl From<Shift> for ShiftInfo {
    fn from(shift: Shift) -> Self {
        Self {
            shift_id: shift.id,
            title: shift.title,
            status: shift.status,
            started_at: shift.started_at,
            finished_at: shift.finished_at,
            final_message: shift.final_message,
            total_users: None,
        }
    }
}

impl From<ShiftWithTotalUsers> for ShiftInfo {
    fn from(item: ShiftWithTotalUsers) -> Self {
        Self {
            total_users: Some(item.total_users),
            ..ShiftInfo::from(item.shift)
        }
    }
}

/// 轮值成员信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub member_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub surname: String,
    pub telegram_id: i64,
    pub status: MemberStatus,
    pub numbers_lombaryers: i32,
}

impl From<MemberWithUser> for MemberInfo {
    fn from(item: MemberWithUser) -> Self {
        Self {
            member_id: item.member.id,
            user_id: item.user.id,
            name: item.user.name,
            surname: item.user.surname,
            telegram_id: item.user.telegram_id,
            status: item.member.status,
            numbers_lombaryers: item.member.numbers_lombaryers,
        }
    }
}

/// 入组申请信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInfo {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub surname: String,
    pub phone_number: String,
    pub telegram_id: i64,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
}

impl From<RequestWithUser> for RequestInfo {
    fn from(item: RequestWithUser) -> Self {
        Self {
            request_id: item.request.id,
            user_id: item.user.id,
            name: item.user.name,
            surname: item.user.surname,
            phone_number: item.user.phone_number,
            telegram_id: item.user.telegram_id,
            status: item.request.status,
            created_at: item.request.created_at,
        }
    }
}

/// 用户注册参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub date_of_birth: NaiveDate,
    pub city: String,
    pub phone_number: String,
    pub telegram_id: i64,
}
