// ==========================================
// 轮值工作流引擎 - 用户领域模型
// ==========================================
// 说明: 用户资料不参与工作流状态, 仅资料字段可编辑
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,                  // 用户ID
    pub name: String,              // 名
    pub surname: String,           // 姓
    pub date_of_birth: NaiveDate,  // 出生日期
    pub city: String,              // 城市
    pub phone_number: String,      // 手机号 (唯一)
    pub telegram_id: i64,          // Telegram 账号 (唯一, 通知渠道)
    pub created_at: NaiveDateTime, // 创建时间
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
