// ==========================================
// 轮值工作流引擎 - 入组申请 API
// ==========================================

use std::sync::Arc;

use crate::api::error::{parse_id, ApiError, ApiResult};
use crate::domain::request::Request;
use crate::engine::EnrollmentWorkflow;
use crate::repository::UserRepository;

/// 入组申请API
pub struct EnrollmentApi {
    enrollment: Arc<EnrollmentWorkflow>,
    users: Arc<dyn UserRepository>,
}

impl EnrollmentApi {
    pub fn new(enrollment: Arc<EnrollmentWorkflow>, users: Arc<dyn UserRepository>) -> Self {
        Self { enrollment, users }
    }

    /// 提交入组申请
    ///
    /// # 返回
    /// - Ok(Request): 状态为 Pending 或 RepeatedRequest
    pub async fn submit_request(&self, user_id: &str, shift_id: &str) -> ApiResult<Request> {
        let user_id = parse_id("user_id", user_id)?;
        let shift_id = parse_id("shift_id", shift_id)?;
        Ok(self.enrollment.submit_request(user_id, shift_id).await?)
    }

    pub async fn approve_request(&self, request_id: &str) -> ApiResult<Request> {
        let id = parse_id("request_id", request_id)?;
        Ok(self.enrollment.approve_request(id).await?)
    }

    pub async fn decline_request(&self, request_id: &str) -> ApiResult<Request> {
        let id = parse_id("request_id", request_id)?;
        Ok(self.enrollment.decline_request(id).await?)
    }

    /// 按 Telegram 账号查询当前积分
    pub async fn get_lombaryer_balance(&self, telegram_id: i64) -> ApiResult<i32> {
        let user = self
            .users
            .get_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User(telegram_id={})", telegram_id)))?;
        Ok(self.enrollment.lombaryer_balance(user.id).await?)
    }
}
