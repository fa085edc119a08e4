// ==========================================
// 轮值工作流引擎 - 轮值管理 API
// ==========================================
// 职责: 轮值创建/查询/编辑, 开始/结束/取消, 成员与申请查询,
//       淘汰与提醒, 每日处理
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::dto::{MemberInfo, RequestInfo, ShiftInfo};
use crate::api::error::{parse_id, ApiError, ApiResult};
use crate::domain::shift::{NewShift, ShiftFilter, ShiftSort, ShiftUpdate};
use crate::domain::types::{MemberStatus, RequestStatus, ShiftStatus};
use crate::engine::{
    DailyTickReport, ExclusionOutcome, ShiftCancelOutcome, ShiftLifecycleManager,
    ShiftStartOutcome,
};

/// 轮值管理API
pub struct ShiftApi {
    lifecycle: Arc<ShiftLifecycleManager>,
}

impl ShiftApi {
    pub fn new(lifecycle: Arc<ShiftLifecycleManager>) -> Self {
        Self { lifecycle }
    }

    /// 创建轮值
    pub async fn create_shift(&self, draft: NewShift) -> ApiResult<ShiftInfo> {
        if draft.title.trim().is_empty() {
            return Err(ApiError::InvalidInput("标题不能为空".to_string()));
        }
        let shift = self.lifecycle.create(draft).await?;
        Ok(shift.into())
    }

    pub async fn get_shift(&self, shift_id: &str) -> ApiResult<ShiftInfo> {
        let id = parse_id("shift_id", shift_id)?;
        Ok(self.lifecycle.get(id).await?.into())
    }

    /// 编辑轮值 (仅筹备中)
    pub async fn update_shift(&self, shift_id: &str, update: ShiftUpdate) -> ApiResult<ShiftInfo> {
        let id = parse_id("shift_id", shift_id)?;
        Ok(self.lifecycle.update(id, update).await?.into())
    }

    /// 按状态列出轮值
    ///
    /// # 参数
    /// - statuses: 为空表示全部
    /// - sort: 排序字段
    pub async fn list_shifts(
        &self,
        statuses: Vec<ShiftStatus>,
        sort: ShiftSort,
    ) -> ApiResult<Vec<ShiftInfo>> {
        let shifts = self
            .lifecycle
            .list(&ShiftFilter { statuses, sort })
            .await?;
        Ok(shifts.into_iter().map(ShiftInfo::from).collect())
    }

    pub async fn start_shift(&self, shift_id: &str, today: NaiveDate) -> ApiResult<ShiftStartOutcome> {
        let id = parse_id("shift_id", shift_id)?;
        Ok(self.lifecycle.start(id, today).await?)
    }

    pub async fn finish_shift(&self, shift_id: &str) -> ApiResult<ShiftInfo> {
        let id = parse_id("shift_id", shift_id)?;
        Ok(self.lifecycle.finish(id).await?.into())
    }

    pub async fn cancel_shift(
        &self,
        shift_id: &str,
        message: Option<String>,
    ) -> ApiResult<ShiftCancelOutcome> {
        let id = parse_id("shift_id", shift_id)?;
        Ok(self.lifecycle.cancel(id, message).await?)
    }

    /// 轮值成员 (+可选成员状态)
    pub async fn get_shift_members(
        &self,
        shift_id: &str,
        status: Option<MemberStatus>,
    ) -> ApiResult<Vec<MemberInfo>> {
        let id = parse_id("shift_id", shift_id)?;
        let members = self.lifecycle.members(id, status).await?;
        Ok(members.into_iter().map(MemberInfo::from).collect())
    }

    /// 轮值入组申请 (+可选申请状态)
    pub async fn list_shift_requests(
        &self,
        shift_id: &str,
        status: Option<RequestStatus>,
    ) -> ApiResult<Vec<RequestInfo>> {
        let id = parse_id("shift_id", shift_id)?;
        let requests = self.lifecycle.requests(id, status).await?;
        Ok(requests.into_iter().map(RequestInfo::from).collect())
    }

    /// 淘汰候选 (只读)
    pub async fn get_exclusion_candidates(
        &self,
        shift_id: &str,
        today: NaiveDate,
    ) -> ApiResult<Vec<MemberInfo>> {
        let id = parse_id("shift_id", shift_id)?;
        let members = self.lifecycle.exclusion_candidates(id, today).await?;
        Ok(members.into_iter().map(MemberInfo::from).collect())
    }

    /// 显式淘汰成员
    pub async fn exclude_members(
        &self,
        shift_id: &str,
        member_ids: &[String],
    ) -> ApiResult<ExclusionOutcome> {
        let id = parse_id("shift_id", shift_id)?;
        if member_ids.is_empty() {
            return Err(ApiError::InvalidInput("成员列表不能为空".to_string()));
        }
        let ids = member_ids
            .iter()
            .map(|raw| parse_id("member_id", raw))
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(self.lifecycle.exclusion().exclude_members(id, &ids).await?)
    }

    /// 发送当日提醒
    pub async fn send_reminders(&self, today: NaiveDate) -> ApiResult<usize> {
        Ok(self.lifecycle.send_reminders(today).await?)
    }

    /// 每日处理 (逾期跳过 / 到期迁移 / 当日派发 / 淘汰评估)
    pub async fn run_daily_tick(&self, today: NaiveDate) -> ApiResult<DailyTickReport> {
        Ok(self.lifecycle.run_daily_tick(today).await?)
    }
}
