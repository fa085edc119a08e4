// ==========================================
// 轮值工作流引擎 - 报告审核 API
// ==========================================

use std::sync::Arc;

use uuid::Uuid;

use crate::api::error::{parse_id, ApiError, ApiResult};
use crate::domain::report::{Report, ReportFilter, ReportSummary, ReportWithTask};
use crate::domain::types::ReportStatus;
use crate::engine::ReportReviewWorkflow;

/// 报告审核API
pub struct ReportApi {
    review: Arc<ReportReviewWorkflow>,
}

impl ReportApi {
    pub fn new(review: Arc<ReportReviewWorkflow>) -> Self {
        Self { review }
    }

    /// 报告详情 (含任务)
    pub async fn get_report(&self, report_id: &str) -> ApiResult<ReportWithTask> {
        let id = parse_id("report_id", report_id)?;
        Ok(self.review.get_with_task(id).await?)
    }

    /// 提交完成照片
    pub async fn submit_report(&self, report_id: &str, photo_url: &str) -> ApiResult<Report> {
        let id = parse_id("report_id", report_id)?;
        if photo_url.trim().is_empty() {
            return Err(ApiError::InvalidInput("照片地址不能为空".to_string()));
        }
        Ok(self.review.submit(id, photo_url.trim()).await?)
    }

    pub async fn approve_report(&self, report_id: &str, reviewer_id: Uuid) -> ApiResult<Report> {
        let id = parse_id("report_id", report_id)?;
        Ok(self.review.approve(id, reviewer_id).await?)
    }

    pub async fn decline_report(
        &self,
        report_id: &str,
        reviewer_id: Uuid,
        reason: Option<String>,
    ) -> ApiResult<Report> {
        let id = parse_id("report_id", report_id)?;
        Ok(self.review.decline(id, reviewer_id, reason).await?)
    }

    /// 报告摘要列表, task_date 降序
    ///
    /// # 参数
    /// - shift_id: 可选轮值
    /// - statuses: 为空表示全部
    pub async fn list_report_summaries(
        &self,
        shift_id: Option<&str>,
        statuses: &[ReportStatus],
    ) -> ApiResult<Vec<ReportSummary>> {
        let filter = match shift_id {
            Some(raw) => ReportFilter::for_shift(parse_id("shift_id", raw)?),
            None => ReportFilter::default(),
        }
        .with_statuses(statuses);
        Ok(self.review.list_summaries(&filter).await?)
    }
}
