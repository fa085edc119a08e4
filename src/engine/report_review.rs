// ==========================================
// 轮值工作流引擎 - 报告审核工作流
// ==========================================
// 状态机:
//   Waiting → Reviewing (提交照片)
//   Reviewing → Approved (积分 +1) / Declined
//   Waiting → Skipped (逾期 / 轮值取消)
// 并发控制: 状态 CAS, 审核与积分同一事务
// 通知: 提交之后发出, 失败不回滚
// ==========================================

use crate::domain::report::{Report, ReportFilter, ReportSummary, ReportWithTask, ReviewDecision};
use crate::domain::types::ReportStatus;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::notification::{NotificationDispatcher, NotificationEvent};
use crate::engine::repositories::WorkflowRepositories;
use chrono::{Days, Local, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

pub struct ReportReviewWorkflow {
    repos: WorkflowRepositories,
    notifier: NotificationDispatcher,
}

impl ReportReviewWorkflow {
    pub fn new(repos: WorkflowRepositories, notifier: NotificationDispatcher) -> Self {
        Self { repos, notifier }
    }

    pub async fn get(&self, report_id: Uuid) -> WorkflowResult<Report> {
        Ok(self.repos.reports.get(report_id).await?)
    }

    /// 报告 + 任务详情
    pub async fn get_with_task(&self, report_id: Uuid) -> WorkflowResult<ReportWithTask> {
        let report = self.repos.reports.get(report_id).await?;
        let task = self.repos.tasks.get(report.task_id).await?;
        Ok(ReportWithTask { report, task })
    }

    /// 提交完成照片: Waiting → Reviewing
    ///
    /// # 返回
    /// - `Err(AlreadyReviewed)`: 报告已处于终态
    /// - `Err(InvalidState)`: 报告已在审核中
    pub async fn submit(&self, report_id: Uuid, photo_url: &str) -> WorkflowResult<Report> {
        if photo_url.trim().is_empty() {
            return Err(WorkflowError::Validation("photo_url 不能为空".to_string()));
        }

        let report = self.repos.reports.get(report_id).await?;
        match report.status {
            ReportStatus::Waiting => {}
            ReportStatus::Reviewing => {
                return Err(WorkflowError::invalid_state(
                    "Report",
                    report_id,
                    report.status,
                    ReportStatus::Reviewing,
                ));
            }
            ReportStatus::Approved | ReportStatus::Declined | ReportStatus::Skipped => {
                return Err(WorkflowError::AlreadyReviewed {
                    report_id: report_id.to_string(),
                    status: report.status.to_string(),
                });
            }
        }

        let updated = self
            .repos
            .reports
            .submit_photo(report_id, photo_url.to_string(), Local::now().naive_local())
            .await?;
        info!(
            report_id = %report_id,
            member_id = %updated.member_id,
            from = %ReportStatus::Waiting,
            to = %updated.status,
            "报告已提交审核"
        );
        Ok(updated)
    }

    /// 审核通过: Reviewing → Approved, 成员积分 +1
    pub async fn approve(&self, report_id: Uuid, reviewer_id: Uuid) -> WorkflowResult<Report> {
        self.review(report_id, reviewer_id, ReviewDecision::Approve).await
    }

    /// 审核拒绝: Reviewing → Declined
    pub async fn decline(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        reason: Option<String>,
    ) -> WorkflowResult<Report> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        self.review(report_id, reviewer_id, ReviewDecision::Decline { reason })
            .await
    }

    async fn review(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
    ) -> WorkflowResult<Report> {
        let report = self
            .repos
            .reports
            .apply_review(report_id, reviewer_id, decision.clone())
            .await?;
        info!(
            report_id = %report_id,
            member_id = %report.member_id,
            %reviewer_id,
            from = %ReportStatus::Reviewing,
            to = %report.status,
            "报告审核完成"
        );

        // 以下仅为通知, 失败不影响已提交的审核结果
        let member = match self.repos.members.get(report.member_id).await {
            Ok(member) => member,
            Err(e) => {
                warn!(report_id = %report_id, error = %e, "加载成员失败, 跳过审核通知");
                return Ok(report);
            }
        };
        let event = match decision {
            ReviewDecision::Approve => NotificationEvent::ReportApproved {
                report_id,
                numbers_lombaryers: member.numbers_lombaryers,
            },
            ReviewDecision::Decline { reason } => NotificationEvent::ReportDeclined { report_id, reason },
        };
        self.notifier.notify(member.user_id, &event).await;
        Ok(report)
    }

    /// 管理端报告摘要, task_date 降序
    pub async fn list_summaries(&self, filter: &ReportFilter) -> WorkflowResult<Vec<ReportSummary>> {
        Ok(self.repos.reports.list_summaries(filter).await?)
    }

    /// 逾期未提交的 Waiting 报告置为 Skipped
    ///
    /// # 参数
    /// - grace_days: 宽限天数; 0 表示 task_date 早于 today 即逾期
    ///
    /// # 返回
    /// 本次跳过的报告数 (重复执行返回 0)
    pub async fn skip_overdue(
        &self,
        shift_id: Uuid,
        today: NaiveDate,
        grace_days: u32,
    ) -> WorkflowResult<usize> {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(grace_days)))
            .ok_or_else(|| WorkflowError::Validation(format!("宽限天数超出日期范围: {}", grace_days)))?;
        let skipped = self.repos.reports.skip_waiting_before(shift_id, cutoff).await?;
        if skipped > 0 {
            info!(shift_id = %shift_id, %cutoff, skipped, "逾期报告已跳过");
        }
        Ok(skipped)
    }
}
