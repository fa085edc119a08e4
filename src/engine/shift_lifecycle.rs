// ==========================================
// 轮值工作流引擎 - 轮值生命周期管理
// ==========================================
// 状态机:
//   Preparing → Started → ReadyForComplete → Finished
//   任意非终态 → Cancelled
// 职责: 驱动状态迁移, 在合适的时点调用派发/审核/淘汰组件
// 约束: 状态迁移与其报告写入同一事务; 通知在提交后发出
// ==========================================

use crate::config::{WorkflowConfigReader, WorkflowSettings};
use crate::domain::member::MemberWithUser;
use crate::domain::request::RequestWithUser;
use crate::domain::shift::{NewShift, Shift, ShiftFilter, ShiftUpdate, ShiftWithTotalUsers};
use crate::domain::types::{MemberStatus, RequestStatus, ShiftStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::member_exclusion::MemberExclusionEvaluator;
use crate::engine::notification::{NotificationDispatcher, NotificationEvent};
use crate::engine::report_review::ReportReviewWorkflow;
use crate::engine::repositories::WorkflowRepositories;
use crate::engine::task_assignment::{AssignmentPlan, TaskAssignmentEngine};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// 结果类型
// ==========================================

/// 轮值开始结果
#[derive(Debug, Clone)]
pub struct ShiftStartOutcome {
    pub shift: Shift,
    pub assigned: usize,       // 首日派发报告数
    pub exhausted: Vec<Uuid>,  // 首日任务池耗尽的成员
}

/// 轮值取消结果
#[derive(Debug, Clone)]
pub struct ShiftCancelOutcome {
    pub shift: Shift,
    pub skipped_reports: usize,
}

/// 单个轮值的每日处理摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTickSummary {
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub skipped_reports: usize,          // 逾期置为 Skipped
    pub assigned: usize,                 // 当日新派发
    pub already_assigned: usize,         // 当日已有报告
    pub exhausted: Vec<Uuid>,            // 任务池耗尽的成员
    pub exclusion_candidates: Vec<Uuid>, // 淘汰候选 (未执行)
    pub moved_to_ready_for_complete: bool,
}

impl DailyTickSummary {
    fn new(shift_id: Uuid, date: NaiveDate) -> Self {
        Self {
            shift_id,
            date,
            skipped_reports: 0,
            assigned: 0,
            already_assigned: 0,
            exhausted: Vec::new(),
            exclusion_candidates: Vec::new(),
            moved_to_ready_for_complete: false,
        }
    }
}

/// 每日处理中失败的轮值 (不影响其他轮值)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftTickFailure {
    pub shift_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyTickReport {
    pub summaries: Vec<DailyTickSummary>,
    pub failures: Vec<ShiftTickFailure>,
}

// ==========================================
// ShiftLifecycleManager
// ==========================================

pub struct ShiftLifecycleManager {
    repos: WorkflowRepositories,
    config: Arc<dyn WorkflowConfigReader>,
    notifier: NotificationDispatcher,
    assignment: Arc<TaskAssignmentEngine>,
    review: Arc<ReportReviewWorkflow>,
    exclusion: Arc<MemberExclusionEvaluator>,
}

impl ShiftLifecycleManager {
    /// 创建生命周期管理器及其下属组件
    ///
    /// # 参数
    /// - repos: 仓储集合
    /// - config: 配置读取器
    /// - notifier: 通知分发器
    pub fn new(
        repos: WorkflowRepositories,
        config: Arc<dyn WorkflowConfigReader>,
        notifier: NotificationDispatcher,
    ) -> Self {
        let assignment = TaskAssignmentEngine::new(repos.clone(), notifier.clone());
        Self::with_assignment(repos, config, notifier, assignment)
    }

    /// 使用指定的派发引擎 (如固定随机种子)
    pub fn with_assignment(
        repos: WorkflowRepositories,
        config: Arc<dyn WorkflowConfigReader>,
        notifier: NotificationDispatcher,
        assignment: TaskAssignmentEngine,
    ) -> Self {
        Self {
            review: Arc::new(ReportReviewWorkflow::new(repos.clone(), notifier.clone())),
            exclusion: Arc::new(MemberExclusionEvaluator::new(
                repos.clone(),
                notifier.clone(),
            )),
            assignment: Arc::new(assignment),
            repos,
            config,
            notifier,
        }
    }

    pub fn assignment(&self) -> &Arc<TaskAssignmentEngine> {
        &self.assignment
    }

    pub fn review(&self) -> &Arc<ReportReviewWorkflow> {
        &self.review
    }

    pub fn exclusion(&self) -> &Arc<MemberExclusionEvaluator> {
        &self.exclusion
    }

    async fn active_user_ids(&self, shift_id: Uuid) -> WorkflowResult<Vec<Uuid>> {
        let members = self
            .repos
            .members
            .list_by_shift(shift_id, Some(MemberStatus::Active))
            .await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    fn validate_shift(shift: &Shift) -> WorkflowResult<()> {
        if shift.title.trim().is_empty() {
            return Err(WorkflowError::Validation("title 不能为空".to_string()));
        }
        if !shift.has_valid_dates() {
            return Err(WorkflowError::Validation(format!(
                "finished_at({}) 早于 started_at({})",
                shift.finished_at, shift.started_at
            )));
        }
        Ok(())
    }

    // ===== 查询与编辑 =====

    /// 创建轮值 (Preparing)
    pub async fn create(&self, draft: NewShift) -> WorkflowResult<Shift> {
        let shift = Shift::new(draft, Local::now().naive_local());
        Self::validate_shift(&shift)?;
        self.repos.shifts.create(&shift).await?;
        info!(shift_id = %shift.id, title = %shift.title, "轮值已创建");
        Ok(shift)
    }

    pub async fn get(&self, shift_id: Uuid) -> WorkflowResult<Shift> {
        Ok(self.repos.shifts.get(shift_id).await?)
    }

    /// 更新轮值资料 (仅 Preparing)
    pub async fn update(&self, shift_id: Uuid, update: ShiftUpdate) -> WorkflowResult<Shift> {
        let mut shift = self.repos.shifts.get(shift_id).await?;
        match shift.status {
            ShiftStatus::Preparing => {}
            ShiftStatus::Started
            | ShiftStatus::ReadyForComplete
            | ShiftStatus::Finished
            | ShiftStatus::Cancelled => {
                return Err(WorkflowError::invalid_state(
                    "Shift",
                    shift_id,
                    shift.status,
                    "update",
                ));
            }
        }

        shift.apply_update(update, Local::now().naive_local());
        Self::validate_shift(&shift)?;
        self.repos.shifts.update(&shift, ShiftStatus::Preparing).await?;
        info!(shift_id = %shift_id, "轮值资料已更新");
        Ok(shift)
    }

    pub async fn list(&self, filter: &ShiftFilter) -> WorkflowResult<Vec<ShiftWithTotalUsers>> {
        Ok(self.repos.shifts.list(filter).await?)
    }

    /// 轮值成员 (+可选成员状态)
    pub async fn members(
        &self,
        shift_id: Uuid,
        status: Option<MemberStatus>,
    ) -> WorkflowResult<Vec<MemberWithUser>> {
        self.repos.shifts.get(shift_id).await?;
        Ok(self.repos.members.list_with_users(shift_id, status).await?)
    }

    /// 轮值入组申请 (+可选申请状态)
    pub async fn requests(
        &self,
        shift_id: Uuid,
        status: Option<RequestStatus>,
    ) -> WorkflowResult<Vec<RequestWithUser>> {
        self.repos.shifts.get(shift_id).await?;
        Ok(self.repos.requests.list_with_users(shift_id, status).await?)
    }

    // ===== 状态迁移 =====

    /// 开始轮值: Preparing → Started, 同一事务写入首日报告
    ///
    /// # 参数
    /// - today: 当前日期 (须 >= started_at)
    pub async fn start(&self, shift_id: Uuid, today: NaiveDate) -> WorkflowResult<ShiftStartOutcome> {
        let shift = self.repos.shifts.get(shift_id).await?;
        if !shift.status.can_transition_to(ShiftStatus::Started) {
            return Err(WorkflowError::invalid_state(
                "Shift",
                shift_id,
                shift.status,
                ShiftStatus::Started,
            ));
        }
        if shift.started_at > today {
            return Err(WorkflowError::Validation(format!(
                "轮值开始日期 {} 晚于今天 {}",
                shift.started_at, today
            )));
        }

        let plan = if shift.covers(today) {
            self.assignment.plan_for_shift(shift_id, today).await?
        } else {
            AssignmentPlan::default()
        };
        self.repos
            .shifts
            .start_with_reports(shift_id, plan.reports())
            .await?;
        info!(
            shift_id = %shift_id,
            from = %ShiftStatus::Preparing,
            to = %ShiftStatus::Started,
            assigned = plan.planned.len(),
            exhausted = plan.exhausted.len(),
            "轮值已开始"
        );

        let user_ids = self.active_user_ids(shift_id).await?;
        let started = NotificationEvent::ShiftStarted {
            shift_id,
            shift_title: shift.title.clone(),
        };
        self.notifier.broadcast(&user_ids, &started).await;
        self.notifier
            .notify_each(plan.planned.iter().map(|p| p.notification()).collect())
            .await;

        Ok(ShiftStartOutcome {
            shift: self.repos.shifts.get(shift_id).await?,
            assigned: plan.planned.len(),
            exhausted: plan.exhausted,
        })
    }

    /// 结束轮值: ReadyForComplete → Finished
    ///
    /// Started 的轮值在同一事务中经 ReadyForComplete 到达 Finished
    ///
    /// # 返回
    /// - `Err(PendingReviews)`: 仍有 Waiting/Reviewing 报告
    pub async fn finish(&self, shift_id: Uuid) -> WorkflowResult<Shift> {
        let shift = self.repos.shifts.get(shift_id).await?;
        let path = shift
            .status
            .path_to(ShiftStatus::Finished)
            .ok_or_else(|| {
                WorkflowError::invalid_state("Shift", shift_id, shift.status, ShiftStatus::Finished)
            })?;

        // 未结束报告的统计与状态迁移在同一事务内
        let open_reports = self.repos.shifts.finish_if_settled(shift_id, path).await?;
        if open_reports > 0 {
            return Err(WorkflowError::PendingReviews {
                shift_id: shift_id.to_string(),
                open_reports,
            });
        }
        info!(
            shift_id = %shift_id,
            from = %shift.status,
            to = %ShiftStatus::Finished,
            "轮值已结束"
        );

        let user_ids = self.active_user_ids(shift_id).await?;
        let event = NotificationEvent::ShiftFinished {
            shift_id,
            final_message: shift.final_message.clone(),
        };
        self.notifier.broadcast(&user_ids, &event).await;

        Ok(self.repos.shifts.get(shift_id).await?)
    }

    /// 取消轮值: 任意非终态 → Cancelled, 未结束报告全部置为 Skipped
    ///
    /// # 参数
    /// - message: 发送给成员的自定义消息 (None 使用默认文案)
    pub async fn cancel(
        &self,
        shift_id: Uuid,
        message: Option<String>,
    ) -> WorkflowResult<ShiftCancelOutcome> {
        let shift = self.repos.shifts.get(shift_id).await?;
        if !shift.status.can_transition_to(ShiftStatus::Cancelled) {
            return Err(WorkflowError::invalid_state(
                "Shift",
                shift_id,
                shift.status,
                ShiftStatus::Cancelled,
            ));
        }

        let skipped_reports = self
            .repos
            .shifts
            .cancel_with_reports(shift_id, shift.status)
            .await?;
        info!(
            shift_id = %shift_id,
            from = %shift.status,
            to = %ShiftStatus::Cancelled,
            skipped_reports,
            "轮值已取消"
        );

        let user_ids = self.active_user_ids(shift_id).await?;
        let event = NotificationEvent::ShiftCancelled {
            shift_id,
            message: message.filter(|m| !m.trim().is_empty()),
        };
        self.notifier.broadcast(&user_ids, &event).await;

        Ok(ShiftCancelOutcome {
            shift: self.repos.shifts.get(shift_id).await?,
            skipped_reports,
        })
    }

    // ===== 每日处理 =====

    /// 淘汰候选 (阈值取自配置)
    pub async fn exclusion_candidates(
        &self,
        shift_id: Uuid,
        today: NaiveDate,
    ) -> WorkflowResult<Vec<MemberWithUser>> {
        let task_amount = self.config.get_exclusion_task_amount().await?;
        self.exclusion
            .members_for_exclusion(shift_id, task_amount, today)
            .await
    }

    /// 对所有运行中轮值执行每日处理
    ///
    /// 单个轮值失败只记录在 failures 中, 不影响其他轮值
    pub async fn run_daily_tick(&self, today: NaiveDate) -> WorkflowResult<DailyTickReport> {
        let settings = self.config.load_settings().await?;
        let shifts = self
            .repos
            .shifts
            .list(&ShiftFilter {
                statuses: vec![ShiftStatus::Started, ShiftStatus::ReadyForComplete],
                ..Default::default()
            })
            .await?;

        let mut report = DailyTickReport::default();
        for item in shifts {
            let shift_id = item.shift.id;
            match self.tick_shift(&item.shift, today, &settings).await {
                Ok(summary) => report.summaries.push(summary),
                Err(e) => {
                    warn!(shift_id = %shift_id, %today, error = %e, "每日处理失败");
                    report.failures.push(ShiftTickFailure {
                        shift_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            %today,
            shifts = report.summaries.len(),
            failures = report.failures.len(),
            "每日处理完成"
        );
        Ok(report)
    }

    /// 单个轮值的每日处理 (可重复执行)
    ///
    /// 1. 逾期 Waiting 报告 → Skipped
    /// 2. Started 且已过 finished_at → ReadyForComplete
    /// 3. 否则派发当日任务并评估淘汰候选
    pub async fn tick_shift(
        &self,
        shift: &Shift,
        today: NaiveDate,
        settings: &WorkflowSettings,
    ) -> WorkflowResult<DailyTickSummary> {
        let mut summary = DailyTickSummary::new(shift.id, today);
        summary.skipped_reports = self
            .review
            .skip_overdue(shift.id, today, settings.report_grace_days)
            .await?;

        match shift.status {
            ShiftStatus::Started if today > shift.finished_at => {
                self.repos
                    .shifts
                    .transition_status(shift.id, ShiftStatus::Started, ShiftStatus::ReadyForComplete)
                    .await?;
                summary.moved_to_ready_for_complete = true;
                info!(
                    shift_id = %shift.id,
                    from = %ShiftStatus::Started,
                    to = %ShiftStatus::ReadyForComplete,
                    "轮值已到期, 停止派发"
                );
            }
            ShiftStatus::Started => {
                if shift.covers(today) {
                    let batch = self.assignment.assign_for_shift(shift, today).await?;
                    summary.assigned = batch.assigned.len();
                    summary.already_assigned = batch.already_assigned;
                    summary.exhausted = batch.exhausted;
                }
                summary.exclusion_candidates = self
                    .exclusion
                    .members_for_exclusion(shift.id, settings.exclusion_task_amount, today)
                    .await?
                    .into_iter()
                    .map(|m| m.member.id)
                    .collect();
            }
            ShiftStatus::ReadyForComplete => {}
            ShiftStatus::Preparing | ShiftStatus::Finished | ShiftStatus::Cancelled => {
                return Err(WorkflowError::invalid_state(
                    "Shift",
                    shift.id,
                    shift.status,
                    "daily_tick",
                ));
            }
        }
        Ok(summary)
    }

    /// 向所有 Started 轮值中当日未提交的成员发送提醒
    ///
    /// # 返回
    /// 成功投递数
    pub async fn send_reminders(&self, today: NaiveDate) -> WorkflowResult<usize> {
        let shifts = self
            .repos
            .shifts
            .list(&ShiftFilter::with_status(ShiftStatus::Started))
            .await?;
        let mut delivered = 0;
        for item in shifts {
            delivered += self.exclusion.send_reminders(item.shift.id, today).await?;
        }
        Ok(delivered)
    }
}
