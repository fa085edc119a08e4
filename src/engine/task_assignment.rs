// ==========================================
// 轮值工作流引擎 - 每日任务派发引擎
// ==========================================
// 规则:
// - 只给 Active 成员派发
// - 同一轮值内, 一个任务对同一成员不重复
// - 候选集内均匀随机; 候选集为空 → NoEligibleTask (可恢复)
// - 幂等: (member, task_date) 已有报告时不再派发
// ==========================================

use crate::domain::member::Member;
use crate::domain::report::{Report, ReportFilter};
use crate::domain::shift::Shift;
use crate::domain::task::Task;
use crate::domain::types::MemberStatus;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::notification::{NotificationDispatcher, NotificationEvent};
use crate::engine::repositories::WorkflowRepositories;
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 已规划 (尚未落库) 的一次派发
#[derive(Debug, Clone)]
pub struct PlannedAssignment {
    pub member: Member,
    pub task: Task,
    pub report: Report,
}

impl PlannedAssignment {
    pub fn notification(&self) -> (Uuid, NotificationEvent) {
        (
            self.member.user_id,
            NotificationEvent::TaskAssigned {
                report_id: self.report.id,
                task_date: self.report.task_date,
                task_description: self.task.description.clone(),
                task_url: self.task.url.clone(),
            },
        )
    }
}

/// 单成员派发结果
#[derive(Debug, Clone)]
pub enum AssignmentOutcome {
    /// 新建报告
    Assigned(Report),
    /// 当日已有报告 (幂等命中)
    AlreadyAssigned(Report),
}

impl AssignmentOutcome {
    pub fn report(&self) -> &Report {
        match self {
            AssignmentOutcome::Assigned(report) | AssignmentOutcome::AlreadyAssigned(report) => {
                report
            }
        }
    }
}

/// 全轮值批量派发结果
#[derive(Debug, Clone, Default)]
pub struct AssignmentBatch {
    pub assigned: Vec<Report>,      // 本次新建
    pub already_assigned: usize,    // 当日已有报告
    pub exhausted: Vec<Uuid>,       // 任务池耗尽的成员
}

/// 首日派发计划 (轮值开始时随状态迁移一起提交)
#[derive(Debug, Clone, Default)]
pub struct AssignmentPlan {
    pub planned: Vec<PlannedAssignment>,
    pub exhausted: Vec<Uuid>,
}

impl AssignmentPlan {
    pub fn reports(&self) -> Vec<Report> {
        self.planned.iter().map(|p| p.report.clone()).collect()
    }
}

// ==========================================
// TaskAssignmentEngine
// ==========================================

pub struct TaskAssignmentEngine {
    repos: WorkflowRepositories,
    notifier: NotificationDispatcher,
    rng: Mutex<StdRng>,
}

impl TaskAssignmentEngine {
    pub fn new(repos: WorkflowRepositories, notifier: NotificationDispatcher) -> Self {
        Self::with_rng(repos, notifier, StdRng::from_entropy())
    }

    /// 固定随机种子 (可复现的派发顺序)
    pub fn with_seed(
        repos: WorkflowRepositories,
        notifier: NotificationDispatcher,
        seed: u64,
    ) -> Self {
        Self::with_rng(repos, notifier, StdRng::seed_from_u64(seed))
    }

    fn with_rng(repos: WorkflowRepositories, notifier: NotificationDispatcher, rng: StdRng) -> Self {
        Self {
            repos,
            notifier,
            rng: Mutex::new(rng),
        }
    }

    /// 在候选任务中均匀随机选择一个
    fn choose(&self, eligible: &[Task]) -> Option<Task> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        eligible.choose(&mut *rng).cloned()
    }

    /// 计算成员的候选任务: 未归档且本轮值内未派发过
    pub async fn eligible_tasks(&self, member: &Member) -> WorkflowResult<Vec<Task>> {
        let catalog = self.repos.tasks.list(false).await?;
        let consumed: HashSet<Uuid> = self
            .repos
            .reports
            .list(&ReportFilter::for_member(member.id))
            .await?
            .into_iter()
            .map(|r| r.task_id)
            .collect();

        Ok(catalog
            .into_iter()
            .filter(|task| !consumed.contains(&task.id))
            .collect())
    }

    /// 为成员规划某日的派发 (只读, 不落库)
    ///
    /// # 返回
    /// - `Err(NoEligibleTask)`: 任务池耗尽
    pub async fn plan_for_member(
        &self,
        member: &Member,
        date: NaiveDate,
    ) -> WorkflowResult<PlannedAssignment> {
        let eligible = self.eligible_tasks(member).await?;
        let task = self
            .choose(&eligible)
            .ok_or_else(|| WorkflowError::NoEligibleTask {
                member_id: member.id.to_string(),
            })?;

        let report = Report::waiting(
            member.shift_id,
            member.id,
            task.id,
            date,
            Local::now().naive_local(),
        );
        debug!(
            member_id = %member.id,
            task_id = %task.id,
            %date,
            eligible = eligible.len(),
            "规划任务派发"
        );
        Ok(PlannedAssignment {
            member: member.clone(),
            task,
            report,
        })
    }

    /// 为所有 Active 成员规划同一日的派发 (成员间互相隔离)
    pub async fn plan_for_shift(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> WorkflowResult<AssignmentPlan> {
        let members = self
            .repos
            .members
            .list_by_shift(shift_id, Some(MemberStatus::Active))
            .await?;

        let mut plan = AssignmentPlan::default();
        for member in &members {
            match self.plan_for_member(member, date).await {
                Ok(planned) => plan.planned.push(planned),
                Err(e) if e.is_recoverable() => {
                    warn!(member_id = %member.id, %date, "任务池耗尽, 当日跳过该成员");
                    plan.exhausted.push(member.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(plan)
    }

    async fn existing_report(
        &self,
        member_id: Uuid,
        date: NaiveDate,
    ) -> WorkflowResult<Option<Report>> {
        let mut reports = self
            .repos
            .reports
            .list(&ReportFilter::for_member(member_id).on(date))
            .await?;
        Ok(reports.pop())
    }

    /// 为单个成员派发某日任务并通知
    pub async fn assign(&self, member: &Member, date: NaiveDate) -> WorkflowResult<AssignmentOutcome> {
        match member.status {
            MemberStatus::Active => {}
            MemberStatus::Pending | MemberStatus::Excluded => {
                return Err(WorkflowError::invalid_state(
                    "Member",
                    member.id,
                    member.status,
                    "assign_task",
                ));
            }
        }

        if let Some(existing) = self.existing_report(member.id, date).await? {
            return Ok(AssignmentOutcome::AlreadyAssigned(existing));
        }

        let planned = self.plan_for_member(member, date).await?;
        if let Err(e) = self.repos.reports.create(&planned.report).await {
            // 并发派发: 以先落库者为准
            if e.is_unique_violation() {
                if let Some(existing) = self.existing_report(member.id, date).await? {
                    return Ok(AssignmentOutcome::AlreadyAssigned(existing));
                }
            }
            return Err(e.into());
        }

        info!(
            member_id = %member.id,
            report_id = %planned.report.id,
            task_id = %planned.task.id,
            %date,
            "任务已派发"
        );
        let (user_id, event) = planned.notification();
        self.notifier.notify(user_id, &event).await;
        Ok(AssignmentOutcome::Assigned(planned.report))
    }

    /// 为轮值内所有 Active 成员派发某日任务
    ///
    /// 单个成员任务池耗尽不影响其他成员; 基础设施错误直接返回
    pub async fn assign_for_shift(
        &self,
        shift: &Shift,
        date: NaiveDate,
    ) -> WorkflowResult<AssignmentBatch> {
        let members = self
            .repos
            .members
            .list_by_shift(shift.id, Some(MemberStatus::Active))
            .await?;

        let mut batch = AssignmentBatch::default();
        for member in &members {
            match self.assign(member, date).await {
                Ok(AssignmentOutcome::Assigned(report)) => batch.assigned.push(report),
                Ok(AssignmentOutcome::AlreadyAssigned(_)) => batch.already_assigned += 1,
                Err(e) if e.is_recoverable() => {
                    warn!(member_id = %member.id, %date, "任务池耗尽, 当日跳过该成员");
                    batch.exhausted.push(member.id);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            shift_id = %shift.id,
            %date,
            assigned = batch.assigned.len(),
            already_assigned = batch.already_assigned,
            exhausted = batch.exhausted.len(),
            "批量派发完成"
        );
        Ok(batch)
    }
}
