// ==========================================
// 轮值工作流引擎 - 成员淘汰评估
// ==========================================
// 规则: 最近 task_amount 天 (不含当天) 的 Skipped 报告数达到 task_amount → 候选
// 评估只读; Active → Excluded 是独立的显式步骤
// 附带: 当日报告仍为 Waiting 的成员提醒
// ==========================================

use crate::domain::member::MemberWithUser;
use crate::domain::types::{MemberStatus, ShiftStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::notification::{NotificationDispatcher, NotificationEvent};
use crate::engine::repositories::WorkflowRepositories;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// 显式淘汰的执行结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionOutcome {
    pub excluded: Vec<Uuid>,   // 本次 Active → Excluded
    pub unchanged: Vec<Uuid>,  // 非 Active 或不属于该轮值, 未处理
}

/// 淘汰评估窗口: [today - task_amount, today - 1]
///
/// task_amount 为 0 时没有窗口
pub fn exclusion_window(today: NaiveDate, task_amount: u32) -> Option<(NaiveDate, NaiveDate)> {
    if task_amount == 0 {
        return None;
    }
    let from = today.checked_sub_days(Days::new(u64::from(task_amount)))?;
    let to = today.checked_sub_days(Days::new(1))?;
    Some((from, to))
}

pub struct MemberExclusionEvaluator {
    repos: WorkflowRepositories,
    notifier: NotificationDispatcher,
}

impl MemberExclusionEvaluator {
    pub fn new(repos: WorkflowRepositories, notifier: NotificationDispatcher) -> Self {
        Self { repos, notifier }
    }

    /// 淘汰候选 (只读)
    ///
    /// # 参数
    /// - task_amount: 连续缺交天数阈值
    /// - today: 评估日 (当天不计入窗口)
    pub async fn members_for_exclusion(
        &self,
        shift_id: Uuid,
        task_amount: u32,
        today: NaiveDate,
    ) -> WorkflowResult<Vec<MemberWithUser>> {
        let Some((from, to)) = exclusion_window(today, task_amount) else {
            return Ok(Vec::new());
        };
        let candidates = self
            .repos
            .members
            .list_with_skipped_at_least(shift_id, from, to, i64::from(task_amount))
            .await?;
        info!(
            shift_id = %shift_id,
            %from,
            %to,
            task_amount,
            candidates = candidates.len(),
            "淘汰候选评估完成"
        );
        Ok(candidates)
    }

    /// 显式淘汰: Active → Excluded 并通知
    ///
    /// 仅限 Started 的轮值; 已淘汰/非 Active 的成员记入 unchanged, 重复执行安全
    pub async fn exclude_members(
        &self,
        shift_id: Uuid,
        member_ids: &[Uuid],
    ) -> WorkflowResult<ExclusionOutcome> {
        let shift = self.repos.shifts.get(shift_id).await?;
        match shift.status {
            ShiftStatus::Started => {}
            ShiftStatus::Preparing
            | ShiftStatus::ReadyForComplete
            | ShiftStatus::Finished
            | ShiftStatus::Cancelled => {
                return Err(WorkflowError::invalid_state(
                    "Shift",
                    shift_id,
                    shift.status,
                    "exclude_members",
                ));
            }
        }
        let mut outcome = ExclusionOutcome::default();

        for &member_id in member_ids {
            let member = self.repos.members.get(member_id).await?;
            if member.shift_id != shift_id {
                warn!(%member_id, shift_id = %shift_id, "成员不属于该轮值, 跳过");
                outcome.unchanged.push(member_id);
                continue;
            }

            match self
                .repos
                .members
                .transition_status(member_id, MemberStatus::Active, MemberStatus::Excluded)
                .await
                .map_err(WorkflowError::from)
            {
                Ok(()) => {
                    info!(
                        %member_id,
                        shift_id = %shift_id,
                        from = %MemberStatus::Active,
                        to = %MemberStatus::Excluded,
                        "成员已淘汰"
                    );
                    let event = NotificationEvent::MemberExcluded {
                        shift_id,
                        shift_title: shift.title.clone(),
                    };
                    self.notifier.notify(member.user_id, &event).await;
                    outcome.excluded.push(member_id);
                }
                Err(WorkflowError::InvalidState { current, .. }) => {
                    warn!(%member_id, %current, "成员非 Active, 跳过淘汰");
                    outcome.unchanged.push(member_id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    /// 当日报告仍为 Waiting 的 Active 成员
    pub async fn members_for_reminding(
        &self,
        shift_id: Uuid,
        today: NaiveDate,
    ) -> WorkflowResult<Vec<MemberWithUser>> {
        Ok(self.repos.members.list_waiting_on(shift_id, today).await?)
    }

    /// 发送当日提醒
    ///
    /// # 返回
    /// 成功投递数
    pub async fn send_reminders(&self, shift_id: Uuid, today: NaiveDate) -> WorkflowResult<usize> {
        let members = self.members_for_reminding(shift_id, today).await?;
        let user_ids: Vec<Uuid> = members.iter().map(|m| m.user.id).collect();
        let event = NotificationEvent::DailyReminder {
            shift_id,
            task_date: today,
        };
        let delivered = self.notifier.broadcast(&user_ids, &event).await;
        info!(shift_id = %shift_id, %today, recipients = user_ids.len(), delivered, "当日提醒已发送");
        Ok(delivered)
    }
}
