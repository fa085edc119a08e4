// ==========================================
// 轮值工作流引擎 - 入组申请审核
// ==========================================
// 状态: Pending / RepeatedRequest → Approved | Declined
// 批准时在同一事务中创建 Active 成员
// ==========================================

use crate::domain::member::Member;
use crate::domain::request::Request;
use crate::domain::shift::Shift;
use crate::domain::types::{RequestStatus, ShiftStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::notification::{NotificationDispatcher, NotificationEvent};
use crate::engine::repositories::WorkflowRepositories;
use chrono::Local;
use tracing::info;
use uuid::Uuid;

pub struct EnrollmentWorkflow {
    repos: WorkflowRepositories,
    notifier: NotificationDispatcher,
}

impl EnrollmentWorkflow {
    pub fn new(repos: WorkflowRepositories, notifier: NotificationDispatcher) -> Self {
        Self { repos, notifier }
    }

    pub async fn get(&self, request_id: Uuid) -> WorkflowResult<Request> {
        Ok(self.repos.requests.get(request_id).await?)
    }

    /// 用户申请加入轮值
    ///
    /// 同一轮值已有申请时记为 RepeatedRequest
    pub async fn submit_request(&self, user_id: Uuid, shift_id: Uuid) -> WorkflowResult<Request> {
        self.repos.users.get(user_id).await?;
        let shift = self.repos.shifts.get(shift_id).await?;
        match shift.status {
            ShiftStatus::Preparing | ShiftStatus::Started => {}
            ShiftStatus::ReadyForComplete | ShiftStatus::Finished | ShiftStatus::Cancelled => {
                return Err(WorkflowError::invalid_state(
                    "Shift",
                    shift_id,
                    shift.status,
                    "request",
                ));
            }
        }

        if let Some(member) = self
            .repos
            .members
            .get_by_user_and_shift(user_id, shift_id)
            .await?
        {
            return Err(WorkflowError::invalid_state(
                "Member",
                member.id,
                member.status,
                "request",
            ));
        }

        let previous = self
            .repos
            .requests
            .list_by_user_and_shift(user_id, shift_id)
            .await?;
        let status = if previous.is_empty() {
            RequestStatus::Pending
        } else {
            RequestStatus::RepeatedRequest
        };

        let request = Request {
            id: Uuid::new_v4(),
            user_id,
            shift_id,
            status,
            created_at: Local::now().naive_local(),
        };
        self.repos.requests.create(&request).await?;
        info!(request_id = %request.id, %user_id, shift_id = %shift_id, %status, "入组申请已提交");
        Ok(request)
    }

    async fn load_reviewable(
        &self,
        request_id: Uuid,
        attempted: RequestStatus,
    ) -> WorkflowResult<(Request, Shift)> {
        let request = self.repos.requests.get(request_id).await?;
        if !request.status.is_reviewable() {
            return Err(WorkflowError::invalid_state(
                "Request",
                request_id,
                request.status,
                attempted,
            ));
        }
        let shift = self.repos.shifts.get(request.shift_id).await?;
        Ok((request, shift))
    }

    /// 批准申请并创建 Active 成员
    pub async fn approve_request(&self, request_id: Uuid) -> WorkflowResult<Request> {
        let (request, shift) = self
            .load_reviewable(request_id, RequestStatus::Approved)
            .await?;

        let existing = self
            .repos
            .members
            .get_by_user_and_shift(request.user_id, request.shift_id)
            .await?;
        match existing {
            // 成员已存在 (重复申请): 只更新申请状态
            Some(_) => {
                self.repos
                    .requests
                    .transition_status(request_id, request.status, RequestStatus::Approved)
                    .await?
            }
            None => {
                let member =
                    Member::active(request.user_id, request.shift_id, Local::now().naive_local());
                self.repos
                    .requests
                    .approve_with_member(request_id, request.status, &member)
                    .await?;
                info!(member_id = %member.id, shift_id = %shift.id, "成员已加入轮值");
            }
        }

        info!(
            %request_id,
            from = %request.status,
            to = %RequestStatus::Approved,
            "入组申请已批准"
        );
        let event = NotificationEvent::RequestApproved {
            shift_id: shift.id,
            shift_title: shift.title.clone(),
        };
        self.notifier.notify(request.user_id, &event).await;

        Ok(Request {
            status: RequestStatus::Approved,
            ..request
        })
    }

    /// 拒绝申请
    pub async fn decline_request(&self, request_id: Uuid) -> WorkflowResult<Request> {
        let (request, shift) = self
            .load_reviewable(request_id, RequestStatus::Declined)
            .await?;
        self.repos
            .requests
            .transition_status(request_id, request.status, RequestStatus::Declined)
            .await?;

        info!(
            %request_id,
            from = %request.status,
            to = %RequestStatus::Declined,
            "入组申请已拒绝"
        );
        let event = NotificationEvent::RequestDeclined {
            shift_id: shift.id,
            shift_title: shift.title.clone(),
        };
        self.notifier.notify(request.user_id, &event).await;

        Ok(Request {
            status: RequestStatus::Declined,
            ..request
        })
    }

    /// 用户在运行中轮值的积分 (不在任何运行中轮值时为 0)
    pub async fn lombaryer_balance(&self, user_id: Uuid) -> WorkflowResult<i32> {
        let member = self.repos.members.find_in_running_shift(user_id).await?;
        Ok(member.map(|m| m.numbers_lombaryers).unwrap_or(0))
    }
}
