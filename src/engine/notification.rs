// ==========================================
// 轮值工作流引擎 - 通知网关
// ==========================================
// 职责: 定义通知事件与投递 trait, 实现依赖倒置
// 约束: 通知在状态提交之后发出, 失败只记日志, 不回滚状态
// ==========================================

use crate::i18n::t_with_args;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// 通知事件
// ==========================================

/// 工作流通知事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// 入组申请已批准
    RequestApproved { shift_id: Uuid, shift_title: String },
    /// 入组申请被拒绝
    RequestDeclined { shift_id: Uuid, shift_title: String },
    /// 轮值开始
    ShiftStarted { shift_id: Uuid, shift_title: String },
    /// 当日任务已派发
    TaskAssigned {
        report_id: Uuid,
        task_date: NaiveDate,
        task_description: String,
        task_url: String,
    },
    /// 报告通过, 附最新积分
    ReportApproved {
        report_id: Uuid,
        numbers_lombaryers: i32,
    },
    /// 报告被拒绝
    ReportDeclined {
        report_id: Uuid,
        reason: Option<String>,
    },
    /// 轮值结束, 附结束语
    ShiftFinished { shift_id: Uuid, final_message: String },
    /// 轮值取消
    ShiftCancelled {
        shift_id: Uuid,
        message: Option<String>,
    },
    /// 成员被移出轮值
    MemberExcluded { shift_id: Uuid, shift_title: String },
    /// 当日报告提醒
    DailyReminder { shift_id: Uuid, task_date: NaiveDate },
}

impl NotificationEvent {
    /// 事件类型标识
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::RequestApproved { .. } => "request_approved",
            NotificationEvent::RequestDeclined { .. } => "request_declined",
            NotificationEvent::ShiftStarted { .. } => "shift_started",
            NotificationEvent::TaskAssigned { .. } => "task_assigned",
            NotificationEvent::ReportApproved { .. } => "report_approved",
            NotificationEvent::ReportDeclined { .. } => "report_declined",
            NotificationEvent::ShiftFinished { .. } => "shift_finished",
            NotificationEvent::ShiftCancelled { .. } => "shift_cancelled",
            NotificationEvent::MemberExcluded { .. } => "member_excluded",
            NotificationEvent::DailyReminder { .. } => "daily_reminder",
        }
    }

    /// JSON 载荷 (含 kind 字段)
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// 按当前语言渲染消息文本
    pub fn render(&self) -> String {
        match self {
            NotificationEvent::RequestApproved { shift_title, .. } => {
                t_with_args("notification.request_approved", &[("title", shift_title.as_str())])
            }
            NotificationEvent::RequestDeclined { shift_title, .. } => {
                t_with_args("notification.request_declined", &[("title", shift_title.as_str())])
            }
            NotificationEvent::ShiftStarted { shift_title, .. } => {
                t_with_args("notification.shift_started", &[("title", shift_title.as_str())])
            }
            NotificationEvent::TaskAssigned {
                task_date,
                task_description,
                task_url,
                ..
            } => t_with_args(
                "notification.task_assigned",
                &[
                    ("date", task_date.format("%d.%m.%Y").to_string().as_str()),
                    ("description", task_description.as_str()),
                    ("url", task_url.as_str()),
                ],
            ),
            NotificationEvent::ReportApproved {
                numbers_lombaryers, ..
            } => t_with_args(
                "notification.report_approved",
                &[("lombaryers", numbers_lombaryers.to_string().as_str())],
            ),
            NotificationEvent::ReportDeclined { reason, .. } => match reason {
                Some(reason) => {
                    t_with_args("notification.report_declined_reason", &[("reason", reason.as_str())])
                }
                None => t_with_args("notification.report_declined", &[]),
            },
            NotificationEvent::ShiftFinished { final_message, .. } => final_message.clone(),
            NotificationEvent::ShiftCancelled { message, .. } => match message {
                Some(message) => message.clone(),
                None => t_with_args("notification.shift_cancelled", &[]),
            },
            NotificationEvent::MemberExcluded { shift_title, .. } => {
                t_with_args("notification.member_excluded", &[("title", shift_title.as_str())])
            }
            NotificationEvent::DailyReminder { task_date, .. } => t_with_args(
                "notification.daily_reminder",
                &[("date", task_date.format("%d.%m.%Y").to_string().as_str())],
            ),
        }
    }
}

// ==========================================
// 通知网关 Trait
// ==========================================

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("通知渠道不可用: {0}")]
    Unavailable(String),

    #[error("通知投递失败: user_id={user_id}, {message}")]
    Delivery { user_id: Uuid, message: String },
}

/// 通知投递 Trait
///
/// 引擎层只依赖此 trait; 具体渠道 (消息机器人等) 由外部实现
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// 向用户投递一条事件
    ///
    /// # 返回
    /// - `Err`: 投递失败 (调用方只记录日志)
    async fn notify(&self, user_id: Uuid, event: &NotificationEvent)
        -> Result<(), NotificationError>;
}

/// 空操作网关 (测试/离线运行)
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationGateway;

#[async_trait]
impl NotificationGateway for NoOpNotificationGateway {
    async fn notify(
        &self,
        user_id: Uuid,
        event: &NotificationEvent,
    ) -> Result<(), NotificationError> {
        debug!(%user_id, kind = event.kind(), "NoOpNotificationGateway: 跳过通知");
        Ok(())
    }
}

/// 将通知写入日志的网关 (命令行运行时使用)
#[derive(Debug, Clone, Default)]
pub struct TracingNotificationGateway;

#[async_trait]
impl NotificationGateway for TracingNotificationGateway {
    async fn notify(
        &self,
        user_id: Uuid,
        event: &NotificationEvent,
    ) -> Result<(), NotificationError> {
        info!(
            %user_id,
            kind = event.kind(),
            payload = %event.payload(),
            text = %event.render(),
            "通知"
        );
        Ok(())
    }
}

// ==========================================
// NotificationDispatcher - 尽力而为的投递
// ==========================================

/// 包装网关: 吞掉投递错误并记录 warn 日志
#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self { gateway }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoOpNotificationGateway))
    }

    /// 投递单条通知
    ///
    /// # 返回
    /// 是否投递成功
    pub async fn notify(&self, user_id: Uuid, event: &NotificationEvent) -> bool {
        match self.gateway.notify(user_id, event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%user_id, kind = event.kind(), error = %e, "通知投递失败");
                false
            }
        }
    }

    /// 并发投递给多个用户
    ///
    /// # 返回
    /// 成功投递数
    pub async fn broadcast(&self, user_ids: &[Uuid], event: &NotificationEvent) -> usize {
        let results = join_all(user_ids.iter().map(|id| self.notify(*id, event))).await;
        let delivered = results.into_iter().filter(|ok| *ok).count();
        debug!(
            kind = event.kind(),
            recipients = user_ids.len(),
            delivered,
            "广播通知完成"
        );
        delivered
    }

    /// 逐条投递 (每个用户一条独立事件)
    pub async fn notify_each(&self, messages: Vec<(Uuid, NotificationEvent)>) -> usize {
        let results = join_all(
            messages
                .iter()
                .map(|(user_id, event)| self.notify(*user_id, event)),
        )
        .await;
        results.into_iter().filter(|ok| *ok).count()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::noop()
    }
}
