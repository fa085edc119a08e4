// ==========================================
// Mock 通知网关 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use shift_workflow::engine::{NotificationError, NotificationEvent, NotificationGateway};
use std::sync::Mutex;
use uuid::Uuid;

/// 记录所有投递的网关
#[derive(Debug, Default)]
pub struct RecordingNotificationGateway {
    sent: Mutex<Vec<(Uuid, NotificationEvent)>>,
}

impl RecordingNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Uuid, NotificationEvent)> {
        self.sent.lock().unwrap().clone()
    }

    /// 某类事件的接收者
    pub fn recipients_of(&self, kind: &str) -> Vec<Uuid> {
        self.sent()
            .into_iter()
            .filter(|(_, event)| event.kind() == kind)
            .map(|(user_id, _)| user_id)
            .collect()
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.recipients_of(kind).len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn notify(&self, user_id: Uuid, event: &NotificationEvent) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((user_id, event.clone()));
        Ok(())
    }
}

/// 总是投递失败的网关
#[derive(Debug, Default)]
pub struct FailingNotificationGateway;

#[async_trait]
impl NotificationGateway for FailingNotificationGateway {
    async fn notify(&self, _user_id: Uuid, _event: &NotificationEvent) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("telegram offline".to_string()))
    }
}
