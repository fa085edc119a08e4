// ==========================================
// 轮值工作流引擎 - 任务目录领域模型
// ==========================================
// 任务为可复用目录项, 由报告引用, 不被报告拥有
// ==========================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,             // 任务ID
    pub description: String,  // 任务描述 (唯一)
    pub url: String,          // 任务图片地址 (唯一)
    pub is_archived: bool,    // 已归档的任务不再派发
}

impl Task {
    pub fn new(description: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            url: url.into(),
            is_archived: false,
        }
    }
}
