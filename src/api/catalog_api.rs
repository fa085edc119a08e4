// ==========================================
// 轮值工作流引擎 - 用户与任务目录 API
// ==========================================
// 职责: 用户注册/资料编辑, 任务目录维护
// 说明: 不涉及工作流状态, 直接访问仓储
// ==========================================

use std::sync::Arc;

use chrono::Local;
use tracing::info;
use uuid::Uuid;

use crate::api::dto::NewUser;
use crate::api::error::{parse_id, ApiError, ApiResult};
use crate::domain::task::Task;
use crate::domain::user::User;
use crate::repository::{TaskRepository, UserRepository};

pub struct CatalogApi {
    users: Arc<dyn UserRepository>,
    tasks: Arc<dyn TaskRepository>,
}

fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

impl CatalogApi {
    pub fn new(users: Arc<dyn UserRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { users, tasks }
    }

    // ===== 用户 =====

    /// 注册用户 (telegram_id / phone_number 唯一)
    pub async fn register_user(&self, draft: NewUser) -> ApiResult<User> {
        require("name", &draft.name)?;
        require("surname", &draft.surname)?;
        require("phone_number", &draft.phone_number)?;

        let user = User {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            surname: draft.surname.trim().to_string(),
            date_of_birth: draft.date_of_birth,
            city: draft.city.trim().to_string(),
            phone_number: draft.phone_number.trim().to_string(),
            telegram_id: draft.telegram_id,
            created_at: Local::now().naive_local(),
        };
        self.users.create(&user).await?;
        info!(user_id = %user.id, telegram_id = user.telegram_id, "用户已注册");
        Ok(user)
    }

    pub async fn get_user_by_telegram_id(&self, telegram_id: i64) -> ApiResult<Option<User>> {
        Ok(self.users.get_by_telegram_id(telegram_id).await?)
    }

    /// 编辑用户资料 (telegram_id 不可变)
    pub async fn update_profile(&self, user_id: &str, profile: NewUser) -> ApiResult<User> {
        let id = parse_id("user_id", user_id)?;
        require("name", &profile.name)?;
        require("surname", &profile.surname)?;
        require("phone_number", &profile.phone_number)?;

        let current = self.users.get(id).await?;
        let user = User {
            name: profile.name.trim().to_string(),
            surname: profile.surname.trim().to_string(),
            date_of_birth: profile.date_of_birth,
            city: profile.city.trim().to_string(),
            phone_number: profile.phone_number.trim().to_string(),
            ..current
        };
        self.users.update_profile(&user).await?;
        Ok(user)
    }

    // ===== 任务目录 =====

    pub async fn create_task(&self, description: &str, url: &str) -> ApiResult<Task> {
        require("description", description)?;
        require("url", url)?;
        let task = Task::new(description.trim(), url.trim());
        self.tasks.create(&task).await?;
        info!(task_id = %task.id, "任务已加入目录");
        Ok(task)
    }

    /// 任务目录 (默认不含已归档)
    pub async fn list_tasks(&self, include_archived: bool) -> ApiResult<Vec<Task>> {
        Ok(self.tasks.list(include_archived).await?)
    }

    /// 归档任务, 此后不再派发
    pub async fn archive_task(&self, task_id: &str) -> ApiResult<()> {
        let id = parse_id("task_id", task_id)?;
        self.tasks.set_archived(id, true).await?;
        info!(task_id = %id, "任务已归档");
        Ok(())
    }
}
