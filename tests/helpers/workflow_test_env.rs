// ==========================================
// 工作流集成测试环境
// ==========================================
// 职责: 装配临时数据库 + 仓储 + 引擎 + 记录型通知网关
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::error::Error;
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::params;
use tempfile::NamedTempFile;
use uuid::Uuid;

use shift_workflow::config::{WorkflowConfigReader, WorkflowSettings};
use shift_workflow::db::Database;
use shift_workflow::domain::member::Member;
use shift_workflow::domain::report::{Report, ReportFilter};
use shift_workflow::domain::shift::Shift;
use shift_workflow::domain::task::Task;
use shift_workflow::domain::types::{MemberStatus, ReportStatus, ShiftStatus};
use shift_workflow::domain::user::User;
use shift_workflow::repository::sql_utils::{fmt_date, fmt_datetime};
use shift_workflow::engine::{
    EnrollmentWorkflow, NotificationDispatcher, NotificationGateway, ShiftLifecycleManager,
    TaskAssignmentEngine, WorkflowRepositories,
};

use super::mock_gateway::RecordingNotificationGateway;
use super::test_data_builder::{noon, ReportBuilder, ShiftBuilder, UserBuilder};

/// 固定随机种子, 保证派发顺序可复现
pub const TEST_SEED: u64 = 42;

pub struct WorkflowTestEnv {
    pub _temp_file: NamedTempFile,
    pub db: Database,
    pub repos: WorkflowRepositories,
    pub gateway: Arc<RecordingNotificationGateway>,
    pub lifecycle: Arc<ShiftLifecycleManager>,
    pub enrollment: Arc<EnrollmentWorkflow>,
}

impl WorkflowTestEnv {
    /// 默认配置 (淘汰阈值 5, 宽限 0 天)
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::with_settings(WorkflowSettings::default())
    }

    pub fn with_settings(settings: WorkflowSettings) -> Result<Self, Box<dyn Error>> {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let (temp_file, db) = test_helpers::create_test_db()?;
        let config: Arc<dyn WorkflowConfigReader> = Arc::new(settings);
        Ok(Self::assemble(temp_file, db, config, gateway))
    }

    /// 使用数据库中的配置 (ConfigManager)
    pub fn with_db_config() -> Result<Self, Box<dyn Error>> {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let (temp_file, db) = test_helpers::create_test_db()?;
        let config: Arc<dyn WorkflowConfigReader> =
            Arc::new(shift_workflow::config::ConfigManager::new(db.clone()));
        Ok(Self::assemble(temp_file, db, config, gateway))
    }

    fn assemble(
        temp_file: NamedTempFile,
        db: Database,
        config: Arc<dyn WorkflowConfigReader>,
        gateway: Arc<RecordingNotificationGateway>,
    ) -> Self {
        let repos = WorkflowRepositories::sqlite(&db);
        let dyn_gateway: Arc<dyn NotificationGateway> = gateway.clone();
        let notifier = NotificationDispatcher::new(dyn_gateway);
        let assignment = TaskAssignmentEngine::with_seed(repos.clone(), notifier.clone(), TEST_SEED);
        let lifecycle = Arc::new(ShiftLifecycleManager::with_assignment(
            repos.clone(),
            config,
            notifier.clone(),
            assignment,
        ));
        let enrollment = Arc::new(EnrollmentWorkflow::new(repos.clone(), notifier));
        Self {
            _temp_file: temp_file,
            db,
            repos,
            gateway,
            lifecycle,
            enrollment,
        }
    }

    // ===== 数据准备 =====

    pub async fn seed_user(&self, seq: i64) -> User {
        let user = UserBuilder::new(seq).build();
        self.repos.users.create(&user).await.unwrap();
        user
    }

    pub async fn seed_tasks(&self, count: usize) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(count);
        for i in 0..count {
            let task = Task::new(format!("Задание {:02}", i + 1), format!("https://tasks/{}.png", i + 1));
            self.repos.tasks.create(&task).await.unwrap();
            tasks.push(task);
        }
        tasks
    }

    /// 创建筹备中的轮值
    pub async fn create_shift(&self, started_at: NaiveDate, finished_at: NaiveDate) -> Shift {
        self.lifecycle
            .create(ShiftBuilder::new(started_at, finished_at).build())
            .await
            .unwrap()
    }

    /// 直接写入 Active 成员 (绕过申请流程)
    pub async fn add_active_member(&self, shift_id: Uuid, user: &User) -> Member {
        let member = Member::active(user.id, shift_id, noon(1));
        self.repos.members.create(&member).await.unwrap();
        member
    }

    /// 轮值 + n 个 Active 成员
    pub async fn shift_with_members(
        &self,
        started_at: NaiveDate,
        finished_at: NaiveDate,
        members: i64,
    ) -> (Shift, Vec<(User, Member)>) {
        let shift = self.create_shift(started_at, finished_at).await;
        let mut out = Vec::new();
        for seq in 1..=members {
            let user = self.seed_user(seq).await;
            let member = self.add_active_member(shift.id, &user).await;
            out.push((user, member));
        }
        (shift, out)
    }

    pub async fn insert_report(
        &self,
        shift_id: Uuid,
        member_id: Uuid,
        task_id: Uuid,
        task_date: NaiveDate,
        status: ReportStatus,
    ) -> Report {
        let report = ReportBuilder::new(shift_id, member_id, task_id, task_date)
            .status(status)
            .build();
        // 直接写表: 历史报告不受轮值当前状态约束
        let row = report.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO reports (
                         id, shift_id, member_id, task_id, task_date, status, photo_url,
                         uploaded_at, reviewer_id, decline_reason, created_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        row.id.to_string(),
                        row.shift_id.to_string(),
                        row.member_id.to_string(),
                        row.task_id.to_string(),
                        fmt_date(row.task_date),
                        row.status.as_db_str(),
                        row.photo_url,
                        row.uploaded_at.map(fmt_datetime),
                        row.reviewer_id.map(|id| id.to_string()),
                        row.decline_reason,
                        fmt_datetime(row.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        report
    }

    /// 跳过首日派发直接置为 Started
    pub async fn mark_started(&self, shift_id: Uuid) {
        self.repos
            .shifts
            .transition_status(shift_id, ShiftStatus::Preparing, ShiftStatus::Started)
            .await
            .unwrap();
    }

    /// Started 轮值 + n 个 Active 成员 (无首日报告)
    pub async fn started_shift_with_members(
        &self,
        started_at: NaiveDate,
        finished_at: NaiveDate,
        members: i64,
    ) -> (Shift, Vec<(User, Member)>) {
        let (shift, members) = self.shift_with_members(started_at, finished_at, members).await;
        self.mark_started(shift.id).await;
        let shift = self.repos.shifts.get(shift.id).await.unwrap();
        (shift, members)
    }

    /// 未结束 (Waiting/Reviewing) 报告数
    pub async fn open_reports(&self, shift_id: Uuid) -> usize {
        self.repos
            .reports
            .list(&ReportFilter::for_shift(shift_id).with_statuses(&ReportStatus::OPEN))
            .await
            .unwrap()
            .len()
    }

    pub async fn report_status(&self, report_id: Uuid) -> ReportStatus {
        self.repos.reports.get(report_id).await.unwrap().status
    }

    pub async fn member(&self, member_id: Uuid) -> Member {
        self.repos.members.get(member_id).await.unwrap()
    }

    pub async fn member_status(&self, member_id: Uuid) -> MemberStatus {
        self.member(member_id).await.status
    }
}
