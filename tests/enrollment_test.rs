// ==========================================
// 入组申请集成测试
// ==========================================
// 测试范围:
// 1. 申请 Pending / 重复申请 RepeatedRequest
// 2. 批准创建 Active 成员并通知
// 3. 已审核的申请不可再次审核
// 4. 积分查询
// ==========================================

mod helpers;

use helpers::test_data_builder::day;
use helpers::workflow_test_env::WorkflowTestEnv;
use shift_workflow::domain::types::{MemberStatus, ReportStatus, RequestStatus, ShiftStatus};
use shift_workflow::engine::WorkflowError;
use uuid::Uuid;

#[tokio::test]
async fn test_submit_and_repeat_request() {
    let env = WorkflowTestEnv::new().unwrap();
    let user = env.seed_user(1).await;
    let shift = env.create_shift(day(1), day(10)).await;

    let first = env.enrollment.submit_request(user.id, shift.id).await.unwrap();
    assert_eq!(first.status, RequestStatus::Pending);

    let second = env.enrollment.submit_request(user.id, shift.id).await.unwrap();
    assert_eq!(second.status, RequestStatus::RepeatedRequest);

    let listed = env
        .lifecycle
        .requests(shift.id, Some(RequestStatus::RepeatedRequest))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].request.id, second.id);
    assert_eq!(listed[0].user.telegram_id, user.telegram_id);
}

#[tokio::test]
async fn test_submit_request_requires_open_shift() {
    let env = WorkflowTestEnv::new().unwrap();
    let user = env.seed_user(1).await;
    let shift = env.create_shift(day(1), day(10)).await;
    env.lifecycle.cancel(shift.id, None).await.unwrap();

    let result = env.enrollment.submit_request(user.id, shift.id).await;
    assert!(matches!(result, Err(WorkflowError::InvalidState { .. })));

    let unknown_user = env.enrollment.submit_request(Uuid::new_v4(), shift.id).await;
    assert!(matches!(unknown_user, Err(WorkflowError::NotFound { .. })));
}

#[tokio::test]
async fn test_approve_creates_active_member_once() {
    let env = WorkflowTestEnv::new().unwrap();
    let user = env.seed_user(1).await;
    let shift = env.create_shift(day(1), day(10)).await;
    let request = env.enrollment.submit_request(user.id, shift.id).await.unwrap();

    let approved = env.enrollment.approve_request(request.id).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);

    let members = env
        .lifecycle
        .members(shift.id, Some(MemberStatus::Active))
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user.id, user.id);
    assert_eq!(members[0].member.numbers_lombaryers, 0);
    assert_eq!(env.gateway.recipients_of("request_approved"), vec![user.id]);

    let again = env.enrollment.approve_request(request.id).await;
    assert!(matches!(again, Err(WorkflowError::InvalidState { .. })));
    let declined_after = env.enrollment.decline_request(request.id).await;
    assert!(matches!(declined_after, Err(WorkflowError::InvalidState { .. })));

    // 已是成员时不可再申请
    let repeat = env.enrollment.submit_request(user.id, shift.id).await;
    assert!(matches!(repeat, Err(WorkflowError::InvalidState { .. })));
}

#[tokio::test]
async fn test_decline_request_notifies_without_member() {
    let env = WorkflowTestEnv::new().unwrap();
    let user = env.seed_user(1).await;
    let shift = env.create_shift(day(1), day(10)).await;
    let request = env.enrollment.submit_request(user.id, shift.id).await.unwrap();

    let declined = env.enrollment.decline_request(request.id).await.unwrap();
    assert_eq!(declined.status, RequestStatus::Declined);
    assert!(env.lifecycle.members(shift.id, None).await.unwrap().is_empty());
    assert_eq!(env.gateway.recipients_of("request_declined"), vec![user.id]);
}

#[tokio::test]
async fn test_lombaryer_balance_in_running_shift() {
    let env = WorkflowTestEnv::new().unwrap();
    let tasks = env.seed_tasks(2).await;
    let (shift, members) = env.shift_with_members(day(1), day(10), 1).await;
    let (user, member) = &members[0];

    assert_eq!(env.enrollment.lombaryer_balance(user.id).await.unwrap(), 0);

    env.lifecycle.start(shift.id, day(11)).await.unwrap();
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Started
    );
    for (i, task) in tasks.iter().enumerate() {
        let report = env
            .insert_report(shift.id, member.id, task.id, day(i as u32 + 1), ReportStatus::Reviewing)
            .await;
        env.lifecycle
            .review()
            .approve(report.id, Uuid::new_v4())
            .await
            .unwrap();
    }
    assert_eq!(env.enrollment.lombaryer_balance(user.id).await.unwrap(), 2);

    let stranger = env.seed_user(99).await;
    assert_eq!(env.enrollment.lombaryer_balance(stranger.id).await.unwrap(), 0);
}
