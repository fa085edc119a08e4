// ==========================================
// 每日处理集成测试
// ==========================================
// 测试范围:
// 1. 逾期跳过 + 当日派发, 重复执行幂等
// 2. 过 finished_at 后迁移到 ReadyForComplete, 不再派发
// 3. 淘汰阈值取自 config_kv
// ==========================================

mod helpers;

use helpers::test_data_builder::day;
use helpers::workflow_test_env::WorkflowTestEnv;
use shift_workflow::config::{config_keys, ConfigManager};
use shift_workflow::domain::report::ReportFilter;
use shift_workflow::domain::types::{ReportStatus, ShiftStatus};

#[tokio::test]
async fn test_tick_skips_overdue_and_assigns_today() {
    let env = WorkflowTestEnv::with_db_config().unwrap();
    env.seed_tasks(5).await;
    let (shift, _) = env.shift_with_members(day(1), day(5), 2).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    let _preparing = env.create_shift(day(1), day(5)).await;

    let report = env.lifecycle.run_daily_tick(day(2)).await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.summaries.len(), 1);
    let summary = &report.summaries[0];
    assert_eq!(summary.shift_id, shift.id);
    assert_eq!(summary.skipped_reports, 2);
    assert_eq!(summary.assigned, 2);
    assert!(!summary.moved_to_ready_for_complete);

    let skipped = env
        .repos
        .reports
        .list(&ReportFilter::for_shift(shift.id).with_statuses(&[ReportStatus::Skipped]).on(day(1)))
        .await
        .unwrap();
    assert_eq!(skipped.len(), 2);

    let again = env.lifecycle.run_daily_tick(day(2)).await.unwrap();
    let summary = &again.summaries[0];
    assert_eq!(summary.skipped_reports, 0);
    assert_eq!(summary.assigned, 0);
    assert_eq!(summary.already_assigned, 2);
}

#[tokio::test]
async fn test_tick_moves_expired_shift_to_ready_for_complete() {
    let env = WorkflowTestEnv::with_db_config().unwrap();
    env.seed_tasks(5).await;
    let (shift, _) = env.shift_with_members(day(1), day(3), 1).await;
    env.lifecycle.start(shift.id, day(3)).await.unwrap();
    let open = env
        .repos
        .reports
        .list(&ReportFilter::for_shift(shift.id))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    env.lifecycle
        .review()
        .submit(open[0].id, "https://photos/3.jpg")
        .await
        .unwrap();

    let report = env.lifecycle.run_daily_tick(day(4)).await.unwrap();
    let summary = &report.summaries[0];
    assert!(summary.moved_to_ready_for_complete);
    assert_eq!(summary.assigned, 0);
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::ReadyForComplete
    );

    // 待结束的轮值不再派发, 审核中的报告仍可审核
    let later = env.lifecycle.run_daily_tick(day(5)).await.unwrap();
    assert_eq!(later.summaries[0].assigned, 0);
    assert!(!later.summaries[0].moved_to_ready_for_complete);
    assert_eq!(env.report_status(open[0].id).await, ReportStatus::Reviewing);

    env.lifecycle
        .review()
        .approve(open[0].id, uuid::Uuid::new_v4())
        .await
        .unwrap();
    let finished = env.lifecycle.finish(shift.id).await.unwrap();
    assert_eq!(finished.status, ShiftStatus::Finished);

    let after = env.lifecycle.run_daily_tick(day(6)).await.unwrap();
    assert!(after.summaries.is_empty());
}

#[tokio::test]
async fn test_tick_reports_exclusion_candidates_from_config() {
    let env = WorkflowTestEnv::with_db_config().unwrap();
    let config = ConfigManager::new(env.db.clone());
    config
        .set_config_value(config_keys::EXCLUSION_TASK_AMOUNT, "1")
        .await
        .unwrap();

    env.seed_tasks(5).await;
    let (shift, members) = env.shift_with_members(day(1), day(5), 2).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();

    // 第二个成员按时提交
    let (_, diligent) = &members[1];
    let reports = env
        .repos
        .reports
        .list(&ReportFilter::for_member(diligent.id))
        .await
        .unwrap();
    env.lifecycle
        .review()
        .submit(reports[0].id, "https://photos/ok.jpg")
        .await
        .unwrap();

    let report = env.lifecycle.run_daily_tick(day(2)).await.unwrap();
    let summary = &report.summaries[0];
    assert_eq!(summary.skipped_reports, 1);
    assert_eq!(summary.exclusion_candidates, vec![members[0].1.id]);

    // 候选不会被自动淘汰
    assert_eq!(
        env.member_status(members[0].1.id).await,
        shift_workflow::domain::types::MemberStatus::Active
    );
}

#[tokio::test]
async fn test_tick_with_grace_days_keeps_recent_reports() {
    let env = WorkflowTestEnv::with_db_config().unwrap();
    ConfigManager::new(env.db.clone())
        .set_config_value(config_keys::REPORT_GRACE_DAYS, "2")
        .await
        .unwrap();
    env.seed_tasks(5).await;
    let (shift, _) = env.shift_with_members(day(1), day(5), 1).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();

    let report = env.lifecycle.run_daily_tick(day(2)).await.unwrap();
    assert_eq!(report.summaries[0].skipped_reports, 0);

    let report = env.lifecycle.run_daily_tick(day(4)).await.unwrap();
    // cutoff = day(2): 只有 day(1) 的报告逾期
    assert_eq!(report.summaries[0].skipped_reports, 1);
}
