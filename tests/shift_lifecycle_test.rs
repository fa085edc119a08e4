// ==========================================
// 轮值生命周期集成测试
// ==========================================
// 测试范围:
// 1. 状态边: Preparing→{Started,Cancelled}, Started→{ReadyForComplete,Cancelled},
//    ReadyForComplete→{Finished,Cancelled}; Finished/Cancelled 为终态
// 2. 开始轮值派发首日任务
// 3. 结束前待处理报告检查
// 4. 取消轮值跳过未结束报告
// 5. 取消/结束之前取得的轮值快照不能再写入报告
// ==========================================

mod helpers;

use helpers::test_data_builder::{day, ShiftBuilder};
use helpers::workflow_test_env::WorkflowTestEnv;
use shift_workflow::domain::report::ReportFilter;
use shift_workflow::domain::shift::{ShiftFilter, ShiftSort, ShiftUpdate};
use shift_workflow::config::WorkflowSettings;
use shift_workflow::domain::types::{ReportStatus, ShiftStatus};
use shift_workflow::engine::WorkflowError;
use uuid::Uuid;

// ==========================================
// 创建与编辑
// ==========================================

#[tokio::test]
async fn test_create_shift_starts_in_preparing() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(1), day(10)).await;

    assert_eq!(shift.status, ShiftStatus::Preparing);
    let loaded = env.lifecycle.get(shift.id).await.unwrap();
    assert_eq!(loaded.id, shift.id);
    assert_eq!(loaded.status, ShiftStatus::Preparing);
    assert_eq!(loaded.started_at, day(1));
    assert_eq!(loaded.finished_at, day(10));
}

#[tokio::test]
async fn test_create_shift_rejects_inverted_dates() {
    let env = WorkflowTestEnv::new().unwrap();
    let result = env
        .lifecycle
        .create(ShiftBuilder::new(day(10), day(1)).build())
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));

    let result = env
        .lifecycle
        .create(ShiftBuilder::new(day(1), day(2)).title("  ").build())
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
async fn test_update_only_while_preparing() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(1), day(10)).await;

    let updated = env
        .lifecycle
        .update(
            shift.id,
            ShiftUpdate {
                title: Some("Летняя смена".to_string()),
                finished_at: Some(day(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Летняя смена");
    assert_eq!(updated.finished_at, day(12));
    assert_eq!(updated.started_at, day(1));

    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    let result = env
        .lifecycle
        .update(
            shift.id,
            ShiftUpdate {
                title: Some("Поздно".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidState { .. })));
}

#[tokio::test]
async fn test_update_cannot_invert_dates() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(5), day(10)).await;
    let result = env
        .lifecycle
        .update(
            shift.id,
            ShiftUpdate {
                finished_at: Some(day(4)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
async fn test_list_shifts_with_member_counts() {
    let env = WorkflowTestEnv::new().unwrap();
    let (first, _) = env.shift_with_members(day(1), day(5), 2).await;
    let second = env.create_shift(day(3), day(20)).await;
    env.lifecycle.cancel(second.id, None).await.unwrap();

    let all = env
        .lifecycle
        .list(&ShiftFilter {
            statuses: vec![],
            sort: ShiftSort::FinishedAt,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].shift.id, second.id);
    assert_eq!(all[1].shift.id, first.id);
    assert_eq!(all[1].total_users, 2);

    let preparing = env
        .lifecycle
        .list(&ShiftFilter::with_status(ShiftStatus::Preparing))
        .await
        .unwrap();
    assert_eq!(preparing.len(), 1);
    assert_eq!(preparing[0].shift.id, first.id);
}

#[tokio::test]
async fn test_get_unknown_shift_is_not_found() {
    let env = WorkflowTestEnv::new().unwrap();
    let result = env.lifecycle.get(Uuid::new_v4()).await;
    assert!(matches!(result, Err(WorkflowError::NotFound { .. })));
}

// ==========================================
// 开始
// ==========================================

#[tokio::test]
async fn test_start_assigns_first_day_tasks_and_notifies() {
    let env = WorkflowTestEnv::new().unwrap();
    env.seed_tasks(5).await;
    let (shift, members) = env.shift_with_members(day(1), day(10), 3).await;

    let outcome = env.lifecycle.start(shift.id, day(1)).await.unwrap();
    assert_eq!(outcome.shift.status, ShiftStatus::Started);
    assert_eq!(outcome.assigned, 3);
    assert!(outcome.exhausted.is_empty());

    let reports = env
        .repos
        .reports
        .list(&ReportFilter::for_shift(shift.id).on(day(1)))
        .await
        .unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.status == ReportStatus::Waiting));

    assert_eq!(env.gateway.count_of("shift_started"), 3);
    assert_eq!(env.gateway.count_of("task_assigned"), 3);
    let mut notified = env.gateway.recipients_of("task_assigned");
    notified.sort();
    let mut expected: Vec<Uuid> = members.iter().map(|(u, _)| u.id).collect();
    expected.sort();
    assert_eq!(notified, expected);
}

#[tokio::test]
async fn test_start_before_started_at_is_rejected() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(5), day(10)).await;

    let result = env.lifecycle.start(shift.id, day(4)).await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Preparing
    );
}

#[tokio::test]
async fn test_start_after_finished_at_assigns_nothing() {
    let env = WorkflowTestEnv::new().unwrap();
    env.seed_tasks(3).await;
    let (shift, _) = env.shift_with_members(day(1), day(3), 2).await;

    let outcome = env.lifecycle.start(shift.id, day(7)).await.unwrap();
    assert_eq!(outcome.shift.status, ShiftStatus::Started);
    assert_eq!(outcome.assigned, 0);
}

#[tokio::test]
async fn test_start_with_empty_catalog_reports_exhausted_members() {
    let env = WorkflowTestEnv::new().unwrap();
    let (shift, members) = env.shift_with_members(day(1), day(3), 2).await;

    let outcome = env.lifecycle.start(shift.id, day(1)).await.unwrap();
    assert_eq!(outcome.shift.status, ShiftStatus::Started);
    assert_eq!(outcome.assigned, 0);
    assert_eq!(outcome.exhausted.len(), members.len());
}

// ==========================================
// 状态边
// ==========================================

#[tokio::test]
async fn test_terminal_states_reject_every_transition() {
    let env = WorkflowTestEnv::new().unwrap();

    let finished = env.create_shift(day(1), day(2)).await;
    env.lifecycle.start(finished.id, day(1)).await.unwrap();
    env.lifecycle.finish(finished.id).await.unwrap();

    let cancelled = env.create_shift(day(1), day(2)).await;
    env.lifecycle.cancel(cancelled.id, None).await.unwrap();

    for id in [finished.id, cancelled.id] {
        assert!(matches!(
            env.lifecycle.start(id, day(1)).await,
            Err(WorkflowError::InvalidState { .. })
        ));
        assert!(matches!(
            env.lifecycle.finish(id).await,
            Err(WorkflowError::InvalidState { .. })
        ));
        assert!(matches!(
            env.lifecycle.cancel(id, None).await,
            Err(WorkflowError::InvalidState { .. })
        ));
    }
}

#[tokio::test]
async fn test_preparing_cannot_finish() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(1), day(2)).await;

    match env.lifecycle.finish(shift.id).await {
        Err(WorkflowError::InvalidState {
            current, attempted, ..
        }) => {
            assert_eq!(current, ShiftStatus::Preparing.to_string());
            assert_eq!(attempted, ShiftStatus::Finished.to_string());
        }
        other => panic!("期望 InvalidState, 实际 {:?}", other),
    }
}

#[tokio::test]
async fn test_started_cannot_start_again() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(1), day(2)).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();

    assert!(matches!(
        env.lifecycle.start(shift.id, day(1)).await,
        Err(WorkflowError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_ready_for_complete_can_be_cancelled() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env.create_shift(day(1), day(2)).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    env.repos
        .shifts
        .transition_status(shift.id, ShiftStatus::Started, ShiftStatus::ReadyForComplete)
        .await
        .unwrap();

    let outcome = env.lifecycle.cancel(shift.id, None).await.unwrap();
    assert_eq!(outcome.shift.status, ShiftStatus::Cancelled);
}

// ==========================================
// 结束
// ==========================================

#[tokio::test]
async fn test_finish_blocked_by_reviewing_report_until_declined() {
    let env = WorkflowTestEnv::new().unwrap();
    let tasks = env.seed_tasks(1).await;
    let (shift, members) = env.shift_with_members(day(1), day(5), 1).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    let (user, _) = &members[0];

    let report = env
        .repos
        .reports
        .list(&ReportFilter::for_shift(shift.id))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(report.task_id, tasks[0].id);
    env.lifecycle
        .review()
        .submit(report.id, "https://photos/1.jpg")
        .await
        .unwrap();

    match env.lifecycle.finish(shift.id).await {
        Err(WorkflowError::PendingReviews { open_reports, .. }) => assert_eq!(open_reports, 1),
        other => panic!("期望 PendingReviews, 实际 {:?}", other),
    }
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Started
    );

    env.lifecycle
        .review()
        .decline(report.id, Uuid::new_v4(), Some("фото размыто".to_string()))
        .await
        .unwrap();

    let finished = env.lifecycle.finish(shift.id).await.unwrap();
    assert_eq!(finished.status, ShiftStatus::Finished);
    assert_eq!(env.gateway.recipients_of("shift_finished"), vec![user.id]);
}

#[tokio::test]
async fn test_finish_blocked_by_waiting_report() {
    let env = WorkflowTestEnv::new().unwrap();
    env.seed_tasks(2).await;
    let (shift, _) = env.shift_with_members(day(1), day(5), 2).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();

    match env.lifecycle.finish(shift.id).await {
        Err(WorkflowError::PendingReviews { open_reports, .. }) => assert_eq!(open_reports, 2),
        other => panic!("期望 PendingReviews, 实际 {:?}", other),
    }
}

#[tokio::test]
async fn test_finish_from_ready_for_complete_sends_final_message() {
    let env = WorkflowTestEnv::new().unwrap();
    let shift = env
        .lifecycle
        .create(
            ShiftBuilder::new(day(1), day(2))
                .final_message("До встречи!")
                .build(),
        )
        .await
        .unwrap();
    let user = env.seed_user(1).await;
    env.add_active_member(shift.id, &user).await;
    env.lifecycle.start(shift.id, day(3)).await.unwrap();
    env.repos
        .shifts
        .transition_status(shift.id, ShiftStatus::Started, ShiftStatus::ReadyForComplete)
        .await
        .unwrap();

    let finished = env.lifecycle.finish(shift.id).await.unwrap();
    assert_eq!(finished.status, ShiftStatus::Finished);

    let sent = env.gateway.sent();
    let (recipient, event) = sent
        .iter()
        .find(|(_, e)| e.kind() == "shift_finished")
        .unwrap();
    assert_eq!(*recipient, user.id);
    assert_eq!(event.render(), "До встречи!");
}

// ==========================================
// 取消
// ==========================================

#[tokio::test]
async fn test_cancel_skips_all_open_reports() {
    let env = WorkflowTestEnv::new().unwrap();
    let (shift, members) = env.shift_with_members(day(1), day(5), 2).await;
    // 空任务目录下开始, 不产生首日报告
    env.lifecycle.start(shift.id, day(5)).await.unwrap();
    let tasks = env.seed_tasks(3).await;

    let (_, first) = &members[0];
    let (_, second) = &members[1];
    let waiting = env
        .insert_report(shift.id, first.id, tasks[0].id, day(1), ReportStatus::Waiting)
        .await;
    let reviewing = env
        .insert_report(shift.id, second.id, tasks[1].id, day(1), ReportStatus::Reviewing)
        .await;
    let approved = env
        .insert_report(shift.id, first.id, tasks[2].id, day(2), ReportStatus::Approved)
        .await;

    let outcome = env
        .lifecycle
        .cancel(shift.id, Some("Смена отменена из-за погоды".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.shift.status, ShiftStatus::Cancelled);
    assert_eq!(env.report_status(waiting.id).await, ReportStatus::Skipped);
    assert_eq!(env.report_status(reviewing.id).await, ReportStatus::Skipped);
    assert_eq!(env.report_status(approved.id).await, ReportStatus::Approved);
    assert_eq!(env.open_reports(shift.id).await, 0);

    let cancelled: Vec<_> = env
        .gateway
        .sent()
        .into_iter()
        .filter(|(_, e)| e.kind() == "shift_cancelled")
        .collect();
    assert_eq!(cancelled.len(), 2);
    assert_eq!(cancelled[0].1.render(), "Смена отменена из-за погоды");
}

// ==========================================
// 过期快照
// ==========================================

#[tokio::test]
async fn test_stale_tick_after_cancel_leaves_no_open_reports() {
    let env = WorkflowTestEnv::new().unwrap();
    env.seed_tasks(5).await;
    let (shift, _) = env.shift_with_members(day(1), day(10), 2).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    let stale = env.lifecycle.get(shift.id).await.unwrap();
    assert_eq!(stale.status, ShiftStatus::Started);

    env.lifecycle.cancel(shift.id, None).await.unwrap();

    let result = env
        .lifecycle
        .tick_shift(&stale, day(2), &WorkflowSettings::default())
        .await;
    match result {
        Err(WorkflowError::InvalidState { entity, current, .. }) => {
            assert_eq!(entity, "Shift");
            assert_eq!(current, "cancelled");
        }
        other => panic!("期望 InvalidState, 实际 {:?}", other),
    }
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Cancelled
    );
    assert_eq!(env.open_reports(shift.id).await, 0);
    // 只有首日派发
    assert_eq!(env.gateway.count_of("task_assigned"), 2);
}

#[tokio::test]
async fn test_stale_tick_after_finish_leaves_no_open_reports() {
    let env = WorkflowTestEnv::new().unwrap();
    let (shift, _) = env.shift_with_members(day(1), day(10), 2).await;
    // 空任务目录下开始, 首日无报告, 可直接结束
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    env.seed_tasks(5).await;
    let stale = env.lifecycle.get(shift.id).await.unwrap();

    let finished = env.lifecycle.finish(shift.id).await.unwrap();
    assert_eq!(finished.status, ShiftStatus::Finished);

    let result = env
        .lifecycle
        .tick_shift(&stale, day(2), &WorkflowSettings::default())
        .await;
    match result {
        Err(WorkflowError::InvalidState { entity, current, .. }) => {
            assert_eq!(entity, "Shift");
            assert_eq!(current, "finished");
        }
        other => panic!("期望 InvalidState, 实际 {:?}", other),
    }
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Finished
    );
    assert_eq!(env.open_reports(shift.id).await, 0);
    assert_eq!(env.gateway.count_of("task_assigned"), 0);
}

#[tokio::test]
async fn test_finish_after_tick_sees_new_reports() {
    let env = WorkflowTestEnv::new().unwrap();
    let (shift, _) = env.shift_with_members(day(1), day(10), 2).await;
    env.lifecycle.start(shift.id, day(1)).await.unwrap();
    env.seed_tasks(5).await;
    let snapshot = env.lifecycle.get(shift.id).await.unwrap();

    let summary = env
        .lifecycle
        .tick_shift(&snapshot, day(2), &WorkflowSettings::default())
        .await
        .unwrap();
    assert_eq!(summary.assigned, 2);

    match env.lifecycle.finish(shift.id).await {
        Err(WorkflowError::PendingReviews { open_reports, .. }) => assert_eq!(open_reports, 2),
        other => panic!("期望 PendingReviews, 实际 {:?}", other),
    }
    assert_eq!(
        env.lifecycle.get(shift.id).await.unwrap().status,
        ShiftStatus::Started
    );
}
