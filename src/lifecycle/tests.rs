use std::time::Duration;

use rstest::rstest;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::client::{ApiError, ClientError};
use crate::test_support::{LifecycleCall, ScriptedLifecycle, not_found};
use crate::types::{ResourceKind, Status};

const THIRTY_MINUTES: Duration = Duration::from_secs(30 * 60);

fn running_wait() -> WaitFor {
    WaitFor::new("vps-123", Status::Running, THIRTY_MINUTES)
}

fn conflict() -> ClientError {
    ClientError::Api(ApiError::from_response(
        409,
        r#"{"message":"Resource is busy"}"#,
    ))
}

#[tokio::test(start_paused = true)]
async fn waits_through_pending_until_running() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["pending", "pending", "running"]);
    let start = Instant::now();

    let status = wait_for_status(&ops, &running_wait(), &CancellationToken::new())
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    let elapsed = start.elapsed();
    assert_eq!(status, Status::Running);
    assert_eq!(ops.fetch_count(), 3);
    assert!(
        elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21),
        "expected about 20s of polling, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn returns_without_ticking_when_target_already_reached() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["RUNNING"]);
    let start = Instant::now();

    let status = wait_for_status(&ops, &running_wait(), &CancellationToken::new()).await;

    assert_eq!(status, Ok(Status::Running));
    assert_eq!(ops.fetch_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn times_out_within_one_tick_of_deadline() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["provisioning"]);
    let timeout = Duration::from_secs(60);
    let start = Instant::now();

    let result = wait_for_status(
        &ops,
        &WaitFor::new("vps-123", Status::Running, timeout),
        &CancellationToken::new(),
    )
    .await;

    let elapsed = start.elapsed();
    assert_eq!(
        result,
        Err(LifecycleError::Timeout {
            kind: ResourceKind::Vps,
            id: String::from("vps-123"),
            target: Status::Running,
            last_status: Status::Provisioning,
        })
    );
    assert!(elapsed > timeout, "gave up early after {elapsed:?}");
    assert!(
        elapsed <= timeout + Duration::from_secs(10),
        "overshot deadline: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn error_status_fails_on_first_check() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["error"]);
    let start = Instant::now();

    let result = wait_for_status(&ops, &running_wait(), &CancellationToken::new()).await;

    assert_eq!(
        result,
        Err(LifecycleError::EnteredErrorState {
            kind: ResourceKind::Vps,
            id: String::from("vps-123"),
            status: Status::Error,
        })
    );
    assert_eq!(ops.fetch_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn waiting_for_error_status_accepts_it() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["error"]);
    let wait = WaitFor::new("vps-123", Status::Error, THIRTY_MINUTES);

    let result = wait_for_status(&ops, &wait, &CancellationToken::new()).await;

    assert_eq!(result, Ok(Status::Error));
}

#[rstest]
#[case::serverless_failed(ResourceKind::Serverless, "failed", true)]
#[case::serverless_error(ResourceKind::Serverless, "error", true)]
#[case::vps_failed(ResourceKind::Vps, "failed", false)]
#[case::cache_error(ResourceKind::Cache, "error", true)]
#[tokio::test(start_paused = true)]
async fn terminal_vocabulary_depends_on_kind(
    #[case] kind: ResourceKind,
    #[case] raw: &str,
    #[case] terminal: bool,
) {
    let ops = ScriptedLifecycle::new(kind).statuses(&[raw]);
    let wait = WaitFor::new("res-1", Status::Running, Duration::from_secs(30));

    let result = wait_for_status(&ops, &wait, &CancellationToken::new()).await;

    match result {
        Err(LifecycleError::EnteredErrorState { .. }) => assert!(terminal),
        Err(LifecycleError::Timeout { .. }) => assert!(!terminal),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn absence_satisfies_deleted_target_without_ticking() {
    let ops = ScriptedLifecycle::new(ResourceKind::Database).then_not_found();
    let start = Instant::now();

    let result = wait_for_status(
        &ops,
        &WaitFor::new("db-1", Status::Deleted, THIRTY_MINUTES),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result, Ok(Status::Deleted));
    assert_eq!(ops.fetch_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn absence_is_an_error_for_other_targets() {
    let ops = ScriptedLifecycle::new(ResourceKind::Database).then_not_found();

    let result = wait_for_status(
        &ops,
        &WaitFor::new("db-1", Status::Running, THIRTY_MINUTES),
        &CancellationToken::new(),
    )
    .await;

    let err = result.err().unwrap_or_else(|| panic!("absence should fail"));
    assert!(matches!(err, LifecycleError::Fetch { .. }));
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn fetch_failures_are_not_retried() {
    let transport = ClientError::Transport {
        message: String::from("connection reset"),
    };
    let ops = ScriptedLifecycle::new(ResourceKind::Cache)
        .statuses(&["pending"])
        .then_fetch_error(transport.clone());

    let result = wait_for_status(
        &ops,
        &WaitFor::new("cache-1", Status::Running, THIRTY_MINUTES),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(
        result,
        Err(LifecycleError::Fetch {
            kind: ResourceKind::Cache,
            id: String::from("cache-1"),
            source: transport,
        })
    );
    assert_eq!(ops.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_pending_tick() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).statuses(&["pending"]);
    let cancel = CancellationToken::new();
    let start = Instant::now();
    let wait = running_wait();

    let (result, ()) = tokio::join!(wait_for_status(&ops, &wait, &cancel), async {
        sleep(Duration::from_secs(15)).await;
        cancel.cancel();
    });

    let err = result.err().unwrap_or_else(|| panic!("wait should be cancelled"));
    assert!(err.is_cancelled());
    assert_eq!(ops.fetch_count(), 2);
    assert!(start.elapsed() < Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn delete_of_missing_resource_issues_no_calls() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps).then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(ops.calls(), vec![LifecycleCall::FetchStatus]);
}

#[tokio::test(start_paused = true)]
async fn stops_before_deleting_running_vps() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["running", "stopped"])
        .then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::Stop,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn delete_waits_for_stop_to_land() {
    let ops = ScriptedLifecycle::new(ResourceKind::Database)
        .statuses(&["running", "stopping", "stopping", "stopped"])
        .then_not_found();
    let start = Instant::now();

    let result = delete_resource(&ops, "db-1", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::Stop,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
    assert!(start.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn stopped_resource_is_deleted_directly() {
    let ops = ScriptedLifecycle::new(ResourceKind::Cache)
        .statuses(&["stopped"])
        .then_not_found();

    let result = delete_resource(&ops, "cache-1", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stopping_resource_is_not_stopped_again() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["stopping", "stopped"])
        .then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn deleting_resource_only_awaits_disappearance() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["deleting"])
        .then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![LifecycleCall::FetchStatus, LifecycleCall::FetchStatus]
    );
}

#[tokio::test(start_paused = true)]
async fn provisioning_resource_settles_before_stop() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["provisioning", "running", "stopped"])
        .then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::Stop,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn provisioning_that_fails_is_deleted_without_stop() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["pending", "error", "error"])
        .then_not_found();

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn resource_stuck_provisioning_reports_unstable() {
    let ops = ScriptedLifecycle::new(ResourceKind::Database).statuses(&["provisioning"]);

    let result = delete_resource(
        &ops,
        "db-1",
        Duration::from_secs(30),
        &CancellationToken::new(),
    )
    .await;

    let Err(LifecycleError::DeleteFailed {
        step,
        last_status,
        source,
        ..
    }) = result
    else {
        panic!("expected a delete failure, got {result:?}");
    };
    assert_eq!(step, DeleteStep::Settle);
    assert_eq!(last_status, Some(Status::Provisioning));
    assert!(matches!(*source, LifecycleError::Unstable { .. }));
    assert!(!ops.calls().contains(&LifecycleCall::Stop));
    assert!(!ops.calls().contains(&LifecycleCall::Delete));
}

#[tokio::test(start_paused = true)]
async fn settle_timeout_leaves_budget_for_delete_when_resource_stopped() {
    let ops = ScriptedLifecycle::new(ResourceKind::Database)
        .statuses(&[
            "provisioning",
            "provisioning",
            "provisioning",
            "stopped",
            "deleting",
        ])
        .then_not_found();
    let timeout = Duration::from_secs(30);
    let start = Instant::now();

    let result = delete_resource(&ops, "db-1", timeout, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
            LifecycleCall::FetchStatus,
        ]
    );
    assert!(start.elapsed() <= timeout, "overran budget: {:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn storage_bucket_is_deleted_without_stop() {
    let ops = ScriptedLifecycle::new(ResourceKind::Bucket)
        .statuses(&["active"])
        .then_not_found();

    let result = delete_resource(&ops, "bkt-1", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![
            LifecycleCall::FetchStatus,
            LifecycleCall::Delete,
            LifecycleCall::FetchStatus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn delete_racing_concurrent_removal_succeeds() {
    let ops = ScriptedLifecycle::new(ResourceKind::Serverless)
        .statuses(&["running"])
        .delete_result(Err(not_found()));

    let result = delete_resource(&ops, "svc-1", THIRTY_MINUTES, &CancellationToken::new()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(
        ops.calls(),
        vec![LifecycleCall::FetchStatus, LifecycleCall::Delete]
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_delete_names_step_and_status() {
    let ops = ScriptedLifecycle::new(ResourceKind::Bucket)
        .statuses(&["active"])
        .delete_result(Err(conflict()));

    let result = delete_resource(&ops, "bkt-1", THIRTY_MINUTES, &CancellationToken::new()).await;

    let err = result.err().unwrap_or_else(|| panic!("delete should fail"));
    assert!(!err.is_not_found());
    assert_eq!(
        err.to_string(),
        "failed to delete storage bucket bkt-1 during delete (last known status: active): \
         failed to delete storage bucket bkt-1: API error 409: Resource is busy"
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_stop_aborts_before_delete() {
    let ops = ScriptedLifecycle::new(ResourceKind::Vps)
        .statuses(&["running"])
        .stop_result(Err(conflict()));

    let result = delete_resource(&ops, "vps-123", THIRTY_MINUTES, &CancellationToken::new()).await;

    let Err(LifecycleError::DeleteFailed { step, .. }) = result else {
        panic!("expected a delete failure, got {result:?}");
    };
    assert_eq!(step, DeleteStep::Stop);
    assert_eq!(
        ops.calls(),
        vec![LifecycleCall::FetchStatus, LifecycleCall::Stop]
    );
}

#[tokio::test(start_paused = true)]
async fn deletion_that_never_completes_times_out() {
    let ops = ScriptedLifecycle::new(ResourceKind::Bucket).statuses(&["active", "deleting"]);
    let timeout = Duration::from_secs(30);
    let start = Instant::now();

    let result = delete_resource(&ops, "bkt-1", timeout, &CancellationToken::new()).await;

    let Err(LifecycleError::DeleteFailed {
        step,
        last_status,
        source,
        ..
    }) = result
    else {
        panic!("expected a delete failure, got {result:?}");
    };
    assert_eq!(step, DeleteStep::AwaitDeletion);
    assert_eq!(last_status, Some(Status::Deleting));
    assert!(matches!(*source, LifecycleError::Timeout { .. }));
    assert!(start.elapsed() <= timeout + Duration::from_secs(5));
}

#[rstest]
#[case(ResourceKind::Vps, true, true, false)]
#[case(ResourceKind::Database, true, false, false)]
#[case(ResourceKind::Cache, true, false, false)]
#[case(ResourceKind::Serverless, false, true, true)]
#[case(ResourceKind::Bucket, false, false, false)]
#[case(ResourceKind::VpsSnapshot, false, false, false)]
#[case(ResourceKind::CacheSnapshot, false, false, false)]
#[case(ResourceKind::DatabaseSnapshot, false, false, false)]
fn default_policies_follow_kind_rules(
    #[case] kind: ResourceKind,
    #[case] requires_stop: bool,
    #[case] waits_after_update: bool,
    #[case] ready_wait_is_advisory: bool,
) {
    let policy = kind.policy();
    assert_eq!(policy.kind, kind);
    assert_eq!(policy.requires_stop_before_delete, requires_stop);
    assert_eq!(policy.waits_after_update, waits_after_update);
    assert_eq!(policy.ready_wait_is_advisory, ready_wait_is_advisory);
}

#[rstest]
fn storage_polls_faster_than_compute() {
    assert_eq!(ResourceKind::Bucket.policy().poll_interval, Duration::from_secs(5));
    assert_eq!(ResourceKind::Vps.policy().poll_interval, Duration::from_secs(10));
    assert_eq!(
        ResourceKind::Vps.policy().timeouts.delete,
        Duration::from_secs(15 * 60)
    );
}
