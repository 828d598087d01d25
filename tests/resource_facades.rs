//! End-to-end facade behaviour: typed calls, waits, and teardown sequencing
//! against an HTTP double.

#[path = "common/mock_api.rs"]
mod mock_api;

use std::time::Duration;

use mock_api::{FAST_POLL, MockApi};
use serde_json::json;
use settle::lifecycle::LifecycleError;
use settle::resources::{
    CreateAccessKeyRequest, CreateBucketRequest, CreateCacheSnapshotRequest,
    CreateServerlessRequest, CreateSshKeyRequest, CreateVpsRequest, UpdateDatabaseRequest,
};
use settle::{DeleteStep, ResourceError, ResourceKind, Status, Timeouts};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn vps_body(status: &str) -> serde_json::Value {
    json!({"instance": {"id": "vps-1", "name": "web", "status": status, "public_ip": "192.0.2.10"}})
}

#[tokio::test]
async fn vps_create_returns_once_running() {
    let api = MockApi::start().await;
    Mock::given(method("POST"))
        .and(path("/vps"))
        .and(body_partial_json(json!({
            "name": "web",
            "auth_method": "password",
            "password": "hunter22",
            "password_confirmation": "hunter22",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(vps_body("pending")))
        .expect(1)
        .mount(&api.server)
        .await;
    api.respond("GET", "/vps/vps-1/status", 200, json!({"status": "provisioning"}), 1)
        .await;
    api.always("GET", "/vps/vps-1/status", 200, json!({"status": "running"}))
        .await;
    api.always("GET", "/vps/vps-1", 200, vps_body("running")).await;

    let request = CreateVpsRequest::builder()
        .name("web")
        .image("ubuntu-24.04")
        .datacenter("fra1")
        .resource_profile("small")
        .password("hunter22")
        .build()
        .expect("valid request");
    let instance = api
        .client
        .vps()
        .with_poll_interval(FAST_POLL)
        .create(&request, &CancellationToken::new())
        .await
        .expect("create succeeds");

    assert_eq!(instance.status, Status::Running);
    assert_eq!(instance.public_ip.as_deref(), Some("192.0.2.10"));
    assert_eq!(
        api.calls().await,
        [
            "POST /vps",
            "GET /vps/vps-1/status",
            "GET /vps/vps-1/status",
            "GET /vps/vps-1",
        ]
    );
}

#[tokio::test]
async fn vps_delete_stops_then_deletes_then_waits_for_absence() {
    let api = MockApi::start().await;
    api.respond("GET", "/vps/vps-1/status", 200, json!({"status": "running"}), 1)
        .await;
    api.respond("GET", "/vps/vps-1/status", 200, json!({"status": "stopped"}), 1)
        .await;
    api.not_found("GET", "/vps/vps-1/status").await;
    api.always("POST", "/vps/vps-1/stop", 200, json!({"message": "Stopping"}))
        .await;
    api.always("DELETE", "/vps/vps-1", 200, json!({"message": "Deleting"}))
        .await;

    api.client
        .vps()
        .with_poll_interval(FAST_POLL)
        .delete("vps-1", &CancellationToken::new())
        .await
        .expect("delete succeeds");

    assert_eq!(
        api.calls().await,
        [
            "GET /vps/vps-1/status",
            "POST /vps/vps-1/stop",
            "GET /vps/vps-1/status",
            "DELETE /vps/vps-1",
            "GET /vps/vps-1/status",
        ]
    );
}

#[tokio::test]
async fn deleting_a_missing_database_is_a_no_op() {
    let api = MockApi::start().await;
    api.not_found("GET", "/database/db-1").await;

    api.client
        .databases()
        .delete("db-1", &CancellationToken::new())
        .await
        .expect("already gone");

    assert_eq!(api.calls().await, ["GET /database/db-1"]);
}

#[tokio::test]
async fn rejected_database_delete_names_the_step_and_last_status() {
    let api = MockApi::start().await;
    let db = |status: &str| json!({"instance": {"id": "db-1", "name": "orders", "status": status}});
    api.respond("GET", "/database/db-1", 200, db("running"), 1).await;
    api.always("GET", "/database/db-1", 200, db("stopped")).await;
    api.always("POST", "/database/db-1/stop", 200, json!({})).await;
    api.always("DELETE", "/database/db-1", 409, json!({"message": "Resource is busy"}))
        .await;

    let err = api
        .client
        .databases()
        .with_poll_interval(FAST_POLL)
        .delete("db-1", &CancellationToken::new())
        .await
        .expect_err("delete is rejected");

    let ResourceError::Lifecycle(LifecycleError::DeleteFailed {
        step, last_status, ..
    }) = &err
    else {
        panic!("expected a teardown failure, got {err:?}");
    };
    assert_eq!(*step, DeleteStep::Delete);
    assert_eq!(last_status.as_ref(), Some(&Status::Stopped));
    assert_eq!(
        err.to_string(),
        "failed to delete database db-1 during delete (last known status: stopped): \
         failed to delete database db-1: API error 409: Resource is busy"
    );
}

#[tokio::test]
async fn database_update_returns_without_waiting() {
    let api = MockApi::start().await;
    api.always(
        "PUT",
        "/database/db-1",
        200,
        json!({"instance": {"id": "db-1", "name": "orders", "status": "deploying", "resource_profile": "large"}}),
    )
    .await;

    let updated = api
        .client
        .databases()
        .update(
            "db-1",
            &UpdateDatabaseRequest {
                resource_profile: Some(String::from("large")),
                ..UpdateDatabaseRequest::default()
            },
            &CancellationToken::new(),
        )
        .await
        .expect("update accepted");

    assert_eq!(updated.status, Status::Deploying);
    assert_eq!(api.calls().await, ["PUT /database/db-1"]);
}

#[tokio::test]
async fn reading_a_missing_cache_is_not_found() {
    let api = MockApi::start().await;
    api.not_found("GET", "/cache/c-9").await;

    let err = api
        .client
        .caches()
        .get("c-9", &CancellationToken::new())
        .await
        .expect_err("missing");
    assert_eq!(
        err,
        ResourceError::NotFound {
            kind: ResourceKind::Cache,
            id: String::from("c-9"),
        }
    );
    assert_eq!(err.to_string(), "cache c-9 not found");
}

#[tokio::test]
async fn bucket_create_surfaces_error_state() {
    let api = MockApi::start().await;
    let bucket =
        |status: &str| json!({"bucket": {"id": "b-1", "name": "assets", "status": status}});
    api.always("POST", "/storage/buckets", 201, bucket("creating")).await;
    api.always("GET", "/storage/buckets/b-1", 200, bucket("error")).await;

    let request = CreateBucketRequest {
        name: String::from("assets"),
        region: String::from("eu-ro-1"),
        ..CreateBucketRequest::default()
    };
    let err = api
        .client
        .buckets()
        .with_poll_interval(FAST_POLL)
        .create(&request, &CancellationToken::new())
        .await
        .expect_err("bucket failed");

    assert_eq!(
        err,
        ResourceError::Lifecycle(LifecycleError::EnteredErrorState {
            kind: ResourceKind::Bucket,
            id: String::from("b-1"),
            status: Status::Error,
        })
    );
}

#[tokio::test]
async fn serverless_read_merges_the_public_url() {
    let api = MockApi::start().await;
    api.always(
        "GET",
        "/serverless/sl-1",
        200,
        json!({
            "container": {"id": "sl-1", "name": "web", "status": "running", "environment_variables": []},
            "url": "https://web.example",
        }),
    )
    .await;

    let container = api
        .client
        .serverless()
        .get("sl-1", &CancellationToken::new())
        .await
        .expect("container exists");
    assert_eq!(container.url.as_deref(), Some("https://web.example"));
    assert!(container.environment_variables.is_empty());
}

#[tokio::test]
async fn serverless_top_level_url_replaces_the_nested_one() {
    let api = MockApi::start().await;
    api.always(
        "GET",
        "/serverless/sl-1",
        200,
        json!({
            "container": {"id": "sl-1", "name": "web", "status": "running", "url": "http://10.0.0.4:8080"},
            "url": "https://web.example",
        }),
    )
    .await;

    let container = api
        .client
        .serverless()
        .get("sl-1", &CancellationToken::new())
        .await
        .expect("container exists");
    assert_eq!(container.url.as_deref(), Some("https://web.example"));
}

#[tokio::test]
async fn serverless_create_tolerates_a_rollout_that_outlasts_the_wait() {
    let api = MockApi::start().await;
    let deploying = json!({"container": {"id": "sl-1", "name": "web", "status": "deploying"}});
    api.always("POST", "/serverless", 201, deploying.clone()).await;
    api.always("GET", "/serverless/sl-1", 200, deploying).await;
    let short = Duration::from_millis(50);

    let request = CreateServerlessRequest {
        name: String::from("web"),
        resource_profile: String::from("small"),
        deployment_type: String::from("image"),
        image_url: Some(String::from("ghcr.io/acme/web:1")),
        ..CreateServerlessRequest::default()
    };
    let container = api
        .client
        .serverless()
        .with_poll_interval(FAST_POLL)
        .with_timeouts(Timeouts {
            create: short,
            update: short,
            delete: short,
        })
        .create(&request, &CancellationToken::new())
        .await
        .expect("stalled rollout is not an error");

    assert_eq!(container.status, Status::Deploying);
    let calls = api.calls().await;
    assert_eq!(calls.first().map(String::as_str), Some("POST /serverless"));
    assert!(calls.len() > 2, "expected polling before the final read: {calls:?}");
}

#[tokio::test]
async fn serverless_create_still_honours_cancellation() {
    let api = MockApi::start().await;
    let deploying = json!({"container": {"id": "sl-1", "name": "web", "status": "deploying"}});
    api.always("POST", "/serverless", 201, deploying.clone()).await;
    api.always("GET", "/serverless/sl-1", 200, deploying).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let request = CreateServerlessRequest {
        name: String::from("web"),
        resource_profile: String::from("small"),
        deployment_type: String::from("image"),
        image_url: Some(String::from("ghcr.io/acme/web:1")),
        ..CreateServerlessRequest::default()
    };
    let facade = api.client.serverless().with_poll_interval(FAST_POLL);
    let (result, ()) = tokio::join!(facade.create(&request, &cancel), async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    assert!(
        matches!(
            result,
            Err(ResourceError::Lifecycle(LifecycleError::Cancelled { .. }))
        ),
        "{result:?}"
    );
}

fn snapshot_page(snapshots: &serde_json::Value) -> serde_json::Value {
    json!({
        "data": snapshots,
        "pagination": {"current_page": 1, "last_page": 1, "per_page": 15, "total": 1},
    })
}

#[tokio::test]
async fn snapshot_read_scans_the_listing() {
    let api = MockApi::start().await;
    api.always(
        "GET",
        "/snapshots/vps",
        200,
        snapshot_page(&json!([{"id": "s-1", "name": "nightly", "status": "completed", "size_gb": 12.5}])),
    )
    .await;
    let snapshots = api.client.vps_snapshots();
    let cancel = CancellationToken::new();

    let found = snapshots.get("s-1", &cancel).await.expect("listed");
    assert_eq!(found.status, Status::Completed);
    assert_eq!(found.size_gb, Some(12.5));

    let err = snapshots.get("s-2", &cancel).await.expect_err("not listed");
    assert_eq!(
        err,
        ResourceError::NotFound {
            kind: ResourceKind::VpsSnapshot,
            id: String::from("s-2"),
        }
    );
}

#[tokio::test]
async fn snapshot_delete_waits_until_it_leaves_the_listing() {
    let api = MockApi::start().await;
    api.respond(
        "GET",
        "/snapshots/vps",
        200,
        snapshot_page(&json!([{"id": "s-1", "name": "nightly", "status": "completed"}])),
        1,
    )
    .await;
    api.always("GET", "/snapshots/vps", 200, snapshot_page(&json!([])))
        .await;
    api.always("DELETE", "/snapshots/vps/s-1", 200, json!({"message": "Deleting"}))
        .await;

    api.client
        .vps_snapshots()
        .delete("s-1", &CancellationToken::new())
        .await
        .expect("snapshot removed");

    assert_eq!(
        api.calls().await,
        [
            "GET /snapshots/vps",
            "DELETE /snapshots/vps/s-1",
            "GET /snapshots/vps",
        ]
    );
}

#[tokio::test]
async fn cache_snapshot_create_waits_for_completion_in_the_listing() {
    let api = MockApi::start().await;
    Mock::given(method("POST"))
        .and(path("/snapshots/cache"))
        .and(body_partial_json(json!({"cache_instance_id": "c-1", "name": "nightly"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Snapshot queued",
            "snapshot": {"id": "cs-1", "name": "nightly", "status": "pending"},
        })))
        .expect(1)
        .mount(&api.server)
        .await;
    api.respond(
        "GET",
        "/snapshots/cache",
        200,
        snapshot_page(&json!([{"id": "cs-1", "name": "nightly", "status": "pending"}])),
        1,
    )
    .await;
    api.always(
        "GET",
        "/snapshots/cache",
        200,
        snapshot_page(&json!([
            {"id": "cs-0", "name": "older", "status": "completed"},
            {"id": "cs-1", "name": "nightly", "status": "completed", "size_mb": 512.0, "cache_instance_id": "c-1"},
        ])),
    )
    .await;

    let snapshot = api
        .client
        .cache_snapshots()
        .with_poll_interval(FAST_POLL)
        .create(
            &CreateCacheSnapshotRequest {
                cache_instance_id: String::from("c-1"),
                name: String::from("nightly"),
                description: None,
            },
            &CancellationToken::new(),
        )
        .await
        .expect("snapshot completes");

    assert_eq!(snapshot.id, "cs-1");
    assert_eq!(snapshot.status, Status::Completed);
    assert_eq!(snapshot.size_mb, Some(512.0));
    assert_eq!(snapshot.cache_instance_id.as_deref(), Some("c-1"));
}

#[tokio::test]
async fn database_snapshot_restore_and_missing_read() {
    let api = MockApi::start().await;
    api.always("POST", "/snapshots/database/ds-1/restore", 200, json!({"message": "Restoring"}))
        .await;
    api.always("GET", "/snapshots/database", 200, snapshot_page(&json!([])))
        .await;
    let snapshots = api.client.database_snapshots();
    let cancel = CancellationToken::new();

    snapshots.restore("ds-1", &cancel).await.expect("restore accepted");
    let err = snapshots.get("ds-1", &cancel).await.expect_err("not listed");

    assert_eq!(
        err,
        ResourceError::NotFound {
            kind: ResourceKind::DatabaseSnapshot,
            id: String::from("ds-1"),
        }
    );
    assert_eq!(err.to_string(), "database snapshot ds-1 not found");
    assert_eq!(
        api.calls().await,
        [
            "POST /snapshots/database/ds-1/restore",
            "GET /snapshots/database",
        ]
    );
}

#[tokio::test]
async fn access_keys_issue_read_and_revoke() {
    let api = MockApi::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/access-keys"))
        .and(body_partial_json(json!({"name": "ci"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ak-1",
            "name": "ci",
            "access_key_id": "AKIAEXAMPLE",
            "secret_access_key": "wJalrXUtnFEMI",
            "expires_at": null,
            "is_prefix_scoped": false,
            "message": "Access key created",
        })))
        .expect(1)
        .mount(&api.server)
        .await;
    api.always(
        "GET",
        "/storage/access-keys/ak-1",
        200,
        json!({"access_key": {
            "id": "ak-1",
            "name": "ci",
            "access_key_id": "AKIAEXAMPLE",
            "status": "active",
            "access_type": "full",
            "team_id": 3,
        }}),
    )
    .await;
    api.always("DELETE", "/storage/access-keys/ak-1", 200, json!({"message": "Revoked"}))
        .await;
    api.not_found("DELETE", "/storage/access-keys/ak-2").await;
    let keys = api.client.access_keys();
    let cancel = CancellationToken::new();

    let issued = keys
        .create(
            &CreateAccessKeyRequest {
                name: String::from("ci"),
                expires_at: None,
            },
            &cancel,
        )
        .await
        .expect("key issued");
    assert_eq!(issued.secret_access_key, "wJalrXUtnFEMI");

    let read = keys.get(&issued.id, &cancel).await.expect("key readable");
    assert_eq!(read.access_key_id, "AKIAEXAMPLE");
    assert_eq!(read.status.as_deref(), Some("active"));

    keys.delete("ak-1", &cancel).await.expect("revoked");
    keys.delete("ak-2", &cancel)
        .await
        .expect("already revoked counts as revoked");
}

#[tokio::test]
async fn ssh_keys_round_trip_without_polling() {
    let api = MockApi::start().await;
    Mock::given(method("POST"))
        .and(path("/ssh-keys"))
        .and(body_partial_json(json!({"name": "laptop"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "SSH key created",
            "key": {"id": 7, "name": "laptop", "fingerprint": "SHA256:abc"},
        })))
        .expect(1)
        .mount(&api.server)
        .await;
    api.not_found("DELETE", "/ssh-keys/7").await;
    let keys = api.client.ssh_keys();
    let cancel = CancellationToken::new();

    let key = keys
        .create(
            &CreateSshKeyRequest {
                name: String::from("laptop"),
                public_key: String::from("ssh-ed25519 AAAA laptop"),
            },
            &cancel,
        )
        .await
        .expect("key stored");
    assert_eq!(key.id, "7");

    keys.delete(&key.id, &cancel)
        .await
        .expect("already removed counts as removed");
    assert_eq!(api.calls().await, ["POST /ssh-keys", "DELETE /ssh-keys/7"]);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_network() {
    let api = MockApi::start().await;

    let err = api
        .client
        .buckets()
        .create(&CreateBucketRequest::default(), &CancellationToken::new())
        .await
        .expect_err("name is required");
    assert_eq!(err, ResourceError::Validation(String::from("name")));
    assert!(api.calls().await.is_empty());
}
