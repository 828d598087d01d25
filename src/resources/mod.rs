//! Per-kind resource facades.
//!
//! Each facade marshals typed requests onto the control-plane paths of one
//! [`ResourceKind`] and plugs the kind's [`KindPolicy`] into the shared
//! poller and delete orchestrator. Create returns once the resource is
//! ready, read reports absence as [`ResourceError::NotFound`], update waits
//! only for kinds whose policy says so, and delete returns once the resource
//! is gone. Start, stop, and reboot are single calls.

mod access_key;
mod bucket;
mod cache;
mod database;
mod error;
mod serverless;
mod snapshot;
mod ssh_key;
mod vps;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ClientError};
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleError, Timeouts, WaitFor, wait_for_status};
use crate::types::{ResourceKind, Status};

pub use access_key::{AccessKey, AccessKeyResource, CreateAccessKeyRequest, IssuedAccessKey};
pub use bucket::{BucketResource, CreateBucketRequest, StorageBucket, UpdateBucketRequest};
pub use cache::{
    CacheConnectionInfo, CacheInstance, CacheProvider, CacheResource, CreateCacheRequest,
    UpdateCacheRequest,
};
pub use database::{
    CreateDatabaseRequest, DatabaseCredentials, DatabaseEngine, DatabaseInstance,
    DatabaseResource, UpdateDatabaseRequest,
};
pub use error::ResourceError;
pub use serverless::{
    CreateServerlessRequest, ServerlessContainer, ServerlessResource, UpdateServerlessRequest,
};
pub use snapshot::{
    CacheSnapshot, CacheSnapshotResource, CreateCacheSnapshotRequest,
    CreateDatabaseSnapshotRequest, CreateVpsSnapshotRequest, DatabaseSnapshot,
    DatabaseSnapshotResource, Snapshot, SnapshotResource, VpsSnapshot, VpsSnapshotResource,
};
pub use ssh_key::{CreateSshKeyRequest, SshKey, SshKeyResource};
pub use vps::{
    CreateVpsRequest, CreateVpsRequestBuilder, UpdateVpsRequest, VpsAuth, VpsImage, VpsInstance,
    VpsResource,
};

/// Every resource kind this crate manages, in registration order.
pub const REGISTRY: &[ResourceKind] = &[
    ResourceKind::Vps,
    ResourceKind::Database,
    ResourceKind::Cache,
    ResourceKind::Bucket,
    ResourceKind::Serverless,
    ResourceKind::VpsSnapshot,
    ResourceKind::CacheSnapshot,
    ResourceKind::DatabaseSnapshot,
    ResourceKind::SshKey,
    ResourceKind::AccessKey,
];

/// Kind, identifier, and last observed status of one resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceHandle {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Server-assigned identifier.
    pub id: String,
    /// Status at the time the handle was taken.
    pub status: Status,
}

/// Resource representation that carries an identifier and a status.
pub trait Observed {
    /// Kind the representation belongs to.
    const KIND: ResourceKind;

    /// Server-assigned identifier.
    fn id(&self) -> &str;

    /// Reported status.
    fn status(&self) -> &Status;

    /// Captures a [`ResourceHandle`] for this representation.
    fn handle(&self) -> ResourceHandle {
        ResourceHandle {
            kind: Self::KIND,
            id: self.id().to_owned(),
            status: self.status().clone(),
        }
    }
}

/// Single-resource response body. The wrapping key depends on the kind.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(
        rename = "instance",
        alias = "bucket",
        alias = "container",
        alias = "snapshot",
        alias = "key"
    )]
    item: T,
}

/// Control-plane collection for one kind, with the kind's rules.
#[derive(Clone, Debug)]
struct Collection {
    client: ApiClient,
    policy: KindPolicy,
}

impl Collection {
    const fn new(client: ApiClient, kind: ResourceKind) -> Self {
        Self {
            client,
            policy: kind.policy(),
        }
    }

    const fn kind(&self) -> ResourceKind {
        self.policy.kind
    }

    fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            policy: self.policy.with_poll_interval(poll_interval),
            ..self
        }
    }

    fn with_timeouts(self, timeouts: Timeouts) -> Self {
        Self {
            policy: self.policy.with_timeouts(timeouts),
            ..self
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.kind().path())
    }

    fn action_path(&self, id: &str, action: &str) -> String {
        format!("{}/{id}/{action}", self.kind().path())
    }

    async fn create<B, T>(&self, body: &B, cancel: &CancellationToken) -> Result<T, ResourceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Observed,
    {
        let created: Envelope<T> = self.client.post(self.kind().path(), body, cancel).await?;
        let handle = created.item.handle();
        tracing::info!(kind = %handle.kind, id = %handle.id, status = %handle.status, "create accepted");
        Ok(created.item)
    }

    async fn show<T>(&self, id: &str, cancel: &CancellationToken) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.client
            .get::<Envelope<T>>(&self.item_path(id), cancel)
            .await
            .map(|envelope| envelope.item)
    }

    async fn read<T>(&self, id: &str, cancel: &CancellationToken) -> Result<T, ResourceError>
    where
        T: DeserializeOwned,
    {
        self.show(id, cancel)
            .await
            .map_err(|err| ResourceError::for_id(self.kind(), id, err))
    }

    async fn fetch<T>(
        &self,
        path: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ResourceError>
    where
        T: DeserializeOwned,
    {
        self.client
            .get(path, cancel)
            .await
            .map_err(|err| ResourceError::for_id(self.kind(), id, err))
    }

    async fn update<B, T>(
        &self,
        id: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ResourceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.client
            .put::<B, Envelope<T>>(&self.item_path(id), body, cancel)
            .await
            .map(|envelope| envelope.item)
            .map_err(|err| ResourceError::for_id(self.kind(), id, err))
    }

    async fn remove(&self, id: &str, cancel: &CancellationToken) -> Result<(), ClientError> {
        self.client
            .send::<()>(Method::DELETE, &self.item_path(id), None, cancel)
            .await
    }

    async fn action(
        &self,
        id: &str,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.client
            .send::<()>(Method::POST, &self.action_path(id, action), None, cancel)
            .await
    }

    async fn perform<B>(
        &self,
        id: &str,
        action: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<(), ResourceError>
    where
        B: Serialize + ?Sized,
    {
        tracing::info!(kind = %self.kind(), id, action, "requesting action");
        self.client
            .send(Method::POST, &self.action_path(id, action), body, cancel)
            .await
            .map_err(|err| ResourceError::for_id(self.kind(), id, err))
    }

    async fn list<T>(&self, cancel: &CancellationToken) -> Result<Vec<T>, ResourceError>
    where
        T: DeserializeOwned,
    {
        Ok(self.client.list_all(self.kind().path(), cancel).await?)
    }
}

/// Waits for `target` on `id` using the kind's poll interval.
async fn await_status<L>(
    ops: &L,
    id: &str,
    target: Status,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Status, ResourceError>
where
    L: Lifecycle + ?Sized,
{
    Ok(wait_for_status(ops, &WaitFor::new(id, target, timeout), cancel).await?)
}

/// Waits for the kind's ready status on `id`.
///
/// Kinds whose policy marks the wait as advisory only log a failed wait;
/// cancellation is still reported.
async fn await_ready<L>(
    ops: &L,
    id: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), ResourceError>
where
    L: Lifecycle + ?Sized,
{
    let policy = ops.policy();
    let target = policy.ready_status.clone();
    match wait_for_status(ops, &WaitFor::new(id, target, timeout), cancel).await {
        Ok(_) => Ok(()),
        Err(err @ LifecycleError::Cancelled { .. }) => Err(err.into()),
        Err(err) if policy.ready_wait_is_advisory => {
            tracing::warn!(kind = %policy.kind, id, error = %err, "resource did not become ready; it may still be deploying");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn require(field: &str, value: &str) -> Result<(), ResourceError> {
    if value.trim().is_empty() {
        return Err(ResourceError::Validation(field.to_owned()));
    }
    Ok(())
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Accepts identifiers the API sends either as strings or as integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    scalar_to_string(value).ok_or_else(|| serde::de::Error::custom("expected a string or a number"))
}

/// Accepts optional values the API sends either as strings or as numbers.
fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?.and_then(scalar_to_string))
}

/// Accepts a string map, treating an empty JSON array (how the API encodes
/// an empty map) or `null` as empty.
fn lenient_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(entries)) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, item)| scalar_to_string(item).map(|text| (key, text)))
        .collect())
}

impl ApiClient {
    /// Facade for virtual private servers.
    #[must_use]
    pub fn vps(&self) -> VpsResource {
        VpsResource::new(self.clone())
    }

    /// Facade for managed databases.
    #[must_use]
    pub fn databases(&self) -> DatabaseResource {
        DatabaseResource::new(self.clone())
    }

    /// Facade for managed caches.
    #[must_use]
    pub fn caches(&self) -> CacheResource {
        CacheResource::new(self.clone())
    }

    /// Facade for object-storage buckets.
    #[must_use]
    pub fn buckets(&self) -> BucketResource {
        BucketResource::new(self.clone())
    }

    /// Facade for serverless containers.
    #[must_use]
    pub fn serverless(&self) -> ServerlessResource {
        ServerlessResource::new(self.clone())
    }

    /// Facade for VPS snapshots.
    #[must_use]
    pub fn vps_snapshots(&self) -> VpsSnapshotResource {
        VpsSnapshotResource::new(self.clone())
    }

    /// Facade for cache snapshots.
    #[must_use]
    pub fn cache_snapshots(&self) -> CacheSnapshotResource {
        CacheSnapshotResource::new(self.clone())
    }

    /// Facade for database snapshots.
    #[must_use]
    pub fn database_snapshots(&self) -> DatabaseSnapshotResource {
        DatabaseSnapshotResource::new(self.clone())
    }

    /// Facade for SSH keys.
    #[must_use]
    pub fn ssh_keys(&self) -> SshKeyResource {
        SshKeyResource::new(self.clone())
    }

    /// Facade for storage access keys.
    #[must_use]
    pub fn access_keys(&self) -> AccessKeyResource {
        AccessKeyResource::new(self.clone())
    }
}
