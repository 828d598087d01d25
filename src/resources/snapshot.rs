//! Point-in-time snapshots of VPS, cache, and database instances.
//!
//! The control plane has no show endpoint for snapshots, so reads scan the
//! full listing for the identifier. The three snapshot collections share
//! one facade, [`SnapshotResource`], parameterised by the [`Snapshot`]
//! representation of each source kind.

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ClientError};
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{Collection, Observed, ResourceError, await_ready, await_status, require};

/// Snapshot representation of one source kind.
pub trait Snapshot: Observed + DeserializeOwned + Send {
    /// Body of the create call.
    type Request: Serialize + Sync;

    /// Checks `request` before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    fn validate(request: &Self::Request) -> Result<(), ResourceError>;
}

/// Parameters required to snapshot a VPS.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateVpsSnapshotRequest {
    /// Instance to snapshot.
    pub vps_instance_id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateVpsSnapshotRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("vps_instance_id", &self.vps_instance_id)?;
        require("name", &self.name)
    }
}

/// Parameters required to snapshot a cache.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateCacheSnapshotRequest {
    /// Cache to snapshot.
    pub cache_instance_id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateCacheSnapshotRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("cache_instance_id", &self.cache_instance_id)?;
        require("name", &self.name)
    }
}

/// Parameters required to snapshot a database.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateDatabaseSnapshotRequest {
    /// Database to snapshot.
    pub database_instance_id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateDatabaseSnapshotRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("database_instance_id", &self.database_instance_id)?;
        require("name", &self.name)
    }
}

/// VPS snapshot as reported by the control plane.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VpsSnapshot {
    /// Server-assigned identifier.
    pub id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: Status,
    /// Stored size in GiB.
    pub size_gb: Option<f64>,
    /// Instance the snapshot was taken from.
    pub vps_instance_id: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

/// Cache snapshot as reported by the control plane.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CacheSnapshot {
    /// Server-assigned identifier.
    pub id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: Status,
    /// Stored size in MiB.
    pub size_mb: Option<f64>,
    /// Cache the snapshot was taken from.
    pub cache_instance_id: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

/// Database snapshot as reported by the control plane.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DatabaseSnapshot {
    /// Server-assigned identifier.
    pub id: String,
    /// Snapshot name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: Status,
    /// Stored size in GiB.
    pub size_gb: Option<f64>,
    /// Database the snapshot was taken from.
    pub database_instance_id: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

macro_rules! snapshot_kind {
    ($snapshot:ty, $request:ty, $kind:expr) => {
        impl Observed for $snapshot {
            const KIND: ResourceKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn status(&self) -> &Status {
                &self.status
            }
        }

        impl Snapshot for $snapshot {
            type Request = $request;

            fn validate(request: &Self::Request) -> Result<(), ResourceError> {
                request.validate()
            }
        }
    };
}

snapshot_kind!(VpsSnapshot, CreateVpsSnapshotRequest, ResourceKind::VpsSnapshot);
snapshot_kind!(CacheSnapshot, CreateCacheSnapshotRequest, ResourceKind::CacheSnapshot);
snapshot_kind!(
    DatabaseSnapshot,
    CreateDatabaseSnapshotRequest,
    ResourceKind::DatabaseSnapshot
);

/// Operations on VPS snapshots.
pub type VpsSnapshotResource = SnapshotResource<VpsSnapshot>;
/// Operations on cache snapshots.
pub type CacheSnapshotResource = SnapshotResource<CacheSnapshot>;
/// Operations on database snapshots.
pub type DatabaseSnapshotResource = SnapshotResource<DatabaseSnapshot>;

/// Operations on the snapshots of one source kind.
#[derive(Clone, Debug)]
pub struct SnapshotResource<S> {
    inner: Collection,
    snapshot: PhantomData<fn() -> S>,
}

impl<S> SnapshotResource<S>
where
    S: Snapshot,
{
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, S::KIND),
            snapshot: PhantomData,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            inner: self.inner.with_poll_interval(poll_interval),
            ..self
        }
    }

    /// Overrides the operation deadlines.
    #[must_use]
    pub fn with_timeouts(self, timeouts: Timeouts) -> Self {
        Self {
            inner: self.inner.with_timeouts(timeouts),
            ..self
        }
    }

    /// Takes a snapshot and returns it once it is `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the snapshot fails or stalls.
    pub async fn create(
        &self,
        request: &S::Request,
        cancel: &CancellationToken,
    ) -> Result<S, ResourceError> {
        S::validate(request)?;
        let created: S = self.inner.create(request, cancel).await?;
        await_ready(self, created.id(), self.inner.policy.timeouts.create, cancel).await?;
        self.get(created.id(), cancel).await
    }

    /// Reads one snapshot by scanning the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when no listed snapshot matches.
    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<S, ResourceError> {
        self.find(id, cancel)
            .await
            .map_err(|err| ResourceError::for_id(self.inner.kind(), id, err))
    }

    /// Lists every snapshot of this kind in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<S>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Restores the source instance from the snapshot. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the snapshot does not exist.
    pub async fn restore(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "restore", None, cancel).await
    }

    /// Deletes the snapshot and waits for it to leave the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] naming the failed teardown step.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        Ok(delete_resource(self, id, self.inner.policy.timeouts.delete, cancel).await?)
    }

    /// Waits until the snapshot reports `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] on timeout, `error` or `failed`,
    /// or cancellation.
    pub async fn wait_for_status(
        &self,
        id: &str,
        target: Status,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Status, ResourceError> {
        await_status(self, id, target, timeout, cancel).await
    }

    async fn find(&self, id: &str, cancel: &CancellationToken) -> Result<S, ClientError> {
        let snapshots: Vec<S> = self
            .inner
            .client
            .list_all(self.inner.kind().path(), cancel)
            .await?;
        snapshots
            .into_iter()
            .find(|snapshot| snapshot.id() == id)
            .ok_or_else(|| ClientError::Missing {
                resource: self.inner.kind().noun().to_owned(),
                id: id.to_owned(),
            })
    }
}

impl<S> Lifecycle for SnapshotResource<S>
where
    S: Snapshot,
{
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move { Ok(self.find(id, cancel).await?.status().clone()) })
    }

    fn request_delete<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        Box::pin(self.inner.remove(id, cancel))
    }
}
