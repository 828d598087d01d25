//! Managed in-memory caches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{Collection, Observed, ResourceError, await_ready, await_status, require};

/// Parameters required to create a cache.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateCacheRequest {
    /// Instance name.
    pub name: String,
    /// Engine: `redis`, `valkey`, or `dragonfly`.
    pub provider: String,
    /// Memory size in MiB.
    pub memory_size_mb: u32,
    /// vCPU count.
    pub cpu_cores: u32,
    /// Engine version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Datacenter to place the instance in.
    pub datacenter: String,
    /// Named sizing profile.
    pub resource_profile: String,
    /// Engine parameter group to apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
}

impl CreateCacheRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("provider", &self.provider)?;
        require("datacenter", &self.datacenter)?;
        require("resource_profile", &self.resource_profile)?;
        if self.memory_size_mb == 0 {
            return Err(ResourceError::Validation(String::from("memory_size_mb")));
        }
        if self.cpu_cores == 0 {
            return Err(ResourceError::Validation(String::from("cpu_cores")));
        }
        Ok(())
    }
}

/// Change request for a cache. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateCacheRequest {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New memory size in MiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size_mb: Option<u32>,
    /// New vCPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    /// New sizing profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_profile: Option<String>,
    /// New parameter group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
}

/// Engine descriptor embedded in a cache representation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CacheProvider {
    /// Engine name.
    pub name: String,
}

/// Cache as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CacheInstance {
    /// Server-assigned identifier.
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Lifecycle status.
    pub status: Status,
    /// Sizing profile.
    pub resource_profile: Option<String>,
    /// vCPU count.
    pub cpu_cores: Option<u32>,
    /// Memory size in MiB.
    pub memory_size_mb: Option<u32>,
    /// Engine.
    pub provider: Option<CacheProvider>,
    /// Engine version.
    pub version: Option<String>,
    /// Datacenter.
    pub datacenter: Option<String>,
    /// Host name clients connect to.
    pub endpoint: Option<String>,
    /// TCP port clients connect to.
    pub port: Option<u16>,
    /// Applied parameter group.
    pub parameter_group_id: Option<String>,
}

impl Observed for CacheInstance {
    const KIND: ResourceKind = ResourceKind::Cache;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

/// Connection details for a cache.
#[derive(Clone, Deserialize, Eq, PartialEq)]
pub struct CacheConnectionInfo {
    /// Connection string.
    pub connection_info: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for CacheConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConnectionInfo")
            .field("connection_info", &self.connection_info)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operations on managed caches.
#[derive(Clone, Debug)]
pub struct CacheResource {
    inner: Collection,
}

impl CacheResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::Cache),
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            inner: self.inner.with_poll_interval(poll_interval),
        }
    }

    /// Overrides the operation deadlines.
    #[must_use]
    pub fn with_timeouts(self, timeouts: Timeouts) -> Self {
        Self {
            inner: self.inner.with_timeouts(timeouts),
        }
    }

    /// Creates a cache and returns it once it is `running`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the instance never becomes ready.
    pub async fn create(
        &self,
        request: &CreateCacheRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheInstance, ResourceError> {
        request.validate()?;
        let created: CacheInstance = self.inner.create(request, cancel).await?;
        await_ready(self, &created.id, self.inner.policy.timeouts.create, cancel).await?;
        self.get(&created.id, cancel).await
    }

    /// Reads one cache.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<CacheInstance, ResourceError> {
        self.inner.read(id, cancel).await
    }

    /// Lists every cache in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CacheInstance>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Fetches the connection string and password.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn connection_info(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<CacheConnectionInfo, ResourceError> {
        self.inner
            .fetch(&self.inner.action_path(id, "connection-info"), id, cancel)
            .await
    }

    /// Applies a change and returns immediately; see
    /// [`DatabaseResource::update`](super::DatabaseResource::update) for why
    /// resizes are not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateCacheRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheInstance, ResourceError> {
        let updated: CacheInstance = self.inner.update(id, request, cancel).await?;
        if self.inner.policy.waits_after_update {
            await_ready(self, id, self.inner.policy.timeouts.update, cancel).await?;
            return self.get(id, cancel).await;
        }
        Ok(updated)
    }

    /// Stops, deletes, and waits for the cache to disappear.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] naming the failed teardown step.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        Ok(delete_resource(self, id, self.inner.policy.timeouts.delete, cancel).await?)
    }

    /// Requests a start. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn start(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "start", None, cancel).await
    }

    /// Requests a stop. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn stop(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "stop", None, cancel).await
    }

    /// Waits until the cache reports `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] on timeout, error state, or
    /// cancellation.
    pub async fn wait_for_status(
        &self,
        id: &str,
        target: Status,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Status, ResourceError> {
        await_status(self, id, target, timeout, cancel).await
    }
}

impl Lifecycle for CacheResource {
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move {
            let instance: CacheInstance = self.inner.show(id, cancel).await?;
            Ok(instance.status)
        })
    }

    fn request_stop<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        Box::pin(self.inner.action(id, "stop", cancel))
    }

    fn request_delete<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        Box::pin(self.inner.remove(id, cancel))
    }
}
