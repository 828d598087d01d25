//! Object-storage buckets.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{Collection, Observed, ResourceError, await_ready, await_status, require};

/// Parameters required to create a bucket.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateBucketRequest {
    /// Bucket name, unique per region.
    pub name: String,
    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Storage region.
    pub region: String,
    /// Keep prior object versions.
    pub versioning_enabled: bool,
    /// Allow anonymous reads.
    pub public_access: bool,
    /// Encrypt objects at rest.
    pub encryption_enabled: bool,
    /// Encryption scheme, e.g. `AES256`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_type: Option<String>,
}

impl CreateBucketRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("region", &self.region)
    }
}

/// Change request for a bucket. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateBucketRequest {
    /// New label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Toggle versioning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning_enabled: Option<bool>,
    /// Toggle anonymous reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_access: Option<bool>,
    /// Toggle encryption at rest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_enabled: Option<bool>,
    /// New encryption scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_type: Option<String>,
}

/// Bucket as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct StorageBucket {
    /// Server-assigned identifier.
    pub id: String,
    /// Bucket name.
    pub name: String,
    /// Human-readable label.
    pub display_name: Option<String>,
    /// Lifecycle status.
    pub status: Status,
    /// Storage region.
    pub region: Option<String>,
    /// S3-compatible endpoint.
    pub endpoint: Option<String>,
    /// Versioning flag.
    #[serde(default)]
    pub versioning_enabled: bool,
    /// Anonymous-read flag.
    #[serde(default)]
    pub public_access: bool,
    /// Encryption flag.
    #[serde(default)]
    pub encryption_enabled: bool,
    /// Encryption scheme.
    pub encryption_type: Option<String>,
}

impl Observed for StorageBucket {
    const KIND: ResourceKind = ResourceKind::Bucket;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

/// Operations on object-storage buckets.
#[derive(Clone, Debug)]
pub struct BucketResource {
    inner: Collection,
}

impl BucketResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::Bucket),
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

    /// Creates a bucket and returns it once it is `active`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the bucket never becomes active.
    pub async fn create(
        &self,
        request: &CreateBucketRequest,
        cancel: &CancellationToken,
    ) -> Result<StorageBucket, ResourceError> {
        request.validate()?;
        let created: StorageBucket = self.inner.create(request, cancel).await?;
        await_ready(self, &created.id, self.inner.policy.timeouts.create, cancel).await?;
        self.get(&created.id, cancel).await
    }

    /// Reads one bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the bucket does not exist.
    pub async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<StorageBucket, ResourceError> {
        self.inner.read(id, cancel).await
    }

    /// Lists every bucket in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StorageBucket>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Applies a change. Bucket settings take effect synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the bucket does not exist.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateBucketRequest,
        cancel: &CancellationToken,
    ) -> Result<StorageBucket, ResourceError> {
        let updated: StorageBucket = self.inner.update(id, request, cancel).await?;
        if self.inner.policy.waits_after_update {
            await_ready(self, id, self.inner.policy.timeouts.update, cancel).await?;
            return self.get(id, cancel).await;
        }
        Ok(updated)
    }

    /// Deletes the bucket and waits for it to disappear.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] naming the failed teardown step.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        Ok(delete_resource(self, id, self.inner.policy.timeouts.delete, cancel).await?)
    }

    /// Waits until the bucket reports `target`.
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

impl Lifecycle for BucketResource {
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move {
            let bucket: StorageBucket = self.inner.show(id, cancel).await?;
            Ok(bucket.status)
        })
    }

    fn request_delete<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        Box::pin(self.inner.remove(id, cancel))
    }
}
