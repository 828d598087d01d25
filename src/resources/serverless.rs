//! Serverless containers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{Collection, Observed, ResourceError, await_ready, await_status, lenient_map, require};

/// Parameters required to deploy a container.
///
/// Exactly one source is expected: either `image_url` for an image
/// deployment or `git_repository` for a build from source.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateServerlessRequest {
    /// Container name.
    pub name: String,
    /// Named sizing profile.
    pub resource_profile: String,
    /// `image` or `git`.
    pub deployment_type: String,
    /// Image to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Repository to build from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repository: Option<String>,
    /// Branch to build from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Port the container listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Minimum replica count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    /// Maximum replica count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    /// Environment passed to the container.
    pub environment_variables: BTreeMap<String, String>,
}

impl CreateServerlessRequest {
    /// Validates required fields and the deployment source.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first missing field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("resource_profile", &self.resource_profile)?;
        require("deployment_type", &self.deployment_type)?;
        match self.deployment_type.trim() {
            "git" => require("git_repository", self.git_repository.as_deref().unwrap_or("")),
            _ => require("image_url", self.image_url.as_deref().unwrap_or("")),
        }?;
        match (self.min_instances, self.max_instances) {
            (Some(min), Some(max)) if min > max => {
                Err(ResourceError::Validation(String::from("max_instances")))
            }
            _ => Ok(()),
        }
    }
}

/// Change request for a container. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateServerlessRequest {
    /// New sizing profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_profile: Option<String>,
    /// New image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// New branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// New listening port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// New minimum replica count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    /// New maximum replica count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    /// Replacement environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, String>>,
}

/// Container as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ServerlessContainer {
    /// Server-assigned identifier.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Lifecycle status.
    pub status: Status,
    /// Sizing profile.
    pub resource_profile: Option<String>,
    /// `image` or `git`.
    pub deployment_type: Option<String>,
    /// Image being run.
    pub image_url: Option<String>,
    /// Source repository.
    pub git_repository: Option<String>,
    /// Source branch.
    pub git_branch: Option<String>,
    /// Listening port.
    pub port: Option<u16>,
    /// Minimum replica count.
    pub min_instances: Option<u32>,
    /// Maximum replica count.
    pub max_instances: Option<u32>,
    /// Environment passed to the container.
    #[serde(default, deserialize_with = "lenient_map")]
    pub environment_variables: BTreeMap<String, String>,
    /// Public URL, once routed.
    pub url: Option<String>,
}

impl Observed for ServerlessContainer {
    const KIND: ResourceKind = ResourceKind::Serverless;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

/// Show responses carry the public URL beside the container. The top-level
/// value is authoritative.
#[derive(Deserialize)]
struct ShowBody {
    container: ServerlessContainer,
    #[serde(default)]
    url: Option<String>,
}

impl ShowBody {
    fn into_container(self) -> ServerlessContainer {
        let mut container = self.container;
        container.url = self.url.or(container.url);
        container
    }
}

/// Operations on serverless containers.
#[derive(Clone, Debug)]
pub struct ServerlessResource {
    inner: Collection,
}

impl ServerlessResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::Serverless),
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

    /// Deploys a container and waits for it to report `running`.
    ///
    /// A rollout that fails or outlasts the create timeout is logged and the
    /// container is returned as currently observed.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the caller cancels the wait.
    pub async fn create(
        &self,
        request: &CreateServerlessRequest,
        cancel: &CancellationToken,
    ) -> Result<ServerlessContainer, ResourceError> {
        request.validate()?;
        let created: ServerlessContainer = self.inner.create(request, cancel).await?;
        await_ready(self, &created.id, self.inner.policy.timeouts.create, cancel).await?;
        self.get(&created.id, cancel).await
    }

    /// Reads one container, including its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the container does not exist.
    pub async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ServerlessContainer, ResourceError> {
        let body: ShowBody = self
            .inner
            .fetch(&self.inner.item_path(id), id, cancel)
            .await?;
        Ok(body.into_container())
    }

    /// Lists every container in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ServerlessContainer>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Redeploys with the change and waits for `running`. As with
    /// [`ServerlessResource::create`], a stalled rollout is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the container does not exist
    /// and [`ResourceError::Lifecycle`] when the caller cancels the wait.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateServerlessRequest,
        cancel: &CancellationToken,
    ) -> Result<ServerlessContainer, ResourceError> {
        let updated: ServerlessContainer = self.inner.update(id, request, cancel).await?;
        if !self.inner.policy.waits_after_update {
            return Ok(updated);
        }
        await_ready(self, id, self.inner.policy.timeouts.update, cancel).await?;
        self.get(id, cancel).await
    }

    /// Deletes the container and waits for it to disappear.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] naming the failed teardown step.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        Ok(delete_resource(self, id, self.inner.policy.timeouts.delete, cancel).await?)
    }

    /// Waits until the container reports `target`.
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
}

impl Lifecycle for ServerlessResource {
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move {
            let container: ServerlessContainer = self.inner.show(id, cancel).await?;
            Ok(container.status)
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
