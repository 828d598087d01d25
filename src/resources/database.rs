//! Managed relational databases.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{Collection, Observed, ResourceError, await_ready, await_status, require};

/// Parameters required to create a database.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateDatabaseRequest {
    /// Instance name.
    pub name: String,
    /// Engine: `mysql`, `postgresql`, or `mariadb`.
    pub provider: String,
    /// Initial database to create inside the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    /// Engine version. The control plane picks its default when unset.
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

impl CreateDatabaseRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("provider", &self.provider)?;
        require("datacenter", &self.datacenter)?;
        require("resource_profile", &self.resource_profile)
    }
}

/// Change request for a database. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateDatabaseRequest {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New sizing profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_profile: Option<String>,
    /// New parameter group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
}

/// Engine descriptor embedded in a database representation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct DatabaseEngine {
    /// Engine name.
    pub name: String,
}

/// Database as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct DatabaseInstance {
    /// Server-assigned identifier.
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Lifecycle status.
    pub status: Status,
    /// Sizing profile.
    pub resource_profile: Option<String>,
    /// Engine.
    pub engine: Option<DatabaseEngine>,
    /// Engine version.
    pub version: Option<String>,
    /// Initial database name.
    pub database_name: Option<String>,
    /// Datacenter.
    pub datacenter: Option<String>,
    /// Host name clients connect to.
    pub endpoint: Option<String>,
    /// TCP port clients connect to.
    pub port: Option<u16>,
    /// Administrative user.
    pub username: Option<String>,
    /// Applied parameter group.
    pub parameter_group_id: Option<String>,
}

impl Observed for DatabaseInstance {
    const KIND: ResourceKind = ResourceKind::Database;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

/// Connection credentials for a database.
#[derive(Clone, Deserialize, Eq, PartialEq)]
pub struct DatabaseCredentials {
    /// Connection string.
    pub connection_info: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("connection_info", &self.connection_info)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operations on managed databases.
#[derive(Clone, Debug)]
pub struct DatabaseResource {
    inner: Collection,
}

impl DatabaseResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::Database),
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

    /// Creates a database and returns it once it is `running`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the instance never becomes ready.
    pub async fn create(
        &self,
        request: &CreateDatabaseRequest,
        cancel: &CancellationToken,
    ) -> Result<DatabaseInstance, ResourceError> {
        request.validate()?;
        let created: DatabaseInstance = self.inner.create(request, cancel).await?;
        await_ready(self, &created.id, self.inner.policy.timeouts.create, cancel).await?;
        self.get(&created.id, cancel).await
    }

    /// Reads one database.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<DatabaseInstance, ResourceError> {
        self.inner.read(id, cancel).await
    }

    /// Lists every database in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DatabaseInstance>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Fetches connection credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn credentials(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<DatabaseCredentials, ResourceError> {
        self.inner
            .fetch(&self.inner.action_path(id, "credentials"), id, cancel)
            .await
    }

    /// Applies a change and returns immediately.
    ///
    /// Resizes are rolled out by a deployment job on the control plane that
    /// does not report through the instance status, so this call does not
    /// wait for `running`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateDatabaseRequest,
        cancel: &CancellationToken,
    ) -> Result<DatabaseInstance, ResourceError> {
        let updated: DatabaseInstance = self.inner.update(id, request, cancel).await?;
        if self.inner.policy.waits_after_update {
            await_ready(self, id, self.inner.policy.timeouts.update, cancel).await?;
            return self.get(id, cancel).await;
        }
        Ok(updated)
    }

    /// Stops, deletes, and waits for the database to disappear.
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

    /// Waits until the database reports `target`.
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

impl Lifecycle for DatabaseResource {
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move {
            let instance: DatabaseInstance = self.inner.show(id, cancel).await?;
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
