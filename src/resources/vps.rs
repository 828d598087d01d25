//! Virtual private servers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture, Timeouts, delete_resource};
use crate::types::{ResourceKind, Status};

use super::{
    Collection, Observed, ResourceError, await_ready, await_status, optional_string_or_number,
    require,
};

/// How the first login to a new VPS is authenticated.
#[derive(Clone, Eq, PartialEq)]
pub enum VpsAuth {
    /// Install a registered SSH key, by identifier.
    SshKey(String),
    /// Set a root password.
    Password(String),
}

impl std::fmt::Debug for VpsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SshKey(id) => f.debug_tuple("SshKey").field(id).finish(),
            Self::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Parameters required to create a VPS.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateVpsRequest {
    /// Instance name.
    pub name: String,
    /// Image identifier, for example `ubuntu-24.04`.
    pub image: String,
    /// Datacenter to place the instance in.
    pub datacenter: String,
    /// Named sizing profile. Optional when explicit sizing is given.
    pub resource_profile: Option<String>,
    /// `shared` or `dedicated` CPU allocation.
    pub cpu_allocation_type: Option<String>,
    /// Network stack, for example `dual_stack`.
    pub network_stack: Option<String>,
    /// Login authentication.
    pub auth: VpsAuth,
    /// Cloud-init user data appended to the provider defaults.
    pub custom_cloud_init: Option<String>,
    /// Explicit vCPU count.
    pub cpu_cores: Option<u32>,
    /// Explicit memory size in GiB.
    pub memory_size_gb: Option<u32>,
    /// Explicit disk size in GiB.
    pub storage_size_gb: Option<u32>,
}

#[derive(Serialize)]
struct CreateVpsBody<'a> {
    name: &'a str,
    image: &'a str,
    datacenter: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_profile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_allocation_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_stack: Option<&'a str>,
    auth_method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssh_key_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_confirmation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_cloud_init: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_size_gb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_size_gb: Option<u32>,
}

impl CreateVpsRequest {
    /// Starts a builder for a [`CreateVpsRequest`].
    #[must_use]
    pub fn builder() -> CreateVpsRequestBuilder {
        CreateVpsRequestBuilder::default()
    }

    /// Validates the request, returning a descriptive error when a required
    /// field is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("image", &self.image)?;
        require("datacenter", &self.datacenter)?;
        match &self.auth {
            VpsAuth::SshKey(id) => require("ssh_key_id", id),
            VpsAuth::Password(password) => require("password", password),
        }
    }

    fn body(&self) -> CreateVpsBody<'_> {
        let (auth_method, ssh_key_id, password) = match &self.auth {
            VpsAuth::SshKey(id) => ("ssh_key", Some(id.as_str()), None),
            VpsAuth::Password(password) => ("password", None, Some(password.as_str())),
        };
        CreateVpsBody {
            name: &self.name,
            image: &self.image,
            datacenter: &self.datacenter,
            resource_profile: self.resource_profile.as_deref(),
            cpu_allocation_type: self.cpu_allocation_type.as_deref(),
            network_stack: self.network_stack.as_deref(),
            auth_method,
            ssh_key_id,
            password,
            password_confirmation: password,
            custom_cloud_init: self.custom_cloud_init.as_deref(),
            cpu_cores: self.cpu_cores,
            memory_size_gb: self.memory_size_gb,
            storage_size_gb: self.storage_size_gb,
        }
    }
}

/// Builder for [`CreateVpsRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreateVpsRequestBuilder {
    name: String,
    image: String,
    datacenter: String,
    resource_profile: Option<String>,
    cpu_allocation_type: Option<String>,
    network_stack: Option<String>,
    auth: Option<VpsAuth>,
    custom_cloud_init: Option<String>,
    cpu_cores: Option<u32>,
    memory_size_gb: Option<u32>,
    storage_size_gb: Option<u32>,
}

impl CreateVpsRequestBuilder {
    /// Sets the instance name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the image.
    #[must_use]
    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = value.into();
        self
    }

    /// Sets the datacenter.
    #[must_use]
    pub fn datacenter(mut self, value: impl Into<String>) -> Self {
        self.datacenter = value.into();
        self
    }

    /// Sets the named sizing profile.
    #[must_use]
    pub fn resource_profile(mut self, value: impl Into<String>) -> Self {
        self.resource_profile = Some(value.into());
        self
    }

    /// Sets the CPU allocation type.
    #[must_use]
    pub fn cpu_allocation_type(mut self, value: impl Into<String>) -> Self {
        self.cpu_allocation_type = Some(value.into());
        self
    }

    /// Sets the network stack.
    #[must_use]
    pub fn network_stack(mut self, value: impl Into<String>) -> Self {
        self.network_stack = Some(value.into());
        self
    }

    /// Authenticates with a registered SSH key.
    #[must_use]
    pub fn ssh_key(mut self, key_id: impl Into<String>) -> Self {
        self.auth = Some(VpsAuth::SshKey(key_id.into()));
        self
    }

    /// Authenticates with a root password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = Some(VpsAuth::Password(password.into()));
        self
    }

    /// Sets custom cloud-init user data.
    #[must_use]
    pub fn custom_cloud_init(mut self, value: impl Into<String>) -> Self {
        self.custom_cloud_init = Some(value.into());
        self
    }

    /// Requests explicit sizing instead of, or on top of, a profile.
    #[must_use]
    pub const fn sizing(mut self, cpu_cores: u32, memory_size_gb: u32, storage_size_gb: u32) -> Self {
        self.cpu_cores = Some(cpu_cores);
        self.memory_size_gb = Some(memory_size_gb);
        self.storage_size_gb = Some(storage_size_gb);
        self
    }

    /// Builds and validates the [`CreateVpsRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] when a required field is empty
    /// or no authentication method was chosen.
    pub fn build(self) -> Result<CreateVpsRequest, ResourceError> {
        let trim = |value: Option<String>| value.map(|text| text.trim().to_owned());
        let auth = match self.auth {
            Some(VpsAuth::SshKey(id)) => VpsAuth::SshKey(id.trim().to_owned()),
            Some(VpsAuth::Password(password)) => VpsAuth::Password(password),
            None => return Err(ResourceError::Validation(String::from("auth_method"))),
        };
        let request = CreateVpsRequest {
            name: self.name.trim().to_owned(),
            image: self.image.trim().to_owned(),
            datacenter: self.datacenter.trim().to_owned(),
            resource_profile: trim(self.resource_profile),
            cpu_allocation_type: trim(self.cpu_allocation_type),
            network_stack: trim(self.network_stack),
            auth,
            custom_cloud_init: self.custom_cloud_init,
            cpu_cores: self.cpu_cores,
            memory_size_gb: self.memory_size_gb,
            storage_size_gb: self.storage_size_gb,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Resize request for a VPS. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateVpsRequest {
    /// New sizing profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_profile: Option<String>,
    /// New CPU allocation type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_allocation_type: Option<String>,
    /// New vCPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    /// New memory size in GiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size_gb: Option<u32>,
    /// New disk size in GiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size_gb: Option<u32>,
}

#[derive(Serialize)]
struct ReinstallBody<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_cloud_init: Option<&'a str>,
}

/// VPS as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct VpsInstance {
    /// Server-assigned identifier.
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Lifecycle status.
    pub status: Status,
    /// Sizing profile.
    pub resource_profile: Option<String>,
    /// CPU allocation type.
    pub cpu_allocation_type: Option<String>,
    /// vCPU count.
    pub cpu_cores: Option<u32>,
    /// Memory size in GiB.
    pub memory_size_gb: Option<u32>,
    /// Disk size in GiB.
    pub storage_size_gb: Option<u32>,
    /// Image the instance was installed from.
    pub image: Option<String>,
    /// Datacenter.
    pub datacenter: Option<String>,
    /// Public IPv4 address, once assigned.
    pub public_ip: Option<String>,
    /// Private network address.
    pub private_ip: Option<String>,
    /// Public IPv6 address.
    pub ipv6_address: Option<String>,
    /// SSH key installed at creation.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub ssh_key_id: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

impl Observed for VpsInstance {
    const KIND: ResourceKind = ResourceKind::Vps;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

/// OS image available for new instances.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct VpsImage {
    /// Image identifier.
    pub id: String,
    /// Image slug used in create requests.
    pub image: String,
    /// Display label.
    pub label: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Distribution name.
    pub distro: Option<String>,
    /// Distribution version. The API sends strings or numbers.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub version: Option<String>,
    /// Image family.
    pub family: Option<String>,
    /// Default login user.
    pub default_user: Option<String>,
}

#[derive(Deserialize)]
struct ImagesBody {
    images: Vec<VpsImage>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: Status,
}

/// Operations on virtual private servers.
#[derive(Clone, Debug)]
pub struct VpsResource {
    inner: Collection,
}

impl VpsResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::Vps),
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

    /// Creates a VPS and returns it once it is `running`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request,
    /// [`ResourceError::Client`] when the create call fails, and
    /// [`ResourceError::Lifecycle`] when the instance never becomes ready.
    pub async fn create(
        &self,
        request: &CreateVpsRequest,
        cancel: &CancellationToken,
    ) -> Result<VpsInstance, ResourceError> {
        request.validate()?;
        let created: VpsInstance = self.inner.create(&request.body(), cancel).await?;
        await_ready(self, &created.id, self.inner.policy.timeouts.create, cancel).await?;
        self.get(&created.id, cancel).await
    }

    /// Reads one VPS.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn get(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<VpsInstance, ResourceError> {
        self.inner.read(id, cancel).await
    }

    /// Reads only the status of one VPS.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn status(&self, id: &str, cancel: &CancellationToken) -> Result<Status, ResourceError> {
        let body: StatusBody = self
            .inner
            .fetch(&self.inner.action_path(id, "status"), id, cancel)
            .await?;
        Ok(body.status)
    }

    /// Lists every VPS in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<VpsInstance>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Lists the images new instances can be installed from.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Client`] when the call fails.
    pub async fn images(&self, cancel: &CancellationToken) -> Result<Vec<VpsImage>, ResourceError> {
        let path = format!("{}/images", ResourceKind::Vps.path());
        let body: ImagesBody = self.inner.client.get(&path, cancel).await?;
        Ok(body.images)
    }

    /// Resizes a VPS and waits for it to be `running` again.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist
    /// and [`ResourceError::Lifecycle`] when it does not come back up.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateVpsRequest,
        cancel: &CancellationToken,
    ) -> Result<VpsInstance, ResourceError> {
        let updated: VpsInstance = self.inner.update(id, request, cancel).await?;
        if !self.inner.policy.waits_after_update {
            return Ok(updated);
        }
        await_ready(self, id, self.inner.policy.timeouts.update, cancel).await?;
        self.get(id, cancel).await
    }

    /// Stops, deletes, and waits for the VPS to disappear.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Lifecycle`] naming the failed teardown step.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        Ok(delete_resource(self, id, self.inner.policy.timeouts.delete, cancel).await?)
    }

    /// Requests a power-on. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn start(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "start", None, cancel).await
    }

    /// Requests a power-off. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn stop(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "stop", None, cancel).await
    }

    /// Requests a reboot. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn reboot(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        self.inner.perform::<()>(id, "reboot", None, cancel).await
    }

    /// Reinstalls the instance from `image`. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] when `image` is empty and
    /// [`ResourceError::NotFound`] when the instance does not exist.
    pub async fn reinstall(
        &self,
        id: &str,
        image: &str,
        custom_cloud_init: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), ResourceError> {
        require("image", image)?;
        let body = ReinstallBody {
            image: image.trim(),
            custom_cloud_init,
        };
        self.inner
            .perform(id, "reinstall", Some(&body), cancel)
            .await
    }

    /// Waits until the VPS reports `target`. Absence satisfies
    /// [`Status::Deleted`].
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

impl Lifecycle for VpsResource {
    fn policy(&self) -> &KindPolicy {
        &self.inner.policy
    }

    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        Box::pin(async move {
            let path = self.inner.action_path(id, "status");
            let body: StatusBody = self.inner.client.get(&path, cancel).await?;
            Ok(body.status)
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
