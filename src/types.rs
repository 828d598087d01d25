//! Closed vocabularies for resource kinds and control-plane statuses.
//!
//! The control plane speaks plain strings. They are converted into
//! [`Status`] once, when a response body is decoded, so that the rest of the
//! crate can classify statuses with exhaustive matches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the control plane.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Accepted but not yet scheduled.
    Pending,
    /// Backend is allocating the resource.
    Provisioning,
    /// Backend is restoring the resource from a snapshot.
    Restoring,
    /// A deployment job is rolling out changes.
    Deploying,
    /// Serverless image build in progress.
    Building,
    /// Resource is powering on.
    Starting,
    /// Resource is powering off.
    Stopping,
    /// Resource is being torn down.
    Deleting,
    /// Compute-style resource is up.
    Running,
    /// Storage-style resource is usable.
    Active,
    /// Resource is powered off.
    Stopped,
    /// One-shot job (snapshot) has finished.
    Completed,
    /// Control plane gave up.
    Error,
    /// Control plane gave up (serverless/snapshot vocabulary).
    Failed,
    /// Resource no longer exists. Never sent by the API; synthesised when a
    /// status fetch answers "not found".
    Deleted,
    /// Any status string this crate does not know yet.
    Other(String),
}

impl Status {
    /// Parses a wire status. Matching ignores case and surrounding space.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "provisioning" => Self::Provisioning,
            "restoring" => Self::Restoring,
            "deploying" => Self::Deploying,
            "building" => Self::Building,
            "starting" => Self::Starting,
            "stopping" => Self::Stopping,
            "deleting" => Self::Deleting,
            "running" => Self::Running,
            "active" => Self::Active,
            "stopped" => Self::Stopped,
            "completed" => Self::Completed,
            "error" => Self::Error,
            "failed" => Self::Failed,
            "deleted" => Self::Deleted,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Restoring => "restoring",
            Self::Deploying => "deploying",
            Self::Building => "building",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Deleting => "deleting",
            Self::Running => "running",
            Self::Active => "active",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Returns `true` while the backend is still working on the resource.
    ///
    /// Unknown statuses count as transitional: polling continues until the
    /// deadline rather than guessing that an unfamiliar value is final.
    #[must_use]
    pub const fn is_transitional(&self) -> bool {
        match self {
            Self::Pending
            | Self::Provisioning
            | Self::Restoring
            | Self::Deploying
            | Self::Building
            | Self::Starting
            | Self::Stopping
            | Self::Deleting
            | Self::Other(_) => true,
            Self::Running
            | Self::Active
            | Self::Stopped
            | Self::Completed
            | Self::Error
            | Self::Failed
            | Self::Deleted => false,
        }
    }

    /// Returns `true` for statuses the backend refuses stop/delete requests
    /// in, because the resource is still being brought up.
    #[must_use]
    pub const fn is_settling(&self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Provisioning
                | Self::Restoring
                | Self::Deploying
                | Self::Building
                | Self::Starting
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_owned()
    }
}

/// Kinds of resource managed through the control plane.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKind {
    /// Virtual private server.
    Vps,
    /// Managed relational database.
    Database,
    /// Managed in-memory cache.
    Cache,
    /// Object-storage bucket.
    Bucket,
    /// Serverless container.
    Serverless,
    /// Point-in-time snapshot of a VPS.
    VpsSnapshot,
    /// Point-in-time snapshot of a cache.
    CacheSnapshot,
    /// Point-in-time snapshot of a database.
    DatabaseSnapshot,
    /// SSH public key registered with the account.
    SshKey,
    /// S3-compatible storage access key.
    AccessKey,
}

impl ResourceKind {
    /// Collection path on the control-plane API.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Vps => "/vps",
            Self::Database => "/database",
            Self::Cache => "/cache",
            Self::Bucket => "/storage/buckets",
            Self::Serverless => "/serverless",
            Self::VpsSnapshot => "/snapshots/vps",
            Self::CacheSnapshot => "/snapshots/cache",
            Self::DatabaseSnapshot => "/snapshots/database",
            Self::SshKey => "/ssh-keys",
            Self::AccessKey => "/storage/access-keys",
        }
    }

    /// Human readable noun used in log lines and error messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Vps => "VPS",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Bucket => "storage bucket",
            Self::Serverless => "serverless container",
            Self::VpsSnapshot => "VPS snapshot",
            Self::CacheSnapshot => "cache snapshot",
            Self::DatabaseSnapshot => "database snapshot",
            Self::SshKey => "SSH key",
            Self::AccessKey => "storage access key",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}
