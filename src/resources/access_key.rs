//! S3-compatible storage access keys.
//!
//! Keys are issued synchronously. The secret half is only ever returned by
//! the create call; later reads carry the public identifier alone.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::types::ResourceKind;

use super::{Collection, ResourceError, require};

/// Parameters required to issue a key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateAccessKeyRequest {
    /// Key name.
    pub name: String,
    /// Expiry timestamp. Keys without one never expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl CreateAccessKeyRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] when the name is empty.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)
    }
}

/// Freshly issued key, including its secret.
#[derive(Clone, Deserialize, Eq, PartialEq)]
pub struct IssuedAccessKey {
    /// Server-assigned identifier.
    pub id: String,
    /// Key name.
    pub name: String,
    /// Public access key identifier.
    pub access_key_id: String,
    /// Secret access key. Not retrievable later.
    pub secret_access_key: String,
    /// Expiry timestamp.
    pub expires_at: Option<String>,
    /// Whether the key is limited to a bucket prefix.
    #[serde(default)]
    pub is_prefix_scoped: bool,
}

impl fmt::Debug for IssuedAccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedAccessKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("is_prefix_scoped", &self.is_prefix_scoped)
            .finish()
    }
}

/// Key as reported by a later read.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AccessKey {
    /// Server-assigned identifier.
    pub id: String,
    /// Key name.
    pub name: String,
    /// Public access key identifier.
    pub access_key_id: String,
    /// Raw status string, for example `active` or `revoked`.
    pub status: Option<String>,
    /// `read`, `write`, or `full`.
    pub access_type: Option<String>,
    /// Whether the key is limited to a bucket prefix.
    #[serde(default)]
    pub is_prefix_scoped: bool,
    /// Expiry timestamp.
    pub expires_at: Option<String>,
    /// Last use timestamp.
    pub last_used_at: Option<String>,
    /// Revocation timestamp.
    pub revoked_at: Option<String>,
    /// Whether the expiry has passed.
    #[serde(default)]
    pub is_expired: bool,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct ShowBody {
    access_key: AccessKey,
}

/// Operations on storage access keys.
#[derive(Clone, Debug)]
pub struct AccessKeyResource {
    inner: Collection,
}

impl AccessKeyResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::AccessKey),
        }
    }

    /// Issues a key. The returned value is the only copy of the secret.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request and
    /// [`ResourceError::Client`] when the call fails.
    pub async fn create(
        &self,
        request: &CreateAccessKeyRequest,
        cancel: &CancellationToken,
    ) -> Result<IssuedAccessKey, ResourceError> {
        request.validate()?;
        let issued: IssuedAccessKey = self
            .inner
            .client
            .post(self.inner.kind().path(), request, cancel)
            .await?;
        tracing::info!(id = %issued.id, access_key_id = %issued.access_key_id, "storage access key issued");
        Ok(issued)
    }

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the key does not exist.
    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<AccessKey, ResourceError> {
        let body: ShowBody = self
            .inner
            .fetch(&self.inner.item_path(id), id, cancel)
            .await?;
        Ok(body.access_key)
    }

    /// Revokes a key. A key that is already gone counts as revoked.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Client`] when the control plane rejects the
    /// call.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        match self.inner.remove(id, cancel).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::debug!(id, "storage access key already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
