//! Account SSH keys. Keys are stored synchronously and carry no status.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::types::ResourceKind;

use super::{Collection, Envelope, ResourceError, require, string_or_number};

/// Parameters required to register a key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CreateSshKeyRequest {
    /// Key name.
    pub name: String,
    /// OpenSSH public key line.
    pub public_key: String,
}

impl CreateSshKeyRequest {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResourceError> {
        require("name", &self.name)?;
        require("public_key", &self.public_key)
    }
}

/// Key as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SshKey {
    /// Server-assigned identifier. Sent as an integer.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Key name.
    pub name: String,
    /// Key fingerprint.
    pub fingerprint: Option<String>,
    /// OpenSSH public key line.
    pub public_key: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

/// Operations on account SSH keys.
#[derive(Clone, Debug)]
pub struct SshKeyResource {
    inner: Collection,
}

impl SshKeyResource {
    /// Creates the facade.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            inner: Collection::new(client, ResourceKind::SshKey),
        }
    }

    /// Registers a key.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for an invalid request and
    /// [`ResourceError::Client`] when the call fails.
    pub async fn create(
        &self,
        request: &CreateSshKeyRequest,
        cancel: &CancellationToken,
    ) -> Result<SshKey, ResourceError> {
        request.validate()?;
        let created: Envelope<SshKey> = self
            .inner
            .client
            .post(self.inner.kind().path(), request, cancel)
            .await?;
        tracing::info!(id = %created.item.id, name = %created.item.name, "SSH key registered");
        Ok(created.item)
    }

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when the key does not exist.
    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<SshKey, ResourceError> {
        self.inner.read(id, cancel).await
    }

    /// Lists every key in the account.
    ///
    /// # Errors
    ///
    /// Returns the first page failure.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<SshKey>, ResourceError> {
        self.inner.list(cancel).await
    }

    /// Removes a key. A key that is already gone counts as removed.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Client`] when the control plane rejects the
    /// call.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ResourceError> {
        match self.inner.remove(id, cancel).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::debug!(id, "SSH key already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
