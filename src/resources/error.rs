//! Errors surfaced by the per-kind resource facades.

use thiserror::Error;

use crate::client::ClientError;
use crate::lifecycle::LifecycleError;
use crate::types::ResourceKind;

/// Errors raised by resource operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResourceError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// The resource does not exist (any more). Callers use this to prune
    /// stale state.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind.
        kind: ResourceKind,
        /// Identifier that was looked up.
        id: String,
    },
    /// A single control-plane call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A wait or teardown sequence failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ResourceError {
    /// Converts a client error for `id`, turning absence into
    /// [`ResourceError::NotFound`].
    pub(crate) fn for_id(kind: ResourceKind, id: &str, err: ClientError) -> Self {
        if err.is_not_found() {
            Self::NotFound {
                kind,
                id: id.to_owned(),
            }
        } else {
            Self::Client(err)
        }
    }

    /// Returns `true` when the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Client(err) => err.is_not_found(),
            Self::Lifecycle(err) => err.is_not_found(),
            Self::Validation(_) => false,
        }
    }
}
