//! State errors synthesised by the poller and the delete orchestrator.

use std::fmt;

use thiserror::Error;

use crate::client::ClientError;
use crate::types::{ResourceKind, Status};

/// Stage of the teardown sequence.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DeleteStep {
    /// Initial status fetch.
    Inspect,
    /// Waiting for a provisioning resource to become stable.
    Settle,
    /// Issuing the stop call.
    Stop,
    /// Waiting for the resource to report `stopped`.
    AwaitStopped,
    /// Issuing the delete call.
    Delete,
    /// Waiting for the resource to disappear.
    AwaitDeletion,
}

impl DeleteStep {
    /// Short label used in messages and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inspect => "inspect",
            Self::Settle => "settle",
            Self::Stop => "stop",
            Self::AwaitStopped => "await-stopped",
            Self::Delete => "delete",
            Self::AwaitDeletion => "await-deletion",
        }
    }
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn describe(status: Option<&Status>) -> &str {
    status.map_or("unknown", Status::as_str)
}

/// Errors raised while reconciling a resource towards a target status.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LifecycleError {
    /// A status fetch failed for a reason other than absence.
    #[error("failed to fetch status of {kind} {id}: {source}")]
    Fetch {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Underlying client error.
        source: ClientError,
    },
    /// The resource reached a status the control plane does not recover from.
    #[error("{kind} {id} entered error state: {status}")]
    EnteredErrorState {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Terminal status observed.
        status: Status,
    },
    /// The deadline elapsed before the target status was observed.
    #[error("timeout waiting for {kind} {id} to reach {target} (last status: {last_status})")]
    Timeout {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Status that was awaited.
        target: Status,
        /// Last status observed before giving up.
        last_status: Status,
    },
    /// The caller cancelled the operation.
    #[error("operation on {kind} {id} cancelled")]
    Cancelled {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
    },
    /// A mutating call (stop, delete) was rejected or failed in transit.
    #[error("failed to {action} {kind} {id}: {source}")]
    Request {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Action attempted.
        action: &'static str,
        /// Underlying client error.
        source: ClientError,
    },
    /// A provisioning resource never reached a stable status.
    #[error("{kind} {id} failed to reach stable state: it is in state {status}, cannot delete")]
    Unstable {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Status observed after the settle wait gave up.
        status: Status,
    },
    /// A teardown step failed; the resource may be partially torn down.
    #[error(
        "failed to delete {kind} {id} during {step} (last known status: {}): {source}",
        describe(.last_status.as_ref())
    )]
    DeleteFailed {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: String,
        /// Step that failed.
        step: DeleteStep,
        /// Last status observed before the failure, if any was.
        last_status: Option<Status>,
        /// Failure raised by the step.
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    /// Returns `true` when the failure means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Fetch { source, .. } | Self::Request { source, .. } => source.is_not_found(),
            Self::DeleteFailed { source, .. } => source.is_not_found(),
            Self::EnteredErrorState { .. }
            | Self::Timeout { .. }
            | Self::Cancelled { .. }
            | Self::Unstable { .. } => false,
        }
    }

    /// Returns `true` when the operation stopped because the caller
    /// cancelled it, at whatever step that happened.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::DeleteFailed { source, .. } => source.is_cancelled(),
            Self::Fetch { .. }
            | Self::EnteredErrorState { .. }
            | Self::Timeout { .. }
            | Self::Request { .. }
            | Self::Unstable { .. } => false,
        }
    }

    /// Last status the failure observed, when it carries one.
    #[must_use]
    pub const fn observed_status(&self) -> Option<&Status> {
        match self {
            Self::EnteredErrorState { status, .. } | Self::Unstable { status, .. } => Some(status),
            Self::Timeout { last_status, .. } => Some(last_status),
            Self::DeleteFailed { last_status, .. } => last_status.as_ref(),
            Self::Fetch { .. } | Self::Cancelled { .. } | Self::Request { .. } => None,
        }
    }
}
