//! Status poller: blocks until a resource reaches a target status.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::types::Status;

use super::{Lifecycle, LifecycleError};

/// One reconciliation target: reach `target` on `id` within `timeout`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitFor {
    /// Resource identifier.
    pub id: String,
    /// Status to wait for. [`Status::Deleted`] is satisfied by absence.
    pub target: Status,
    /// Budget measured from the start of the wait.
    pub timeout: Duration,
}

impl WaitFor {
    /// Builds a wait descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, target: Status, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            target,
            timeout,
        }
    }
}

enum Observation {
    Reached(Status),
    Pending(Status),
}

async fn observe<L>(
    ops: &L,
    wait: &WaitFor,
    cancel: &CancellationToken,
) -> Result<Observation, LifecycleError>
where
    L: Lifecycle + ?Sized,
{
    let policy = ops.policy();
    let kind = policy.kind;
    match ops.fetch_status(&wait.id, cancel).await {
        Ok(status) => {
            tracing::debug!(%kind, id = %wait.id, %status, target = %wait.target, "observed status");
            if status == wait.target {
                Ok(Observation::Reached(status))
            } else if policy.is_terminal_error(&status) {
                Err(LifecycleError::EnteredErrorState {
                    kind,
                    id: wait.id.clone(),
                    status,
                })
            } else {
                Ok(Observation::Pending(status))
            }
        }
        Err(err) if err.is_not_found() && wait.target == Status::Deleted => {
            tracing::debug!(%kind, id = %wait.id, "resource gone");
            Ok(Observation::Reached(Status::Deleted))
        }
        Err(ClientError::Cancelled) => Err(LifecycleError::Cancelled {
            kind,
            id: wait.id.clone(),
        }),
        Err(source) => Err(LifecycleError::Fetch {
            kind,
            id: wait.id.clone(),
            source,
        }),
    }
}

/// Polls `ops` until `wait.target` is observed and returns the final status.
///
/// The first fetch happens immediately; later fetches are spaced by the
/// kind's poll interval. Absence satisfies a [`Status::Deleted`] target.
/// The call returns no later than one poll interval after the deadline.
///
/// # Errors
///
/// - [`LifecycleError::EnteredErrorState`] when a terminal error status is
///   observed that is not itself the target.
/// - [`LifecycleError::Timeout`] once a tick fires after the deadline.
/// - [`LifecycleError::Cancelled`] when `cancel` fires.
/// - [`LifecycleError::Fetch`] when a status fetch fails; the failed fetch is
///   not retried.
pub async fn wait_for_status<L>(
    ops: &L,
    wait: &WaitFor,
    cancel: &CancellationToken,
) -> Result<Status, LifecycleError>
where
    L: Lifecycle + ?Sized,
{
    let policy = ops.policy();
    let start = Instant::now();
    let deadline = start + wait.timeout;

    let mut last_status = match observe(ops, wait, cancel).await? {
        Observation::Reached(status) => return Ok(status),
        Observation::Pending(status) => status,
    };

    let mut ticker = interval_at(start + policy.poll_interval, policy.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(LifecycleError::Cancelled {
                    kind: policy.kind,
                    id: wait.id.clone(),
                });
            }
            _ = ticker.tick() => {}
        }

        if Instant::now() > deadline {
            tracing::debug!(kind = %policy.kind, id = %wait.id, target = %wait.target, "wait deadline elapsed");
            return Err(LifecycleError::Timeout {
                kind: policy.kind,
                id: wait.id.clone(),
                target: wait.target.clone(),
                last_status,
            });
        }

        last_status = match observe(ops, wait, cancel).await? {
            Observation::Reached(status) => return Ok(status),
            Observation::Pending(status) => status,
        };
    }
}
