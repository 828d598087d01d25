//! Delete orchestrator: settle, stop, delete, then wait for disappearance.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::types::Status;

use super::{DeleteStep, Lifecycle, LifecycleError, WaitFor, wait_for_status};

/// Outcome of a step that may discover the resource is already gone.
enum Progress {
    Continue(Status),
    Gone,
}

struct Teardown<'a, L: ?Sized> {
    ops: &'a L,
    id: &'a str,
    deadline: Instant,
    cancel: &'a CancellationToken,
}

impl<L> Teardown<'_, L>
where
    L: Lifecycle + ?Sized,
{
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn fail(
        &self,
        step: DeleteStep,
        last_status: Option<&Status>,
        err: LifecycleError,
    ) -> LifecycleError {
        let observed = err.observed_status().or(last_status).cloned();
        LifecycleError::DeleteFailed {
            kind: self.ops.policy().kind,
            id: self.id.to_owned(),
            step,
            last_status: observed,
            source: Box::new(err),
        }
    }

    fn rejected(&self, action: &'static str, err: ClientError) -> LifecycleError {
        let kind = self.ops.policy().kind;
        let id = self.id.to_owned();
        match err {
            ClientError::Cancelled => LifecycleError::Cancelled { kind, id },
            source => LifecycleError::Request {
                kind,
                id,
                action,
                source,
            },
        }
    }

    async fn fetch(
        &self,
        step: DeleteStep,
        last: Option<&Status>,
    ) -> Result<Progress, LifecycleError> {
        let kind = self.ops.policy().kind;
        let id = self.id.to_owned();
        match self.ops.fetch_status(self.id, self.cancel).await {
            Ok(Status::Deleted) => Ok(Progress::Gone),
            Ok(status) => Ok(Progress::Continue(status)),
            Err(err) if err.is_not_found() => Ok(Progress::Gone),
            Err(ClientError::Cancelled) => {
                Err(self.fail(step, last, LifecycleError::Cancelled { kind, id }))
            }
            Err(source) => Err(self.fail(step, last, LifecycleError::Fetch { kind, id, source })),
        }
    }

    async fn wait(
        &self,
        target: Status,
        step: DeleteStep,
        last: &Status,
    ) -> Result<Progress, LifecycleError> {
        self.wait_within(target, step, last, self.remaining()).await
    }

    async fn wait_within(
        &self,
        target: Status,
        step: DeleteStep,
        last: &Status,
        budget: Duration,
    ) -> Result<Progress, LifecycleError> {
        let wait = WaitFor::new(self.id, target, budget);
        match wait_for_status(self.ops, &wait, self.cancel).await {
            Ok(Status::Deleted) => Ok(Progress::Gone),
            Ok(status) => Ok(Progress::Continue(status)),
            Err(err) if err.is_not_found() => Ok(Progress::Gone),
            Err(err) => Err(self.fail(step, Some(last), err)),
        }
    }

    /// Waits for a provisioning resource to become stable. When the wait
    /// times out or hits an error state the status is fetched again, and
    /// only `error` or `stopped` allow the teardown to go on.
    ///
    /// The settle wait gets at most half of the remaining budget so the
    /// delete and disappearance steps can still run after it gives up.
    async fn settle(&self, status: &Status) -> Result<Progress, LifecycleError> {
        let target = self.ops.policy().ready_status.clone();
        let budget = self.remaining().checked_div(2).unwrap_or_default();
        match self
            .wait_within(target, DeleteStep::Settle, status, budget)
            .await
        {
            Ok(progress) => Ok(progress),
            Err(LifecycleError::DeleteFailed { source, .. })
                if matches!(
                    *source,
                    LifecycleError::Timeout { .. } | LifecycleError::EnteredErrorState { .. }
                ) =>
            {
                match self.fetch(DeleteStep::Settle, Some(status)).await? {
                    Progress::Gone => Ok(Progress::Gone),
                    Progress::Continue(current @ (Status::Error | Status::Stopped)) => {
                        Ok(Progress::Continue(current))
                    }
                    Progress::Continue(current) => {
                        let unstable = LifecycleError::Unstable {
                            kind: self.ops.policy().kind,
                            id: self.id.to_owned(),
                            status: current,
                        };
                        Err(self.fail(DeleteStep::Settle, None, unstable))
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Stops the resource unless it is already on its way down, then waits
    /// for `stopped`.
    async fn stop(&self, status: &Status) -> Result<Progress, LifecycleError> {
        if *status != Status::Stopping {
            tracing::info!(kind = %self.ops.policy().kind, id = self.id, %status, "stopping before delete");
            match self.ops.request_stop(self.id, self.cancel).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => return Ok(Progress::Gone),
                Err(err) => {
                    let rejected = self.rejected("stop", err);
                    return Err(self.fail(DeleteStep::Stop, Some(status), rejected));
                }
            }
        }
        self.wait(Status::Stopped, DeleteStep::AwaitStopped, status)
            .await
    }

    async fn issue_delete(&self, status: &Status) -> Result<Progress, LifecycleError> {
        tracing::info!(kind = %self.ops.policy().kind, id = self.id, %status, "issuing delete");
        match self.ops.request_delete(self.id, self.cancel).await {
            Ok(()) => Ok(Progress::Continue(Status::Deleting)),
            Err(err) if err.is_not_found() => Ok(Progress::Gone),
            Err(err) => {
                let rejected = self.rejected("delete", err);
                Err(self.fail(DeleteStep::Delete, Some(status), rejected))
            }
        }
    }

    async fn run(&self) -> Result<(), LifecycleError> {
        let policy = self.ops.policy();

        let Progress::Continue(mut status) = self.fetch(DeleteStep::Inspect, None).await? else {
            tracing::info!(kind = %policy.kind, id = self.id, "already deleted");
            return Ok(());
        };

        if status != Status::Deleting {
            if policy.requires_stop_before_delete {
                if status.is_settling() {
                    tracing::info!(kind = %policy.kind, id = self.id, %status, "waiting for resource to settle");
                    let Progress::Continue(settled) = self.settle(&status).await? else {
                        return Ok(());
                    };
                    status = settled;
                }

                if !matches!(status, Status::Stopped | Status::Error | Status::Failed) {
                    let Progress::Continue(stopped) = self.stop(&status).await? else {
                        return Ok(());
                    };
                    status = stopped;
                }
            }

            let Progress::Continue(deleting) = self.issue_delete(&status).await? else {
                return Ok(());
            };
            status = deleting;
        }

        tracing::info!(kind = %policy.kind, id = self.id, "waiting for deletion");
        self.wait(Status::Deleted, DeleteStep::AwaitDeletion, &status)
            .await
            .map(drop)
    }
}

/// Tears a resource down and returns once it has disappeared.
///
/// Kinds whose policy requires it are first allowed to settle, then stopped
/// and awaited in the `stopped` status before the delete call is issued.
/// A resource that is already absent at any step counts as deleted, so the
/// operation is idempotent. `timeout` bounds the whole sequence.
///
/// # Errors
///
/// Returns [`LifecycleError::DeleteFailed`] naming the failing
/// [`DeleteStep`] and the last observed status. Nothing is rolled back; the
/// resource is left exactly as the failed step found it.
pub async fn delete_resource<L>(
    ops: &L,
    id: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), LifecycleError>
where
    L: Lifecycle + ?Sized,
{
    let teardown = Teardown {
        ops,
        id,
        deadline: Instant::now() + timeout,
        cancel,
    };
    teardown.run().await?;
    tracing::info!(kind = %ops.policy().kind, id, "deleted");
    Ok(())
}
