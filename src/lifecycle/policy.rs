//! Per-kind lifecycle rules: what "ready" means, which statuses are fatal,
//! how often to poll, and how long each operation may take.

use std::time::Duration;

use crate::types::{ResourceKind, Status};

const MINUTE: u64 = 60;

const ERROR_ONLY: &[Status] = &[Status::Error];
const ERROR_OR_FAILED: &[Status] = &[Status::Error, Status::Failed];

/// Upper bounds for the waits performed by each operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeouts {
    /// Wait for the ready status after a create call.
    pub create: Duration,
    /// Wait for the ready status after an update call, for kinds that wait.
    pub update: Duration,
    /// Whole teardown sequence, from inspection to disappearance.
    pub delete: Duration,
}

impl Timeouts {
    const fn minutes(create: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * MINUTE),
            update: Duration::from_secs(update * MINUTE),
            delete: Duration::from_secs(delete * MINUTE),
        }
    }
}

/// Lifecycle parameters shared by every operation on one resource kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KindPolicy {
    /// Kind these rules apply to.
    pub kind: ResourceKind,
    /// Status a freshly created resource settles in.
    pub ready_status: Status,
    /// Statuses after which the control plane will not recover on its own.
    pub terminal_errors: &'static [Status],
    /// Whether the backend refuses to delete a resource that is not stopped.
    pub requires_stop_before_delete: bool,
    /// Whether updates are followed by a wait for [`KindPolicy::ready_status`].
    ///
    /// Database and cache resizes are applied by an out-of-band deployment
    /// job that does not move the resource back through a transitional
    /// status, so waiting after those updates would only ever time out.
    pub waits_after_update: bool,
    /// Whether a failed wait for the ready status after create or update is
    /// logged and tolerated instead of returned.
    ///
    /// Container rollouts routinely outlast the wait while still converging.
    pub ready_wait_is_advisory: bool,
    /// Delay between two status fetches.
    pub poll_interval: Duration,
    /// Operation deadlines.
    pub timeouts: Timeouts,
}

impl KindPolicy {
    /// Default rules for `kind`.
    #[must_use]
    pub const fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Vps => Self::compute(kind, true, Timeouts::minutes(30, 30, 15)),
            ResourceKind::Database | ResourceKind::Cache => {
                Self::compute(kind, false, Timeouts::minutes(30, 30, 15))
            }
            ResourceKind::Serverless => Self {
                kind,
                ready_status: Status::Running,
                terminal_errors: ERROR_OR_FAILED,
                requires_stop_before_delete: false,
                waits_after_update: true,
                ready_wait_is_advisory: true,
                poll_interval: Duration::from_secs(10),
                timeouts: Timeouts::minutes(15, 15, 10),
            },
            ResourceKind::Bucket => Self {
                kind,
                ready_status: Status::Active,
                terminal_errors: ERROR_ONLY,
                requires_stop_before_delete: false,
                waits_after_update: false,
                ready_wait_is_advisory: false,
                poll_interval: Duration::from_secs(5),
                timeouts: Timeouts::minutes(10, 10, 10),
            },
            ResourceKind::VpsSnapshot
            | ResourceKind::CacheSnapshot
            | ResourceKind::DatabaseSnapshot => Self {
                kind,
                ready_status: Status::Completed,
                terminal_errors: ERROR_OR_FAILED,
                requires_stop_before_delete: false,
                waits_after_update: false,
                ready_wait_is_advisory: false,
                poll_interval: Duration::from_secs(5),
                timeouts: Timeouts::minutes(30, 30, 10),
            },
            // Keys are created and removed synchronously; nothing polls them.
            ResourceKind::SshKey | ResourceKind::AccessKey => Self {
                kind,
                ready_status: Status::Active,
                terminal_errors: ERROR_ONLY,
                requires_stop_before_delete: false,
                waits_after_update: false,
                ready_wait_is_advisory: false,
                poll_interval: Duration::from_secs(5),
                timeouts: Timeouts::minutes(1, 1, 1),
            },
        }
    }

    const fn compute(kind: ResourceKind, waits_after_update: bool, timeouts: Timeouts) -> Self {
        Self {
            kind,
            ready_status: Status::Running,
            terminal_errors: ERROR_ONLY,
            requires_stop_before_delete: true,
            waits_after_update,
            ready_wait_is_advisory: false,
            poll_interval: Duration::from_secs(10),
            timeouts,
        }
    }

    /// Returns `true` when `status` is fatal for this kind.
    #[must_use]
    pub fn is_terminal_error(&self, status: &Status) -> bool {
        self.terminal_errors.contains(status)
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the operation deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl ResourceKind {
    /// Default lifecycle rules for this kind.
    #[must_use]
    pub const fn policy(self) -> KindPolicy {
        KindPolicy::for_kind(self)
    }
}
