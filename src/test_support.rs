//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::client::{ApiError, ClientError};
use crate::lifecycle::{KindPolicy, Lifecycle, LifecycleFuture};
use crate::types::{ResourceKind, Status};

/// Call recorded by [`ScriptedLifecycle`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LifecycleCall {
    /// A status fetch.
    FetchStatus,
    /// A stop request.
    Stop,
    /// A delete request.
    Delete,
}

#[derive(Debug, Default)]
struct Script {
    statuses: VecDeque<Result<Status, ClientError>>,
    stops: VecDeque<Result<(), ClientError>>,
    deletes: VecDeque<Result<(), ClientError>>,
    calls: Vec<LifecycleCall>,
}

/// Scripted [`Lifecycle`] that answers from pre-seeded queues in FIFO order.
///
/// Once the status queue is drained, the last scripted status keeps being
/// returned, which models a resource stuck in one state. Stop and delete
/// calls succeed unless a failure was queued.
#[derive(Debug)]
pub struct ScriptedLifecycle {
    policy: KindPolicy,
    script: Mutex<Script>,
    sticky: Mutex<Option<Result<Status, ClientError>>>,
}

/// Builds the 404 error the control plane returns for an unknown id.
#[must_use]
pub fn not_found() -> ClientError {
    ClientError::Api(ApiError::from_response(
        404,
        r#"{"message":"Resource not found"}"#,
    ))
}

impl ScriptedLifecycle {
    /// Creates a double using the default rules for `kind`.
    #[must_use]
    pub fn new(kind: ResourceKind) -> Self {
        Self::with_policy(kind.policy())
    }

    /// Creates a double with explicit rules.
    #[must_use]
    pub const fn with_policy(policy: KindPolicy) -> Self {
        Self {
            policy,
            script: Mutex::new(Script {
                statuses: VecDeque::new(),
                stops: VecDeque::new(),
                deletes: VecDeque::new(),
                calls: Vec::new(),
            }),
            sticky: Mutex::new(None),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues statuses returned by successive fetches.
    #[must_use]
    pub fn statuses(self, statuses: &[&str]) -> Self {
        self.script()
            .statuses
            .extend(statuses.iter().map(|raw| Ok(Status::parse(raw))));
        self
    }

    /// Queues a "not found" answer for the next fetch.
    #[must_use]
    pub fn then_not_found(self) -> Self {
        self.script().statuses.push_back(Err(not_found()));
        self
    }

    /// Queues an arbitrary fetch failure.
    #[must_use]
    pub fn then_fetch_error(self, err: ClientError) -> Self {
        self.script().statuses.push_back(Err(err));
        self
    }

    /// Queues the outcome of the next stop call.
    #[must_use]
    pub fn stop_result(self, result: Result<(), ClientError>) -> Self {
        self.script().stops.push_back(result);
        self
    }

    /// Queues the outcome of the next delete call.
    #[must_use]
    pub fn delete_result(self, result: Result<(), ClientError>) -> Self {
        self.script().deletes.push_back(result);
        self
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LifecycleCall> {
        self.script().calls.clone()
    }

    /// Number of status fetches made so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|call| **call == LifecycleCall::FetchStatus)
            .count()
    }

    fn next_status(&self) -> Result<Status, ClientError> {
        let next = {
            let mut script = self.script();
            script.calls.push(LifecycleCall::FetchStatus);
            script.statuses.pop_front()
        };
        let mut sticky = self.sticky.lock().unwrap_or_else(PoisonError::into_inner);
        match next {
            Some(result) => {
                *sticky = Some(result.clone());
                result
            }
            None => sticky.clone().unwrap_or_else(|| Err(not_found())),
        }
    }
}

impl Lifecycle for ScriptedLifecycle {
    fn policy(&self) -> &KindPolicy {
        &self.policy
    }

    fn fetch_status<'a>(
        &'a self,
        _id: &'a str,
        _cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status> {
        let result = self.next_status();
        Box::pin(async move { result })
    }

    fn request_stop<'a>(
        &'a self,
        _id: &'a str,
        _cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        let result = {
            let mut script = self.script();
            script.calls.push(LifecycleCall::Stop);
            script.stops.pop_front().unwrap_or(Ok(()))
        };
        Box::pin(async move { result })
    }

    fn request_delete<'a>(
        &'a self,
        _id: &'a str,
        _cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        let result = {
            let mut script = self.script();
            script.calls.push(LifecycleCall::Delete);
            script.deletes.pop_front().unwrap_or(Ok(()))
        };
        Box::pin(async move { result })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard that holds [`ENV_LOCK`] and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets (`Some`) or removes (`None`) each variable while holding the lock.
    #[must_use]
    pub fn apply(pairs: &[(&str, Option<&str>)]) -> Self {
        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in self.previous.iter().rev() {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
