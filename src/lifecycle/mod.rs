//! Reconciliation engine shared by every resource kind.
//!
//! The control plane acknowledges requests immediately and finishes the work
//! later. This module turns that into calls that return once the work is
//! done: [`wait_for_status`] polls a resource until it reaches a target
//! status, and [`delete_resource`] sequences a full teardown on top of it.
//! Both are written once and driven through the [`Lifecycle`] capability
//! trait, with per-kind differences captured by a [`KindPolicy`].

mod delete;
mod error;
mod policy;
mod wait;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::types::Status;

pub use delete::delete_resource;
pub use error::{DeleteStep, LifecycleError};
pub use policy::{KindPolicy, Timeouts};
pub use wait::{WaitFor, wait_for_status};

/// Future returned by [`Lifecycle`] operations.
pub type LifecycleFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Minimal set of control-plane calls the engine needs for one kind.
pub trait Lifecycle: Send + Sync {
    /// Rules for the kind this implementation manages.
    fn policy(&self) -> &KindPolicy;

    /// Fetches the current status of `id`. Absence must surface as an error
    /// whose [`ClientError::is_not_found`] returns `true`.
    fn fetch_status<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, Status>;

    /// Requests that `id` be powered off. Kinds that cannot be stopped keep
    /// the default, which reports [`ClientError::Unsupported`].
    fn request_stop<'a>(
        &'a self,
        _id: &'a str,
        _cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()> {
        let kind = self.policy().kind;
        Box::pin(async move {
            Err(ClientError::Unsupported {
                action: format!("stopping a {kind}"),
            })
        })
    }

    /// Requests deletion of `id`.
    fn request_delete<'a>(
        &'a self,
        id: &'a str,
        cancel: &'a CancellationToken,
    ) -> LifecycleFuture<'a, ()>;
}

#[cfg(test)]
mod tests;
