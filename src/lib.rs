//! Reconciliation engine for an asynchronous cloud control plane.
//!
//! The control plane accepts create, update, and delete requests and answers
//! immediately with a transitional status; the work itself finishes later.
//! This crate turns that into calls that return once the operation is done:
//! [`ApiClient`] performs single authenticated exchanges, the
//! [`lifecycle`] module polls status and sequences teardown, and the
//! [`resources`] facades wire both together per resource kind.
//!
//! ```no_run
//! use settle::{ApiClient, ControlPlaneConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControlPlaneConfig::load_without_cli_args()?;
//! let client = ApiClient::new(&config)?;
//! let cancel = CancellationToken::new();
//! client.vps().delete("vps-123", &cancel).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod resources;
pub mod test_support;
pub mod types;

pub use client::{ApiClient, ApiError, ClientError};
pub use config::{ConfigError, ControlPlaneConfig};
pub use lifecycle::{
    DeleteStep, KindPolicy, Lifecycle, LifecycleError, Timeouts, WaitFor, delete_resource,
    wait_for_status,
};
pub use resources::{Observed, REGISTRY, ResourceError, ResourceHandle};
pub use types::{ResourceKind, Status};
