//! Scan data source abstraction.
//!
//! The [`ScanDataSource`] trait is the only way the engine reaches the
//! scanning service. Production code plugs in a transport-backed (or
//! snapshot-backed) implementation while tests use an instrumented fake.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Transformer    │
//! └────────┬─────────┘
//!          │ cancellable()
//!          ▼
//!   ┌───────────────┐
//!   │ScanDataSource │ (trait)
//!   └───────────────┘
//!        │      │
//!        ▼      ▼
//!   ┌────────┐ ┌────┐
//!   │Snapshot│ │Fake│
//!   └────────┘ └────┘
//! ```
//!
//! # Cancellation
//!
//! Every method receives the sweep's [`CancellationToken`]. The engine never
//! calls a method once the token is cancelled, and races every in-flight call
//! against the token through [`cancellable`].

use std::future::Future;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::TransformError;
use crate::types::{
    Policy, PolicyViolationRule, Preset, ProjectRecord, SastScan, ScaScan, Team,
};

/// Trait abstracting the remote scanning service.
///
/// All methods return plain in-memory collections. The trait is
/// `Send + Sync + 'static` so one instance can be shared by every worker.
///
/// # Error Handling
///
/// - Transport failures: `TransformError::RemoteFetch`
/// - Cancellation observed by the implementation: `TransformError::Cancelled`
pub trait ScanDataSource: Send + Sync + 'static {
    /// Lists all presets.
    fn presets(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Preset>, TransformError>> + Send;

    /// Lists all teams.
    fn teams(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Team>, TransformError>> + Send;

    /// Lists all projects.
    fn projects(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<ProjectRecord>, TransformError>> + Send;

    /// Lists all governance policies.
    ///
    /// Deployments without the policy layer fail this call; the engine then
    /// runs without policy data.
    fn policies(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Policy>, TransformError>> + Send;

    /// Returns the ids of the policies assigned to a project, in assignment order.
    fn project_policy_ids(
        &self,
        project_id: u64,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u64>, TransformError>> + Send;

    /// Lists finished static-analysis scans across all projects.
    fn sast_scans(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<SastScan>, TransformError>> + Send;

    /// Lists finished composition scans of one project.
    fn sca_scans(
        &self,
        project_id: u64,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<ScaScan>, TransformError>> + Send;

    /// Lists the policy rule violations recorded for a project.
    fn policy_violations(
        &self,
        project_id: u64,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<PolicyViolationRule>, TransformError>> + Send;

    /// Downloads the XML report of a static-analysis scan.
    fn sast_report(
        &self,
        scan_id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Bytes, TransformError>> + Send;
}

/// Issues a remote call unless cancelled, and aborts it when the token fires.
///
/// The call is not even constructed when the token is already cancelled, so
/// no request leaves the process after the signal.
pub async fn cancellable<T, F>(
    cancel: &CancellationToken,
    call: impl FnOnce() -> F,
) -> Result<T, TransformError>
where
    F: Future<Output = Result<T, TransformError>>,
{
    if cancel.is_cancelled() {
        return Err(TransformError::Cancelled);
    }

    let fut = call();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransformError::Cancelled),
        result = fut => result,
    }
}
