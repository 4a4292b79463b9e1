//! Snapshot directory data source.
//!
//! [`SnapshotSource`] implements [`ScanDataSource`] over a directory exported
//! from the scan service. Every call reads its file fresh, so a new export
//! is picked up by the next sweep without restarting the daemon.
//!
//! # Layout
//!
//! ```text
//! <snapshot_dir>/
//!   presets.json            [Preset]
//!   teams.json              [Team]
//!   projects.json           [ProjectRecord]
//!   policies.json           [Policy]          (optional, policy layer)
//!   project_policies.json   {"<project_id>": [policy_id, ...]}
//!   sast_scans.json         [SastScan]
//!   sca_scans.json          [ScaScan]         (optional)
//!   violations/<project_id>.json   [PolicyViolationRule]
//!   reports/<scan_id>.xml   raw SAST report
//! ```
//!
//! A missing `policies.json` is reported as a fetch failure, which the
//! sweep treats as "policy layer unavailable".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use scanlytix_transform::{
    Policy, PolicyViolationRule, Preset, ProjectRecord, SastScan, ScaScan, ScanDataSource, Team,
    TransformError,
};

/// Maximum accepted scan ID length.
const MAX_SCAN_ID_LEN: usize = 64;

/// Reject scan IDs that could escape the reports directory.
fn validate_scan_id(scan_id: &str) -> Result<(), TransformError> {
    if scan_id.is_empty() || scan_id.len() > MAX_SCAN_ID_LEN {
        return Err(TransformError::remote(
            "sast_report",
            format!(
                "invalid scan ID: length {} (must be 1-{MAX_SCAN_ID_LEN})",
                scan_id.len()
            ),
        ));
    }
    if !scan_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TransformError::remote(
            "sast_report",
            "invalid scan ID: contains characters outside [A-Za-z0-9_-]",
        ));
    }
    Ok(())
}

/// Data source backed by an exported snapshot directory.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    root: PathBuf,
}

impl SnapshotSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Snapshot directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, operation: &str, relative: &Path) -> Result<Vec<u8>, TransformError> {
        let path = self.root.join(relative);
        debug!(operation, path = %path.display(), "reading snapshot file");
        tokio::fs::read(&path)
            .await
            .map_err(|e| TransformError::remote(operation, format!("{}: {e}", path.display())))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        file_name: &str,
    ) -> Result<T, TransformError> {
        let content = self.read(operation, Path::new(file_name)).await?;
        serde_json::from_slice(&content)
            .map_err(|e| TransformError::remote(operation, format!("{file_name}: {e}")))
    }

    /// Read a list file, treating a missing file as an empty list.
    async fn read_optional_list<T: DeserializeOwned>(
        &self,
        operation: &str,
        relative: &Path,
    ) -> Result<Vec<T>, TransformError> {
        match tokio::fs::try_exists(self.root.join(relative)).await {
            Ok(true) => {
                let content = self.read(operation, relative).await?;
                serde_json::from_slice(&content).map_err(|e| {
                    TransformError::remote(operation, format!("{}: {e}", relative.display()))
                })
            }
            Ok(false) => Ok(Vec::new()),
            Err(e) => Err(TransformError::remote(operation, e)),
        }
    }
}

impl ScanDataSource for SnapshotSource {
    async fn presets(&self, _cancel: &CancellationToken) -> Result<Vec<Preset>, TransformError> {
        self.read_json("presets", "presets.json").await
    }

    async fn teams(&self, _cancel: &CancellationToken) -> Result<Vec<Team>, TransformError> {
        self.read_json("teams", "teams.json").await
    }

    async fn projects(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ProjectRecord>, TransformError> {
        self.read_json("projects", "projects.json").await
    }

    async fn policies(&self, _cancel: &CancellationToken) -> Result<Vec<Policy>, TransformError> {
        self.read_json("policies", "policies.json").await
    }

    async fn project_policy_ids(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u64>, TransformError> {
        let mut assignments: HashMap<u64, Vec<u64>> =
            match tokio::fs::try_exists(self.root.join("project_policies.json")).await {
                Ok(true) => {
                    self.read_json("project_policy_ids", "project_policies.json")
                        .await?
                }
                Ok(false) => HashMap::new(),
                Err(e) => return Err(TransformError::remote("project_policy_ids", e)),
            };
        Ok(assignments.remove(&project_id).unwrap_or_default())
    }

    async fn sast_scans(&self, _cancel: &CancellationToken) -> Result<Vec<SastScan>, TransformError> {
        self.read_json("sast_scans", "sast_scans.json").await
    }

    async fn sca_scans(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ScaScan>, TransformError> {
        let scans: Vec<ScaScan> = self
            .read_optional_list("sca_scans", Path::new("sca_scans.json"))
            .await?;
        Ok(scans
            .into_iter()
            .filter(|scan| scan.project_id == project_id)
            .collect())
    }

    async fn policy_violations(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<PolicyViolationRule>, TransformError> {
        let relative = Path::new("violations").join(format!("{project_id}.json"));
        self.read_optional_list("policy_violations", &relative)
            .await
    }

    async fn sast_report(
        &self,
        scan_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<Bytes, TransformError> {
        validate_scan_id(scan_id)?;
        let relative = Path::new("reports").join(format!("{scan_id}.xml"));
        self.read("sast_report", &relative).await.map(Bytes::from)
    }
}
