//! Shared fixtures for transform integration tests
//!
//! `FakeSource` is an in-memory `ScanDataSource` that counts every call and
//! can be told to fail or to trigger cancellation at specific points.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use scanlytix_transform::{
    Policy, PolicyViolationRule, Preset, ProjectRecord, SastScan, ScaScan, ScanDataSource, Team,
    TransformError,
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).unwrap()
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct Calls {
    pub total: AtomicUsize,
    pub policies: AtomicUsize,
    pub project_policy_ids: AtomicUsize,
    pub sast_scans: AtomicUsize,
    pub sca_scans: AtomicUsize,
    pub violations: AtomicUsize,
    pub reports: AtomicUsize,
    in_flight_reports: AtomicUsize,
    max_in_flight_reports: AtomicUsize,
    violations_by_project: Mutex<HashMap<u64, usize>>,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_reports(&self) -> usize {
        self.max_in_flight_reports.load(Ordering::SeqCst)
    }

    pub fn violations_for(&self, project_id: u64) -> usize {
        self.violations_by_project
            .lock()
            .unwrap()
            .get(&project_id)
            .copied()
            .unwrap_or(0)
    }
}

/// Instrumented in-memory data source
#[derive(Debug, Default)]
pub struct FakeSource {
    pub presets: Vec<Preset>,
    pub teams: Vec<Team>,
    pub projects: Vec<ProjectRecord>,
    /// `None` makes the policy call fail
    pub policies: Option<Vec<Policy>>,
    pub project_policies: HashMap<u64, Vec<u64>>,
    pub sast_scans: Vec<SastScan>,
    pub sca_scans: Vec<ScaScan>,
    pub violations: HashMap<u64, Vec<PolicyViolationRule>>,
    pub failing_violations: Vec<u64>,
    pub reports: HashMap<String, Vec<u8>>,
    pub violation_delay: Option<Duration>,
    pub report_delay: Option<Duration>,
    /// Cancelled when the first report is requested
    pub cancel_on_report: Option<CancellationToken>,
    pub calls: Calls,
}

impl FakeSource {
    /// One team, one preset, no projects
    pub fn base() -> Self {
        Self {
            presets: vec![Preset {
                preset_id: 36,
                preset_name: "Checkmarx Default".to_owned(),
            }],
            teams: vec![Team {
                team_id: "t1".to_owned(),
                team_name: "/CxServer/SP/Company".to_owned(),
            }],
            policies: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project_id: u64, name: &str) -> Self {
        self.projects.push(ProjectRecord {
            project_id,
            project_name: name.to_owned(),
            team_id: "t1".to_owned(),
            preset_id: 36,
        });
        self
    }

    pub fn with_policy(mut self, policy_id: u64, name: &str) -> Self {
        self.policies.get_or_insert_with(Vec::new).push(Policy {
            policy_id,
            name: name.to_owned(),
            description: None,
        });
        self
    }

    pub fn with_project_policies(mut self, project_id: u64, ids: &[u64]) -> Self {
        self.project_policies.insert(project_id, ids.to_vec());
        self
    }

    pub fn with_sast_scan(mut self, project_id: u64, scan_id: &str, finish: DateTime<Utc>) -> Self {
        self.sast_scans.push(sast_scan(project_id, scan_id, finish));
        self
    }

    pub fn with_sca_scan(mut self, project_id: u64, scan_id: &str, finish: DateTime<Utc>) -> Self {
        self.sca_scans.push(ScaScan {
            project_id,
            scan_id: scan_id.to_owned(),
            finish_time: finish,
        });
        self
    }

    pub fn with_report(mut self, scan_id: &str, report: impl Into<Vec<u8>>) -> Self {
        self.reports.insert(scan_id.to_owned(), report.into());
        self
    }

    pub fn with_violation(mut self, project_id: u64, rule: PolicyViolationRule) -> Self {
        self.violations.entry(project_id).or_default().push(rule);
        self
    }

    fn count(&self, counter: &AtomicUsize) {
        self.calls.total.fetch_add(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn sast_scan(project_id: u64, scan_id: &str, finish: DateTime<Utc>) -> SastScan {
    SastScan {
        project_id,
        scan_id: scan_id.to_owned(),
        scan_type: "Full".to_owned(),
        start_time: finish - chrono::Duration::minutes(20),
        finish_time: finish,
        scan_risk: 42,
        scan_risk_severity: 60,
        lines_of_code: 1200,
        failed_lines_of_code: 0,
        file_count: 30,
        engine_version: "9.3.0.1139".to_owned(),
        languages: vec!["Java".to_owned()],
    }
}

pub fn violation(policy_id: u64, rule_id: u64, scan_id: &str) -> PolicyViolationRule {
    PolicyViolationRule {
        policy_id,
        rule_id,
        scan_id: scan_id.to_owned(),
        name: format!("rule-{rule_id}"),
        description: "No high severity findings".to_owned(),
        rule_type: "SAST".to_owned(),
        created_on: at(1, 0),
        first_detection_date: at(1, 12),
        violation_name: "SQL_Injection".to_owned(),
        violation_occurred: Some(at(1, 12)),
        violation_risk_score: None,
        violation_severity: "High".to_owned(),
        violation_source: None,
        violation_state: "Active".to_owned(),
        violation_status: "New".to_owned(),
        violation_type: None,
    }
}

/// Smallest valid report: one query, one result, one path node
pub const MINIMAL_REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<CxXMLResults Preset="Checkmarx Default" InitiatorName="admin" ScanId="1000001">
  <Query id="1" name="SQL_Injection" Severity="High">
    <Result NodeId="5" Severity="High">
      <Path ResultId="9" PathId="2">
        <PathNode>
          <FileName>a.java</FileName>
          <Line>10</Line>
        </PathNode>
      </Path>
    </Result>
  </Query>
</CxXMLResults>
"#;

impl ScanDataSource for FakeSource {
    async fn presets(&self, _cancel: &CancellationToken) -> Result<Vec<Preset>, TransformError> {
        self.calls.total.fetch_add(1, Ordering::SeqCst);
        Ok(self.presets.clone())
    }

    async fn teams(&self, _cancel: &CancellationToken) -> Result<Vec<Team>, TransformError> {
        self.calls.total.fetch_add(1, Ordering::SeqCst);
        Ok(self.teams.clone())
    }

    async fn projects(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ProjectRecord>, TransformError> {
        self.calls.total.fetch_add(1, Ordering::SeqCst);
        Ok(self.projects.clone())
    }

    async fn policies(&self, _cancel: &CancellationToken) -> Result<Vec<Policy>, TransformError> {
        self.count(&self.calls.policies);
        self.policies
            .clone()
            .ok_or_else(|| TransformError::remote("policies", "404 Not Found"))
    }

    async fn project_policy_ids(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u64>, TransformError> {
        self.count(&self.calls.project_policy_ids);
        Ok(self
            .project_policies
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn sast_scans(&self, _cancel: &CancellationToken) -> Result<Vec<SastScan>, TransformError> {
        self.count(&self.calls.sast_scans);
        Ok(self.sast_scans.clone())
    }

    async fn sca_scans(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ScaScan>, TransformError> {
        self.count(&self.calls.sca_scans);
        Ok(self
            .sca_scans
            .iter()
            .filter(|scan| scan.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn policy_violations(
        &self,
        project_id: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<PolicyViolationRule>, TransformError> {
        self.count(&self.calls.violations);
        *self
            .calls
            .violations_by_project
            .lock()
            .unwrap()
            .entry(project_id)
            .or_insert(0) += 1;

        if let Some(delay) = self.violation_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_violations.contains(&project_id) {
            return Err(TransformError::remote(
                "policy_violations",
                "503 Service Unavailable",
            ));
        }
        Ok(self
            .violations
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn sast_report(
        &self,
        scan_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<Bytes, TransformError> {
        self.count(&self.calls.reports);
        if let Some(token) = &self.cancel_on_report {
            token.cancel();
        }
        let in_flight = self.calls.in_flight_reports.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls
            .max_in_flight_reports
            .fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.report_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.in_flight_reports.fetch_sub(1, Ordering::SeqCst);
        self.reports
            .get(scan_id)
            .map(|report| Bytes::from(report.clone()))
            .ok_or_else(|| TransformError::remote("sast_report", format!("no report for {scan_id}")))
    }
}
