//! Snapshot directory builder shared by daemon integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

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

/// Temporary snapshot directory with one team, one preset and one project.
pub struct Snapshot {
    pub dir: TempDir,
}

impl Snapshot {
    pub fn new() -> Self {
        let snapshot = Self {
            dir: TempDir::new().expect("should create temp dir"),
        };
        snapshot.write_json(
            "presets.json",
            &json!([{ "preset_id": 36, "preset_name": "Checkmarx Default" }]),
        );
        snapshot.write_json(
            "teams.json",
            &json!([{ "team_id": "t1", "team_name": "/CxServer/SP/Company" }]),
        );
        snapshot.write_json(
            "projects.json",
            &json!([{ "project_id": 7, "project_name": "web", "team_id": "t1", "preset_id": 36 }]),
        );
        snapshot.write_json(
            "policies.json",
            &json!([{ "policy_id": 3, "name": "Gate" }]),
        );
        snapshot.write_json("project_policies.json", &json!({ "7": [3] }));
        snapshot.write_json(
            "sast_scans.json",
            &json!([{
                "project_id": 7,
                "scan_id": "1000001",
                "scan_type": "Full",
                "start_time": "2024-03-01T00:00:00Z",
                "finish_time": "2024-03-01T00:20:00Z",
                "lines_of_code": 1200,
                "languages": ["Java"]
            }]),
        );
        snapshot.write_file("reports/1000001.xml", MINIMAL_REPORT);
        snapshot
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn write_json(&self, name: &str, value: &serde_json::Value) {
        self.write_file(name, &value.to_string());
    }

    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("should create snapshot subdir");
        }
        fs::write(path, content).expect("should write snapshot file");
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.dir.path().join(name)).expect("should remove snapshot file");
    }
}
