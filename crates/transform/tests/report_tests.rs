//! Integration tests for the streaming SAST report transformer
//!
//! Runs full engine reports through `transform_report` and checks context
//! inheritance, snippet handling and severity aggregation.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{MINIMAL_REPORT, at, fixture_bytes};
use scanlytix_transform::{Project, ScanDescriptor, ScanProduct, TransformError, transform_report};

fn descriptor(scan_id: &str) -> ScanDescriptor {
    let project = Project {
        project_id: 7,
        project_name: "web".to_owned(),
        team_id: "t1".to_owned(),
        team_name: "/CxServer/SP/Company".to_owned(),
        preset_id: 36,
        preset_name: "Checkmarx Default".to_owned(),
        policies: String::new(),
        last_scan_dates: BTreeMap::new(),
        scan_counts: BTreeMap::new(),
    };
    ScanDescriptor::new(
        scan_id,
        "Full",
        ScanProduct::Sast,
        at(22, 22),
        at(23, 0),
        Arc::new(project),
    )
}

/// Minimal report: one detail record with all inherited keys
#[test]
fn test_minimal_report_inherits_context() {
    let mut descriptor = descriptor("1000001");
    let records = transform_report(&mut descriptor, MINIMAL_REPORT.as_bytes()).unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    for key in [
        "ProjectId",
        "ProjectName",
        "TeamName",
        "ScanId",
        "ScanProduct",
        "ScanType",
        "QueryId",
        "QueryName",
        "QuerySeverity",
        "VulnerabilityId",
        "ResultSeverity",
        "ResultId",
        "PathId",
        "NodeFileName",
        "NodeLine",
    ] {
        assert!(record.contains_key(key), "missing {key}");
    }
    assert_eq!(record.get("NodeLine"), Some("10"));
    assert_eq!(record.get("TeamName"), Some("/CxServer/SP/Company"));
    assert_eq!(descriptor.severity_counts.get("High"), Some(&1));
    assert_eq!(descriptor.report.initiator.as_deref(), Some("admin"));
}

/// Full engine report: one record per path node, in document order
#[test]
fn test_sample_report_records() {
    let mut descriptor = descriptor("1000042");
    let records = transform_report(&mut descriptor, &fixture_bytes("sample_report.xml")).unwrap();

    assert_eq!(records.len(), 4);

    let first = &records[0];
    assert_eq!(first.get("QueryName"), Some("SQL_Injection"));
    assert_eq!(first.get("QueryCweId"), Some("89"));
    assert_eq!(first.get("NodeLine"), Some("28"));
    assert_eq!(first.get("NodeColumn"), Some("35"));
    assert_eq!(first.get("NodeName"), Some("getParameter"));
    assert_eq!(
        first.get("NodeCodeSnippet"),
        Some(r#"String id = request.getParameter("id");"#)
    );
    assert_eq!(first.get("SinkLine"), Some("42"));
    assert_eq!(first.get("SimilarityId"), Some("-1863927710"));

    let second = &records[1];
    assert_eq!(second.get("NodeId"), Some("2"));
    assert_eq!(second.get("NodeLine"), Some("42"));

    let third = &records[2];
    assert_eq!(third.get("QueryName"), Some("Reflected_XSS_All_Clients"));
    assert_eq!(third.get("Remark"), Some("reviewed"));
    assert_eq!(
        third.get("NodeCodeSnippet"),
        Some(r#"out.println("<b>" + q + "</b>");"#)
    );

    let fourth = &records[3];
    assert_eq!(fourth.get("FalsePositive"), Some("True"));
    assert!(!fourth.contains_key("Remark"));
    assert!(!fourth.contains_key("NodeCodeSnippet"));
}

/// Report-level attributes land on the descriptor, not in detail records
#[test]
fn test_sample_report_metadata() {
    let mut descriptor = descriptor("1000042");
    let records = transform_report(&mut descriptor, &fixture_bytes("sample_report.xml")).unwrap();

    let report = &descriptor.report;
    assert_eq!(report.preset.as_deref(), Some("Checkmarx Default"));
    assert_eq!(report.initiator.as_deref(), Some("admin"));
    assert_eq!(report.scan_time.as_deref(), Some("00h:13m:55s"));
    assert_eq!(report.scan_comments.as_deref(), Some("nightly"));
    assert_eq!(report.source_origin.as_deref(), Some("LocalPath"));
    assert_eq!(
        report.report_creation_time.as_deref(),
        Some("2020-03-22T22:05:22.000+00:00")
    );
    assert!(
        report
            .deep_link
            .as_deref()
            .is_some_and(|link| link.contains("scanid=1000042&projectid=7"))
    );
    assert!(records.iter().all(|r| !r.contains_key("InitiatorName")));
}

/// Severity counts sum to the number of Result elements
#[test]
fn test_sample_report_severity_counts() {
    let mut descriptor = descriptor("1000042");
    transform_report(&mut descriptor, &fixture_bytes("sample_report.xml")).unwrap();

    let total: u64 = descriptor.severity_counts.values().sum();
    assert_eq!(total, 3);
    assert_eq!(descriptor.severity_counts.get("High"), Some(&1));
    assert_eq!(descriptor.severity_counts.get("Medium"), Some(&1));
    assert_eq!(descriptor.severity_counts.get("Low"), Some(&1));
}

/// Truncated document is a format error
#[test]
fn test_truncated_report_is_format_error() {
    let bytes = fixture_bytes("sample_report.xml");
    let truncated = &bytes[..bytes.len() / 2];

    let mut descriptor = descriptor("1000042");
    let err = transform_report(&mut descriptor, truncated).unwrap_err();
    match err {
        TransformError::Format { scan_id, .. } => assert_eq!(scan_id, "1000042"),
        other => panic!("expected format error, got {other:?}"),
    }
}

/// Empty input is a format error
#[test]
fn test_empty_report_is_format_error() {
    let mut descriptor = descriptor("1");
    assert!(matches!(
        transform_report(&mut descriptor, b""),
        Err(TransformError::Format { .. })
    ));
}
