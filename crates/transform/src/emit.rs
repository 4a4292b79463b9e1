//! 레코드 생성과 출력
//!
//! 프로젝트 정보, 스캔 요약, 정책 위반 상세 레코드를 만들고
//! 스캔 단위 [`RecordBatch`]로 모아 성공한 스캔만 싱크로 내보냅니다.
//! 스캔 상세 레코드는 [`report`](crate::report) 모듈이 만듭니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::warn;

use scanlytix_core::config::RecordNames;
use scanlytix_core::metrics as m;
use scanlytix_core::record::{
    FlatRecord, KEY_ENGINE_VERSION, KEY_FAILED_LINES_OF_CODE, KEY_FILE_COUNT, KEY_LANGUAGES,
    KEY_LINES_OF_CODE, KEY_PRESET, KEY_PROJECT_ID, KEY_PROJECT_NAME, KEY_SCAN_FINISHED,
    KEY_SCAN_ID, KEY_SCAN_PRODUCT, KEY_SCAN_RISK, KEY_SCAN_RISK_SEVERITY, KEY_SCAN_START,
    KEY_SCAN_TYPE, KEY_TEAM_NAME,
};
use scanlytix_core::sink::{RecordSink, SinkFactory};

use crate::descriptor::ScanDescriptor;
use crate::resolver::project::Project;
use crate::types::{PolicyViolationRule, SastScan};

const KEY_POLICIES_VIOLATED: &str = "PoliciesViolated";
const KEY_RULES_VIOLATED: &str = "RulesViolated";
const KEY_POLICY_VIOLATIONS: &str = "PolicyViolations";
const VIOLATION_COUNT_KEYS: [&str; 3] =
    [KEY_POLICIES_VIOLATED, KEY_RULES_VIOLATED, KEY_POLICY_VIOLATIONS];

/// 레코드 날짜 형식 (밀리초, 오프셋 포함)
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// 날짜를 레코드 형식 문자열로 변환합니다.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// 레코드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// 프로젝트 정보
    ProjectInfo,
    /// SAST 스캔 요약
    ScanSummary,
    /// SAST 스캔 상세 (경로 노드 단위)
    ScanDetail,
    /// 정책 위반 상세
    PolicyViolation,
}

/// 레코드 종류별 싱크 묶음
#[derive(Clone)]
pub struct Sinks {
    names: RecordNames,
    project_info: Arc<dyn RecordSink>,
    scan_summary: Arc<dyn RecordSink>,
    scan_detail: Arc<dyn RecordSink>,
    policy_violations: Arc<dyn RecordSink>,
}

impl Sinks {
    /// 팩토리로 레코드 종류별 싱크를 생성합니다.
    pub fn from_factory(factory: &dyn SinkFactory, names: &RecordNames) -> Self {
        Self {
            names: names.clone(),
            project_info: factory.create(&names.project_info),
            scan_summary: factory.create(&names.sast_scan_summary),
            scan_detail: factory.create(&names.sast_scan_detail),
            policy_violations: factory.create(&names.policy_violations),
        }
    }

    /// 레코드 종류의 출력 이름을 반환합니다.
    pub fn name(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::ProjectInfo => &self.names.project_info,
            RecordKind::ScanSummary => &self.names.sast_scan_summary,
            RecordKind::ScanDetail => &self.names.sast_scan_detail,
            RecordKind::PolicyViolation => &self.names.policy_violations,
        }
    }

    /// 레코드 하나를 종류에 맞는 싱크로 출력합니다.
    pub fn write(&self, kind: RecordKind, record: FlatRecord) {
        let sink = match kind {
            RecordKind::ProjectInfo => &self.project_info,
            RecordKind::ScanSummary => &self.scan_summary,
            RecordKind::ScanDetail => &self.scan_detail,
            RecordKind::PolicyViolation => &self.policy_violations,
        };
        sink.write(record);
        counter!(m::RECORDS_EMITTED_TOTAL, m::LABEL_RECORD_TYPE => self.name(kind).to_owned())
            .increment(1);
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks").field("names", &self.names).finish()
    }
}

/// 스캔 하나의 출력 대기 레코드
///
/// 스캔 처리가 끝까지 성공했을 때만 [`flush`](Self::flush)로 내보냅니다.
#[derive(Debug, Default)]
pub struct RecordBatch {
    records: Vec<(RecordKind, FlatRecord)>,
}

impl RecordBatch {
    /// 빈 배치를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드를 추가합니다.
    pub fn push(&mut self, kind: RecordKind, record: FlatRecord) {
        self.records.push((kind, record));
    }

    /// 같은 종류의 레코드를 순서대로 추가합니다.
    pub fn extend(&mut self, kind: RecordKind, records: impl IntoIterator<Item = FlatRecord>) {
        self.records
            .extend(records.into_iter().map(|record| (kind, record)));
    }

    /// 대기 중인 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 대기 중인 레코드가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 종류별 레코드 수를 반환합니다.
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|(k, _)| *k == kind).count()
    }

    /// 모든 레코드를 추가된 순서대로 싱크에 쓰고, 쓴 레코드 수를 반환합니다.
    pub fn flush(self, sinks: &Sinks) -> usize {
        let written = self.records.len();
        for (kind, record) in self.records {
            sinks.write(kind, record);
        }
        written
    }
}

/// 모든 레코드가 공유하는 기본 키 (`ProjectId`, `ProjectName`, `TeamName`)
pub fn primary_key(project: &Project) -> FlatRecord {
    let mut record = FlatRecord::new();
    record.insert(KEY_PROJECT_ID, project.project_id.to_string());
    record.insert(KEY_PROJECT_NAME, project.project_name.as_str());
    record.insert(KEY_TEAM_NAME, project.team_name.as_str());
    record
}

/// 스캔 단위 레코드의 공통 헤더 (기본 키 + `ScanId`, `ScanProduct`, `ScanType`)
pub fn scan_header(descriptor: &ScanDescriptor) -> FlatRecord {
    let mut record = primary_key(&descriptor.project);
    record.insert(KEY_SCAN_ID, descriptor.scan_id.as_str());
    record.insert(KEY_SCAN_PRODUCT, descriptor.product.as_str());
    record.insert(KEY_SCAN_TYPE, descriptor.scan_type.as_str());
    record
}

/// 프로젝트 정보 레코드를 생성합니다.
pub fn project_info_record(project: &Project) -> FlatRecord {
    let mut record = primary_key(project);
    record.insert(KEY_PRESET, project.preset_name.as_str());
    record.insert("Policies", project.policies.as_str());

    for (product, latest) in &project.last_scan_dates {
        record.insert(format!("{product}_LastScanDate"), format_date(latest));
    }
    for (product, count) in &project.scan_counts {
        record.insert(format!("{product}_Scans"), count.to_string());
    }
    record
}

/// SAST 스캔 요약 레코드를 생성합니다.
///
/// `scan`은 스캔 목록에서 가져온 지표이며, 없으면 지표 필드를 생략합니다.
pub fn scan_summary_record(descriptor: &ScanDescriptor, scan: Option<&SastScan>) -> FlatRecord {
    let mut record = scan_header(descriptor);
    record.insert(KEY_SCAN_FINISHED, format_date(&descriptor.finish_time));

    if let Some(scan) = scan {
        record.insert(KEY_SCAN_START, format_date(&scan.start_time));
        record.insert(KEY_SCAN_RISK, scan.scan_risk.to_string());
        record.insert(KEY_SCAN_RISK_SEVERITY, scan.scan_risk_severity.to_string());
        record.insert(KEY_LINES_OF_CODE, scan.lines_of_code.to_string());
        record.insert(KEY_FAILED_LINES_OF_CODE, scan.failed_lines_of_code.to_string());
        record.insert(KEY_FILE_COUNT, scan.file_count.to_string());
        record.insert(KEY_ENGINE_VERSION, scan.engine_version.as_str());
        record.insert(KEY_LANGUAGES, scan.languages.join(";"));
    }

    let report = &descriptor.report;
    record.insert_opt(KEY_PRESET, report.preset.clone());
    record.insert_opt("Initiator", report.initiator.clone());
    record.insert_opt("DeepLink", report.deep_link.clone());
    record.insert_opt("ScanTime", report.scan_time.clone());
    record.insert_opt("ReportCreationTime", report.report_creation_time.clone());
    record.insert_opt("ScanComments", report.scan_comments.clone());
    record.insert_opt("SourceOrigin", report.source_origin.clone());

    if let Some(counts) = descriptor.violation_counts() {
        record.insert(KEY_POLICIES_VIOLATED, counts.policies_violated.to_string());
        record.insert(KEY_RULES_VIOLATED, counts.rules_violated.to_string());
        record.insert(KEY_POLICY_VIOLATIONS, counts.violations.to_string());
    }

    // 심각도 라벨은 리포트에서 오므로 기존 키를 덮어쓰지 않음
    for (severity, count) in &descriptor.severity_counts {
        if record.contains_key(severity) || VIOLATION_COUNT_KEYS.contains(&severity.as_str()) {
            warn!(
                scan_id = %descriptor.scan_id,
                severity = %severity,
                "severity label collides with a summary field, count dropped"
            );
            continue;
        }
        record.insert(severity.as_str(), count.to_string());
    }

    record
}

/// 정책 위반 상세 레코드를 생성합니다.
pub fn policy_violation_record(
    header: &FlatRecord,
    rule: &PolicyViolationRule,
    policy_name: &str,
) -> FlatRecord {
    let mut record = header.clone();
    record.insert("PolicyId", rule.policy_id.to_string());
    record.insert("PolicyName", policy_name);
    record.insert("RuleId", rule.rule_id.to_string());
    record.insert("RuleName", rule.name.as_str());
    record.insert("RuleDescription", rule.description.as_str());
    record.insert("RuleType", rule.rule_type.as_str());
    record.insert("RuleCreateDate", format_date(&rule.created_on));
    record.insert(
        "FirstViolationDetectionDate",
        format_date(&rule.first_detection_date),
    );
    record.insert("ViolationName", rule.violation_name.as_str());
    record.insert_opt(
        "ViolationOccurredDate",
        rule.violation_occurred.as_ref().map(format_date),
    );
    record.insert_opt(
        "ViolationRiskScore",
        rule.violation_risk_score.map(|score| score.to_string()),
    );
    record.insert("ViolationSeverity", rule.violation_severity.as_str());
    record.insert_opt("ViolationSource", rule.violation_source.clone());
    record.insert("ViolationState", rule.violation_state.as_str());
    record.insert("ViolationStatus", rule.violation_status.as_str());
    record.insert_opt("ViolationType", rule.violation_type.clone());
    record
}
