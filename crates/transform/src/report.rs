//! SAST XML 리포트 스트리밍 변환기
//!
//! 리포트 문서를 한 번만 앞으로 읽으면서 `CxXMLResults → Query → Result → Path → PathNode`
//! 중첩 구조를 평탄화합니다. 각 단계의 컨텍스트 프레임은 부모 프레임의 복사본에
//! 자신의 필드를 더한 것이며, `PathNode`가 닫힐 때마다 스캔 상세 레코드 하나를 만듭니다.
//!
//! # 문서 구조
//!
//! ```text
//! CxXMLResults (리포트 속성 → ScanDescriptor)
//!  └─ Query (QueryId, QueryName, ...)
//!      └─ Result (VulnerabilityId, ResultSeverity, ...)
//!          └─ Path (ResultId, PathId, SimilarityId)
//!              └─ PathNode → 레코드 1개
//!                  ├─ FileName, Line, Column, NodeId, Name, Type, Length
//!                  └─ Snippet
//!                      └─ Line
//!                          ├─ Number (무시)
//!                          └─ Code → NodeCodeSnippet
//! ```
//!
//! # 오류 처리
//!
//! XML 문법 오류와 닫히지 않은 `CxXMLResults`는 `TransformError::Format`입니다.
//! 열린 부모가 없는 요소(Query 밖의 Result 등)는 조용히 무시합니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use scanlytix_core::record::FlatRecord;

use crate::descriptor::ScanDescriptor;
use crate::emit::{format_date, scan_header};
use crate::error::TransformError;

/// 엔진이 쓰는 긴 날짜 형식 (`Sunday, March 22, 2020 10:05:22 PM`)
const LONG_DATE_FORMAT: &str = "%A, %B %d, %Y %I:%M:%S %p";

const NODE_LINE: &str = "NodeLine";
const NODE_COLUMN: &str = "NodeColumn";
const NODE_CODE_SNIPPET: &str = "NodeCodeSnippet";

/// 리포트 루트 요소 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootState {
    NotSeen,
    Open,
    Closed,
}

/// `PathNode` 안의 값 요소를 레코드 키로 변환합니다.
fn node_field(name: &[u8]) -> Option<&'static str> {
    match name {
        b"FileName" => Some("NodeFileName"),
        b"Line" => Some(NODE_LINE),
        b"Column" => Some(NODE_COLUMN),
        b"NodeId" => Some("NodeId"),
        b"Name" => Some("NodeName"),
        b"Type" => Some("NodeType"),
        b"Length" => Some("NodeLength"),
        b"Code" => Some(NODE_CODE_SNIPPET),
        _ => None,
    }
}

/// 리포트 생성 시각을 레코드 날짜 형식으로 정규화합니다.
///
/// RFC 3339 또는 엔진의 긴 형식이 아니면 원문을 그대로 반환합니다.
pub fn normalize_report_time(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return format_date(&parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw.trim(), LONG_DATE_FORMAT) {
        return format_date(&parsed.and_utc());
    }
    raw.to_owned()
}

/// SAST 리포트를 스캔 상세 레코드로 변환합니다.
///
/// 리포트 수준 속성과 심각도별 결과 수는 `descriptor`에 기록되며,
/// 상세 레코드는 문서 순서대로 반환됩니다.
///
/// # Errors
///
/// 문서 형식이 잘못되었으면 `TransformError::Format` 반환
pub fn transform_report(
    descriptor: &mut ScanDescriptor,
    report: &[u8],
) -> Result<Vec<FlatRecord>, TransformError> {
    let mut machine = ReportMachine::new(descriptor);
    machine.run(report)?;
    Ok(machine.records)
}

/// 변환 상태 기계
struct ReportMachine<'d> {
    descriptor: &'d mut ScanDescriptor,
    base: FlatRecord,
    query: Option<FlatRecord>,
    result: Option<FlatRecord>,
    result_severity: Option<String>,
    path: Option<FlatRecord>,
    node: Option<FlatRecord>,
    in_snippet: bool,
    field: Option<&'static str>,
    text: String,
    root: RootState,
    records: Vec<FlatRecord>,
}

impl<'d> ReportMachine<'d> {
    fn new(descriptor: &'d mut ScanDescriptor) -> Self {
        let base = scan_header(descriptor);
        Self {
            descriptor,
            base,
            query: None,
            result: None,
            result_severity: None,
            path: None,
            node: None,
            in_snippet: false,
            field: None,
            text: String::new(),
            root: RootState::NotSeen,
            records: Vec::new(),
        }
    }

    fn format_error(&self, reason: impl Into<String>) -> TransformError {
        TransformError::Format {
            scan_id: self.descriptor.scan_id.clone(),
            reason: reason.into(),
        }
    }

    fn run(&mut self, report: &[u8]) -> Result<(), TransformError> {
        let mut reader = Reader::from_reader(report);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => self.open(&e)?,
                Ok(Event::Empty(e)) => {
                    self.open(&e)?;
                    self.close(e.name().as_ref());
                }
                Ok(Event::End(e)) => self.close(e.name().as_ref()),
                Ok(Event::Text(t)) => {
                    if self.field.is_some() {
                        let text = t.unescape().map_err(|e| {
                            self.format_error(format!(
                                "invalid text at position {}: {e}",
                                reader.buffer_position()
                            ))
                        })?;
                        self.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if self.field.is_some() {
                        self.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(self.format_error(format!(
                        "xml error at position {}: {e}",
                        reader.error_position()
                    )));
                }
            }
            buf.clear();
        }

        match self.root {
            RootState::Closed => Ok(()),
            RootState::NotSeen => Err(self.format_error("missing CxXMLResults element")),
            RootState::Open => Err(self.format_error("CxXMLResults element is not closed")),
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), TransformError> {
        match e.name().as_ref() {
            b"CxXMLResults" => {
                debug!(scan_id = %self.descriptor.scan_id, "processing report attributes");
                let report = &mut self.descriptor.report;
                report.preset = attr(e, "Preset");
                report.initiator = attr(e, "InitiatorName");
                report.deep_link = attr(e, "DeepLink");
                report.scan_time = attr(e, "ScanTime");
                report.report_creation_time =
                    attr(e, "ReportCreationTime").map(|raw| normalize_report_time(&raw));
                report.scan_comments = attr(e, "ScanComments");
                report.source_origin = attr(e, "SourceOrigin");
                self.root = RootState::Open;
            }
            b"Query" => {
                let mut query = self.base.clone();
                query.insert_opt("QueryCategories", attr(e, "categories"));
                query.insert_opt("QueryId", attr(e, "id"));
                query.insert_opt("QueryCweId", attr(e, "cweId"));
                query.insert_opt("QueryName", attr(e, "name"));
                query.insert_opt("QueryGroup", attr(e, "group"));
                query.insert_opt("QuerySeverity", attr(e, "Severity"));
                query.insert_opt("QueryLanguage", attr(e, "Language"));
                query.insert_opt("QueryVersionCode", attr(e, "QueryVersionCode"));
                self.query = Some(query);
            }
            b"Result" => {
                if let Some(query) = &self.query {
                    let mut result = query.clone();
                    let severity = attr(e, "Severity");
                    result.insert_opt("VulnerabilityId", attr(e, "NodeId"));
                    result.insert_opt("SinkFileName", attr(e, "FileName"));
                    result.insert_opt("Status", attr(e, "Status"));
                    result.insert_opt("SinkLine", attr(e, "Line"));
                    result.insert_opt("SinkColumn", attr(e, "Column"));
                    result.insert_opt("FalsePositive", attr(e, "FalsePositive"));
                    result.insert_opt("ResultSeverity", severity.clone());
                    result.insert_opt("State", attr(e, "state"));
                    result.insert_opt("Remark", attr(e, "Remark"));
                    result.insert_opt("ResultDeepLink", attr(e, "DeepLink"));
                    self.result = Some(result);
                    self.result_severity = severity;
                }
            }
            b"Path" => {
                if let Some(result) = &self.result {
                    let mut path = result.clone();
                    path.insert_opt("ResultId", attr(e, "ResultId"));
                    path.insert_opt("PathId", attr(e, "PathId"));
                    path.insert_opt("SimilarityId", attr(e, "SimilarityId"));
                    self.path = Some(path);
                }
            }
            b"PathNode" => {
                if let Some(path) = &self.path {
                    self.node = Some(path.clone());
                    self.in_snippet = false;
                }
            }
            b"Snippet" => {
                if self.node.is_some() {
                    self.in_snippet = true;
                }
            }
            name => {
                if self.node.is_none() {
                    return Ok(());
                }
                if let Some(key) = node_field(name) {
                    if self.in_snippet && (key == NODE_LINE || key == NODE_COLUMN) {
                        return Ok(());
                    }
                    self.field = Some(key);
                    self.text.clear();
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if let Some(key) = self.field {
            if node_field(name) == Some(key) {
                if let Some(node) = self.node.as_mut() {
                    let text = std::mem::take(&mut self.text);
                    // 코드 조각은 들여쓰기까지 원문 그대로 보존
                    if key == NODE_CODE_SNIPPET {
                        node.insert(key, text);
                    } else {
                        node.insert(key, text.trim());
                    }
                }
                self.field = None;
                return;
            }
        }

        match name {
            b"CxXMLResults" => {
                if self.root == RootState::Open {
                    self.root = RootState::Closed;
                }
            }
            b"Query" => self.query = None,
            b"Result" => {
                if self.result.take().is_some() {
                    if let Some(severity) = self.result_severity.take() {
                        self.descriptor.increment_severity(severity);
                    }
                }
            }
            b"Path" => self.path = None,
            b"PathNode" => {
                if let Some(node) = self.node.take() {
                    self.records.push(node);
                }
                self.in_snippet = false;
                self.field = None;
            }
            b"Snippet" => self.in_snippet = false,
            _ => {}
        }
    }
}

/// 속성 값을 읽습니다. 속성이 없거나 읽을 수 없으면 `None`을 반환합니다.
fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::TimeZone;

    use crate::product::ScanProduct;
    use crate::resolver::project::Project;

    fn descriptor() -> ScanDescriptor {
        let project = Project {
            project_id: 7,
            project_name: "web".to_owned(),
            team_id: "t1".to_owned(),
            team_name: "/CxServer/SP".to_owned(),
            preset_id: 36,
            preset_name: "Checkmarx Default".to_owned(),
            policies: String::new(),
            last_scan_dates: BTreeMap::new(),
            scan_counts: BTreeMap::new(),
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        ScanDescriptor::new("1000001", "Full", ScanProduct::Sast, at, at, Arc::new(project))
    }

    const MINIMAL: &str = r#"<CxXMLResults Preset="Default">
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
</CxXMLResults>"#;

    #[test]
    fn minimal_report_yields_one_record() {
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, MINIMAL.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.get("ProjectId"), Some("7"));
        assert_eq!(record.get("ScanId"), Some("1000001"));
        assert_eq!(record.get("QueryName"), Some("SQL_Injection"));
        assert_eq!(record.get("VulnerabilityId"), Some("5"));
        assert_eq!(record.get("PathId"), Some("2"));
        assert_eq!(record.get("NodeFileName"), Some("a.java"));
        assert_eq!(record.get("NodeLine"), Some("10"));
        assert_eq!(descriptor.severity_counts.get("High"), Some(&1));
        assert_eq!(descriptor.report.preset.as_deref(), Some("Default"));
    }

    #[test]
    fn absent_attributes_are_omitted() {
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, MINIMAL.as_bytes()).unwrap();

        let record = &records[0];
        assert!(!record.contains_key("QueryCweId"));
        assert!(!record.contains_key("Remark"));
        assert!(!record.contains_key("SimilarityId"));
        assert!(record.iter().all(|(_, v)| !v.is_empty()));
        assert!(descriptor.report.initiator.is_none());
    }

    #[test]
    fn snippet_line_does_not_override_node_line() {
        let xml = r#"<CxXMLResults>
  <Query id="1"><Result Severity="Low"><Path>
    <PathNode>
      <Line>10</Line>
      <Column>4</Column>
      <Snippet><Line><Number>999</Number><Code>int x = 1;</Code></Line></Snippet>
    </PathNode>
  </Path></Result></Query>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();

        assert_eq!(records[0].get("NodeLine"), Some("10"));
        assert_eq!(records[0].get("NodeColumn"), Some("4"));
        assert_eq!(records[0].get("NodeCodeSnippet"), Some("int x = 1;"));
    }

    #[test]
    fn snippet_flag_resets_after_snippet_closes() {
        let xml = r#"<CxXMLResults>
  <Query><Result><Path>
    <PathNode>
      <Snippet><Line><Number>999</Number><Code>x</Code></Line></Snippet>
      <Line>12</Line>
    </PathNode>
  </Path></Result></Query>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();
        assert_eq!(records[0].get("NodeLine"), Some("12"));
    }

    #[test]
    fn severity_counts_sum_to_result_count() {
        let xml = r#"<CxXMLResults>
  <Query id="1">
    <Result Severity="High"/>
    <Result Severity="High"><Path><PathNode><Line>1</Line></PathNode></Path></Result>
    <Result Severity="Medium"/>
  </Query>
  <Query id="2">
    <Result Severity="Low"/>
  </Query>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let total: u64 = descriptor.severity_counts.values().sum();
        assert_eq!(total, 4);
        assert_eq!(descriptor.severity_counts["High"], 2);
    }

    #[test]
    fn records_follow_document_order() {
        let xml = r#"<CxXMLResults>
  <Query name="Q"><Result><Path>
    <PathNode><NodeId>1</NodeId></PathNode>
    <PathNode><NodeId>2</NodeId></PathNode>
    <PathNode><NodeId>3</NodeId></PathNode>
  </Path></Result></Query>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();
        let ids: Vec<&str> = records.iter().filter_map(|r| r.get("NodeId")).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn sibling_frames_do_not_leak() {
        let xml = r#"<CxXMLResults>
  <Query name="A"><Result Remark="first"><Path><PathNode/></Path></Result></Query>
  <Query name="B"><Result><Path><PathNode/></Path></Result></Query>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Remark"), Some("first"));
        assert_eq!(records[1].get("QueryName"), Some("B"));
        assert!(!records[1].contains_key("Remark"));
    }

    #[test]
    fn result_without_query_is_ignored() {
        let xml = r#"<CxXMLResults>
  <Result Severity="High"><Path><PathNode><Line>1</Line></PathNode></Path></Result>
</CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();
        assert!(records.is_empty());
        assert!(descriptor.severity_counts.is_empty());
    }

    #[test]
    fn unclosed_root_is_format_error() {
        let xml = r#"<CxXMLResults><Query id="1"></Query>"#;
        let mut descriptor = descriptor();
        let err = transform_report(&mut descriptor, xml.as_bytes()).unwrap_err();
        assert!(matches!(err, TransformError::Format { .. }));
    }

    #[test]
    fn missing_root_is_format_error() {
        let mut descriptor = descriptor();
        let err = transform_report(&mut descriptor, b"<Other/>").unwrap_err();
        assert!(matches!(err, TransformError::Format { .. }));
    }

    #[test]
    fn syntax_error_is_format_error() {
        let xml = r#"<CxXMLResults><Query></Result></CxXMLResults>"#;
        let mut descriptor = descriptor();
        let err = transform_report(&mut descriptor, xml.as_bytes()).unwrap_err();
        assert!(matches!(err, TransformError::Format { .. }));
    }

    #[test]
    fn cdata_code_is_captured() {
        let xml = r#"<CxXMLResults><Query><Result><Path><PathNode>
  <Snippet><Line><Code><![CDATA[a < b]]></Code></Line></Snippet>
</PathNode></Path></Result></Query></CxXMLResults>"#;
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();
        assert_eq!(records[0].get("NodeCodeSnippet"), Some("a < b"));
    }

    #[test]
    fn code_snippet_keeps_whitespace() {
        let xml = "<CxXMLResults><Query><Result><Path><PathNode>\n\
  <FileName>\n    a.java\n  </FileName>\n\
  <Line> 3 </Line>\n\
  <Snippet><Line><Number>3</Number><Code>        if (x) {  </Code></Line></Snippet>\n\
</PathNode><PathNode><Snippet><Line><Code>   </Code></Line></Snippet></PathNode>\
</Path></Result></Query></CxXMLResults>";
        let mut descriptor = descriptor();
        let records = transform_report(&mut descriptor, xml.as_bytes()).unwrap();

        assert_eq!(records[0].get("NodeCodeSnippet"), Some("        if (x) {  "));
        assert_eq!(records[0].get("NodeFileName"), Some("a.java"));
        assert_eq!(records[0].get("NodeLine"), Some("3"));
        assert_eq!(records[1].get("NodeCodeSnippet"), Some("   "));
    }

    #[test]
    fn normalizes_report_creation_time() {
        assert_eq!(
            normalize_report_time("Sunday, March 22, 2020 10:05:22 PM"),
            "2020-03-22T22:05:22.000+00:00"
        );
        assert_eq!(
            normalize_report_time("2020-03-22T22:05:22+02:00"),
            "2020-03-22T20:05:22.000+00:00"
        );
        assert_eq!(normalize_report_time("yesterday"), "yesterday");
    }
}
