//! 평탄화 레코드: 싱크로 전달되는 키 정렬 행
//!
//! [`FlatRecord`]는 필드 이름에서 문자열 값으로의 정렬된 맵입니다.
//! 키는 레코드 안에서 유일하며, 직렬화 순서는 항상 키의 사전순입니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// --- 공통 키 상수 ---

/// 프로젝트 ID
pub const KEY_PROJECT_ID: &str = "ProjectId";
/// 프로젝트 이름
pub const KEY_PROJECT_NAME: &str = "ProjectName";
/// 팀 이름
pub const KEY_TEAM_NAME: &str = "TeamName";
/// 프리셋 이름
pub const KEY_PRESET: &str = "Preset";
/// 스캔 ID
pub const KEY_SCAN_ID: &str = "ScanId";
/// 스캔 제품 (SAST, SCA)
pub const KEY_SCAN_PRODUCT: &str = "ScanProduct";
/// 스캔 종류
pub const KEY_SCAN_TYPE: &str = "ScanType";
/// 스캔 완료 시각
pub const KEY_SCAN_FINISHED: &str = "ScanFinished";
/// 스캔 시작 시각
pub const KEY_SCAN_START: &str = "ScanStart";
/// 스캔 위험 점수
pub const KEY_SCAN_RISK: &str = "ScanRisk";
/// 스캔 위험 심각도
pub const KEY_SCAN_RISK_SEVERITY: &str = "ScanRiskSeverity";
/// 코드 라인 수
pub const KEY_LINES_OF_CODE: &str = "LinesOfCode";
/// 분석 실패 라인 수
pub const KEY_FAILED_LINES_OF_CODE: &str = "FailedLinesOfCode";
/// 파일 수
pub const KEY_FILE_COUNT: &str = "FileCount";
/// 엔진 버전
pub const KEY_ENGINE_VERSION: &str = "EngineVersion";
/// 언어 목록
pub const KEY_LANGUAGES: &str = "Languages";

/// 키 정렬된 평탄화 레코드
///
/// 키를 차례로 삽입하여 구성하며, 같은 키를 다시 삽입하면 값을 덮어씁니다.
/// JSON으로 직렬화하면 키 순서가 결정적인 객체가 됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: BTreeMap<String, String>,
}

impl FlatRecord {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 삽입합니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// 값이 있을 때만 필드를 삽입합니다.
    ///
    /// 값이 없는 필드는 빈 문자열로 기록하지 않고 생략합니다.
    pub fn insert_opt<V: Into<String>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// 필드가 존재하는지 확인합니다.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// 필드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 레코드가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 키 순서대로 필드를 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 키 목록을 사전순으로 반환합니다.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// JSON 객체 문자열로 직렬화합니다.
    pub fn to_json(&self) -> String {
        // BTreeMap<String, String> 직렬화는 실패하지 않음
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

impl fmt::Display for FlatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}
