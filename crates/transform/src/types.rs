//! 수집 레코드 타입: 외부 조회기가 반환하는 평범한 데이터
//!
//! [`ScanDataSource`](crate::source::ScanDataSource) 구현체는 이 타입들의 목록을 반환합니다.
//! 모든 타입은 스냅샷 파일에서 읽을 수 있도록 `Deserialize`를 구현합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 프리셋 (실행할 분석 규칙 묶음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// 프리셋 ID
    pub preset_id: u64,
    /// 프리셋 이름
    pub preset_name: String,
}

/// 팀
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// 팀 ID
    pub team_id: String,
    /// 팀 전체 이름
    pub team_name: String,
}

/// 프로젝트 원본 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 프로젝트 이름
    pub project_name: String,
    /// 소유 팀 ID
    pub team_id: String,
    /// 적용 프리셋 ID
    pub preset_id: u64,
}

/// 거버넌스 정책
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// 정책 ID
    pub policy_id: u64,
    /// 정책 이름
    pub name: String,
    /// 정책 설명
    #[serde(default)]
    pub description: Option<String>,
}

/// 완료된 SAST 스캔
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SastScan {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 스캔 ID
    pub scan_id: String,
    /// 스캔 종류 (Full, Incremental)
    pub scan_type: String,
    /// 스캔 시작 시각
    pub start_time: DateTime<Utc>,
    /// 스캔 완료 시각
    pub finish_time: DateTime<Utc>,
    /// 위험 점수
    #[serde(default)]
    pub scan_risk: u32,
    /// 위험 심각도 점수
    #[serde(default)]
    pub scan_risk_severity: u32,
    /// 코드 라인 수
    #[serde(default)]
    pub lines_of_code: u64,
    /// 분석 실패 라인 수
    #[serde(default)]
    pub failed_lines_of_code: u64,
    /// 파일 수
    #[serde(default)]
    pub file_count: u64,
    /// 엔진 버전
    #[serde(default)]
    pub engine_version: String,
    /// 감지된 언어 목록
    #[serde(default)]
    pub languages: Vec<String>,
}

/// 완료된 SCA 스캔
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaScan {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 스캔 ID
    pub scan_id: String,
    /// 스캔 완료 시각
    pub finish_time: DateTime<Utc>,
}

/// 위반된 정책 규칙
///
/// 선택 필드는 값이 없으면 `None`이며 기본값으로 채우지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyViolationRule {
    /// 정책 ID
    pub policy_id: u64,
    /// 규칙 ID
    pub rule_id: u64,
    /// 위반이 감지된 스캔 ID
    pub scan_id: String,
    /// 규칙 이름
    pub name: String,
    /// 규칙 설명
    pub description: String,
    /// 규칙 종류
    pub rule_type: String,
    /// 규칙 생성 시각
    pub created_on: DateTime<Utc>,
    /// 최초 위반 감지 시각
    pub first_detection_date: DateTime<Utc>,
    /// 위반 이름
    pub violation_name: String,
    /// 위반 발생 시각
    #[serde(default)]
    pub violation_occurred: Option<DateTime<Utc>>,
    /// 위반 위험 점수
    #[serde(default)]
    pub violation_risk_score: Option<f64>,
    /// 위반 심각도
    pub violation_severity: String,
    /// 위반 출처
    #[serde(default)]
    pub violation_source: Option<String>,
    /// 위반 상태 (state)
    pub violation_state: String,
    /// 위반 상태 (status)
    pub violation_status: String,
    /// 위반 종류
    #[serde(default)]
    pub violation_type: Option<String>,
}
