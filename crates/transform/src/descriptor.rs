//! 스캔 디스크립터: 스윕에서 처리할 스캔 하나의 작업 단위

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::product::ScanProduct;
use crate::resolver::project::Project;

/// 디스크립터 처리 단계
///
/// `Pending → PolicyResolved → Dispatched → Emitted` 순서로만 진행합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanState {
    /// 해석 직후
    Pending,
    /// 정책 위반 집계 완료
    PolicyResolved,
    /// 제품별 처리 완료
    Dispatched,
    /// 레코드 출력 완료
    Emitted,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::PolicyResolved => write!(f, "policy_resolved"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Emitted => write!(f, "emitted"),
        }
    }
}

/// 리포트 변환 중 채워지는 리포트 수준 속성
///
/// 리포트에 속성이 없으면 `None`으로 남고 레코드에서도 생략됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMetadata {
    pub preset: Option<String>,
    pub initiator: Option<String>,
    pub deep_link: Option<String>,
    pub scan_time: Option<String>,
    pub report_creation_time: Option<String>,
    pub scan_comments: Option<String>,
    pub source_origin: Option<String>,
}

/// 스캔 하나의 정책 위반 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationCounts {
    /// 위반된 정책 수 (서로 다른 정책 ID)
    pub policies_violated: usize,
    /// 위반된 규칙 수 (서로 다른 규칙 ID)
    pub rules_violated: usize,
    /// 전체 위반 건수
    pub violations: usize,
}

/// 스캔 디스크립터
#[derive(Debug, Clone)]
pub struct ScanDescriptor {
    /// 스캔 ID
    pub scan_id: String,
    /// 스캔 종류
    pub scan_type: String,
    /// 스캔 제품 (디스패치 대상)
    pub product: ScanProduct,
    /// 스캔 완료 시각
    pub finish_time: DateTime<Utc>,
    /// 이번 스윕의 확인 시각
    pub check_time: DateTime<Utc>,
    /// 소유 프로젝트
    pub project: Arc<Project>,
    /// 리포트 수준 속성
    pub report: ReportMetadata,
    /// 심각도 레이블 → 결과 수
    pub severity_counts: BTreeMap<String, u64>,
    violations: Option<ViolationCounts>,
    state: ScanState,
}

impl ScanDescriptor {
    /// 새 디스크립터를 `Pending` 상태로 생성합니다.
    pub fn new(
        scan_id: impl Into<String>,
        scan_type: impl Into<String>,
        product: ScanProduct,
        finish_time: DateTime<Utc>,
        check_time: DateTime<Utc>,
        project: Arc<Project>,
    ) -> Self {
        Self {
            scan_id: scan_id.into(),
            scan_type: scan_type.into(),
            product,
            finish_time,
            check_time,
            project,
            report: ReportMetadata::default(),
            severity_counts: BTreeMap::new(),
            violations: None,
            state: ScanState::Pending,
        }
    }

    /// 현재 처리 단계를 반환합니다.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// 다음 처리 단계로 진행합니다.
    ///
    /// 역방향이나 같은 단계로의 이동은 무시합니다.
    pub fn advance(&mut self, next: ScanState) {
        if next > self.state {
            self.state = next;
        }
    }

    /// 심각도 레이블의 결과 수를 1 증가시킵니다.
    pub fn increment_severity(&mut self, label: impl Into<String>) {
        *self.severity_counts.entry(label.into()).or_insert(0) += 1;
    }

    /// 정책 위반 집계를 설정합니다. 이미 설정되었으면 무시합니다.
    pub fn set_violation_counts(&mut self, counts: ViolationCounts) {
        self.violations.get_or_insert(counts);
    }

    /// 정책 위반 집계를 반환합니다 (정책이 적용되지 않았으면 `None`).
    pub fn violation_counts(&self) -> Option<ViolationCounts> {
        self.violations
    }
}
