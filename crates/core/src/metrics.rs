//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않았으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scanlytix_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(scanlytix_core::metrics::RECORDS_EMITTED_TOTAL,
//!     scanlytix_core::metrics::LABEL_RECORD_TYPE => "RECORD_Project_Info")
//!     .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 레코드 종류 레이블 키
pub const LABEL_RECORD_TYPE: &str = "record_type";

/// 스캔 제품 레이블 키 (SAST, SCA)
pub const LABEL_PRODUCT: &str = "product";

/// 결과 레이블 키 (emitted, failed, cancelled)
pub const LABEL_RESULT: &str = "result";

// ─── Sweep 메트릭 ──────────────────────────────────────────────────

/// Sweep: 처리한 스캔 수 (counter, labels: product, result)
pub const SWEEP_SCANS_TOTAL: &str = "scanlytix_sweep_scans_total";

/// Sweep: 출력한 레코드 수 (counter, label: record_type)
pub const RECORDS_EMITTED_TOTAL: &str = "scanlytix_records_emitted_total";

/// Sweep: 정책 위반 조회 실패 수 (counter)
pub const POLICY_VIOLATION_FETCH_FAILURES_TOTAL: &str =
    "scanlytix_policy_violation_fetch_failures_total";

/// Sweep: 스윕 전체 소요 시간 (histogram, 초)
pub const SWEEP_DURATION_SECONDS: &str = "scanlytix_sweep_duration_seconds";

/// Report: SAST 리포트 변환 소요 시간 (histogram, 초)
pub const REPORT_TRANSFORM_DURATION_SECONDS: &str = "scanlytix_report_transform_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SWEEP_SCANS_TOTAL,
        "Scans processed by the sweep, by product and result"
    );
    describe_counter!(
        RECORDS_EMITTED_TOTAL,
        "Flattened records written to sinks, by record type"
    );
    describe_counter!(
        POLICY_VIOLATION_FETCH_FAILURES_TOTAL,
        "Projects whose policy violation lookup failed"
    );
    describe_histogram!(SWEEP_DURATION_SECONDS, "Duration of a full sweep in seconds");
    describe_histogram!(
        REPORT_TRANSFORM_DURATION_SECONDS,
        "Duration of a single SAST report transform in seconds"
    );
}
