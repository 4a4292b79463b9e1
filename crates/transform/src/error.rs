//! 변환 엔진 에러 타입
//!
//! [`TransformError`]는 해석/스윕/리포트 변환 중 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<TransformError> for ScanlytixError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **해석**: `Configuration`, `PolicyNotFound`, `OrphanScan`, `UnknownProduct`
//! - **원격 조회**: `RemoteFetch`, `Cancelled`
//! - **리포트**: `Format`
//! - **상태/설정/I/O**: `State`, `Config`, `Io`

use scanlytix_core::error::{
    ConfigError, FetchError, ReportError, ResolutionError, ScanlytixError, StateError,
};

/// 변환 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// 알 수 없는 팀/프리셋 참조
    ///
    /// 원본 데이터가 서로 맞지 않는다는 뜻이므로 해석 전체를 중단합니다.
    #[error("configuration error: unknown {reference} '{id}'")]
    Configuration {
        /// 참조 종류 (team, preset)
        reference: &'static str,
        /// 해석하지 못한 ID
        id: String,
    },

    /// 등록되지 않은 정책 ID
    #[error("policy not found: {0}")]
    PolicyNotFound(u64),

    /// 알 수 없는 프로젝트를 가리키는 스캔
    #[error("orphan scan {scan_id}: unknown project {project_id}")]
    OrphanScan {
        /// 스캔 ID
        scan_id: String,
        /// 스캔이 가리키는 프로젝트 ID
        project_id: u64,
    },

    /// 디스패치 액션이 없는 제품 이름
    #[error("unknown product: '{0}'")]
    UnknownProduct(String),

    /// 원격 호출 실패
    #[error("remote fetch failed: {operation}: {reason}")]
    RemoteFetch {
        /// 호출한 조회 작업 이름
        operation: String,
        /// 실패 사유
        reason: String,
    },

    /// 리포트 문서 형식 오류
    #[error("malformed report for scan {scan_id}: {reason}")]
    Format {
        /// 스캔 ID
        scan_id: String,
        /// 오류 사유
        reason: String,
    },

    /// 취소 신호 수신
    #[error("operation cancelled")]
    Cancelled,

    /// 해석 상태 파일 에러
    #[error("state error: {path}: {reason}")]
    State {
        /// 상태 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl TransformError {
    /// 원격 호출 실패 에러를 생성합니다.
    pub fn remote(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteFetch {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// 취소 신호로 인한 중단인지 확인합니다.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<TransformError> for ScanlytixError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Configuration { reference, id } => ScanlytixError::Resolution(
                ResolutionError::UnresolvedReference(format!("{reference} '{id}'")),
            ),
            TransformError::PolicyNotFound(id) => ScanlytixError::Resolution(
                ResolutionError::UnresolvedReference(format!("policy '{id}'")),
            ),
            TransformError::OrphanScan {
                scan_id,
                project_id,
            } => ScanlytixError::Resolution(ResolutionError::OrphanScan(format!(
                "scan {scan_id} -> project {project_id}"
            ))),
            TransformError::UnknownProduct(product) => {
                ScanlytixError::Resolution(ResolutionError::UnknownProduct(product))
            }
            TransformError::RemoteFetch { operation, reason } => {
                ScanlytixError::Fetch(FetchError::Remote(format!("{operation}: {reason}")))
            }
            TransformError::Cancelled => ScanlytixError::Fetch(FetchError::Cancelled),
            TransformError::Format { scan_id, reason } => {
                ScanlytixError::Report(ReportError::Format(format!("scan {scan_id}: {reason}")))
            }
            TransformError::State { path, reason } => {
                ScanlytixError::State(StateError::Load(format!("{path}: {reason}")))
            }
            TransformError::Config { field, reason } => {
                ScanlytixError::Config(ConfigError::InvalidValue { field, reason })
            }
            TransformError::Io { source, .. } => ScanlytixError::Io(source),
        }
    }
}
