//! 에러 타입: 도메인별 에러 정의

/// Scanlytix 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScanlytixError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 프로젝트/스캔 해석 에러
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// 원격 데이터 조회 에러
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 리포트 변환 에러
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// 해석 상태 저장/로드 에러
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanlytixError {
    /// 취소 신호로 인한 중단인지 확인합니다.
    ///
    /// 취소는 에러가 아니라 제어 신호이므로 호출자는 에러 로그를 남기지 않아야 합니다.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanlytixError::Fetch(FetchError::Cancelled))
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 프로젝트/스캔 해석 에러
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// 알 수 없는 팀/프리셋/정책 참조
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// 알 수 없는 프로젝트를 가리키는 스캔
    #[error("orphan scan: {0}")]
    OrphanScan(String),

    /// 등록되지 않은 제품
    #[error("unknown product: {0}")]
    UnknownProduct(String),
}

/// 원격 데이터 조회 에러
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// 원격 호출 실패
    #[error("remote call failed: {0}")]
    Remote(String),

    /// 취소 신호 수신
    #[error("cancelled")]
    Cancelled,
}

/// 리포트 변환 에러
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 리포트 문서 형식 오류
    #[error("malformed report: {0}")]
    Format(String),
}

/// 해석 상태 저장/로드 에러
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// 상태 로드 실패
    #[error("failed to load state: {0}")]
    Load(String),

    /// 상태 저장 실패
    #[error("failed to save state: {0}")]
    Save(String),
}
