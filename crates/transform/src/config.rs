//! 스윕 설정
//!
//! [`SweepConfig`]는 core의 [`TransformConfig`](scanlytix_core::config::TransformConfig)와
//! 출력 레코드 이름을 묶어 한 번의 스윕에 필요한 값을 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use scanlytix_transform::SweepConfigBuilder;
//!
//! let config = SweepConfigBuilder::new()
//!     .concurrent_threads(4)
//!     .state_path("/tmp/scanlytix-state")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.concurrent_threads, 4);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use scanlytix_core::config::{RecordNames, ScanlytixConfig};

use crate::error::TransformError;

/// 동시 작업 수 상한
const MAX_CONCURRENT_THREADS: usize = 64;

/// 해석 상태 파일 이름
const STATE_FILE_NAME: &str = "resolver_state.json";

/// 스윕 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// 동시에 처리할 스캔 수 (워커 풀 크기)
    pub concurrent_threads: usize,
    /// 해석 상태를 보관할 디렉토리
    pub state_path: PathBuf,
    /// 레코드 종류별 출력 이름
    pub record_names: RecordNames,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrent_threads: 2,
            state_path: PathBuf::from("/var/lib/scanlytix/state"),
            record_names: RecordNames::default(),
        }
    }
}

impl SweepConfig {
    /// core 설정에서 스윕 설정을 생성합니다.
    pub fn from_core(core: &ScanlytixConfig) -> Self {
        Self {
            concurrent_threads: core.transform.concurrent_threads,
            state_path: PathBuf::from(&core.transform.state_path),
            record_names: core.output.clone(),
        }
    }

    /// 해석 상태 파일 경로를 반환합니다.
    pub fn state_file(&self) -> PathBuf {
        self.state_path.join(STATE_FILE_NAME)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `concurrent_threads`: 1-64
    /// - `state_path`: 비어있으면 안 되며 `..` 컴포넌트를 포함할 수 없음
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.concurrent_threads == 0 || self.concurrent_threads > MAX_CONCURRENT_THREADS {
            return Err(TransformError::Config {
                field: "concurrent_threads".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENT_THREADS}"),
            });
        }

        if self.state_path.as_os_str().is_empty() {
            return Err(TransformError::Config {
                field: "state_path".to_owned(),
                reason: "state path must not be empty".to_owned(),
            });
        }

        if self
            .state_path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(TransformError::Config {
                field: "state_path".to_owned(),
                reason: "state path contains path traversal pattern '..'".to_owned(),
            });
        }

        Ok(())
    }
}

/// [`SweepConfig`] 빌더
#[derive(Default)]
pub struct SweepConfigBuilder {
    config: SweepConfig,
}

impl SweepConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 워커 풀 크기를 설정합니다.
    pub fn concurrent_threads(mut self, threads: usize) -> Self {
        self.config.concurrent_threads = threads;
        self
    }

    /// 해석 상태 디렉토리를 설정합니다.
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state_path = path.into();
        self
    }

    /// 레코드 이름을 설정합니다.
    pub fn record_names(mut self, names: RecordNames) -> Self {
        self.config.record_names = names;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `TransformError::Config` 반환
    pub fn build(self) -> Result<SweepConfig, TransformError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
