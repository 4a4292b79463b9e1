//! 설정 관리: scanlytix.toml 파싱 및 런타임 설정
//!
//! [`ScanlytixConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCANLYTIX_TRANSFORM_CONCURRENT_THREADS=4` 형식)
//! 3. 설정 파일 (`scanlytix.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scanlytix_core::error::ScanlytixError> {
//! use scanlytix_core::config::ScanlytixConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScanlytixConfig::load("scanlytix.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScanlytixConfig::parse("[transform]\nconcurrent_threads = 4")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScanlytixError};

/// 동시 변환 작업 수 상한
const MAX_CONCURRENT_THREADS: usize = 64;

/// Scanlytix 통합 설정
///
/// `scanlytix.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanlytixConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 변환 엔진 설정
    #[serde(default)]
    pub transform: TransformConfig,
    /// 수집 데이터 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
    /// 출력 레코드 이름
    #[serde(default)]
    pub output: RecordNames,
}

impl ScanlytixConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScanlytixError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanlytixError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanlytixError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScanlytixError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScanlytixError> {
        toml::from_str(toml_str).map_err(|e| {
            ScanlytixError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCANLYTIX_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANLYTIX_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANLYTIX_GENERAL_LOG_FORMAT");

        // Transform
        override_usize(
            &mut self.transform.concurrent_threads,
            "SCANLYTIX_TRANSFORM_CONCURRENT_THREADS",
        );
        override_string(
            &mut self.transform.state_path,
            "SCANLYTIX_TRANSFORM_STATE_PATH",
        );
        override_u64(
            &mut self.transform.sweep_interval_secs,
            "SCANLYTIX_TRANSFORM_SWEEP_INTERVAL_SECS",
        );

        // Source
        override_string(
            &mut self.source.snapshot_dir,
            "SCANLYTIX_SOURCE_SNAPSHOT_DIR",
        );

        // Output
        override_string(
            &mut self.output.project_info,
            "SCANLYTIX_OUTPUT_PROJECT_INFO",
        );
        override_string(
            &mut self.output.sast_scan_summary,
            "SCANLYTIX_OUTPUT_SAST_SCAN_SUMMARY",
        );
        override_string(
            &mut self.output.sast_scan_detail,
            "SCANLYTIX_OUTPUT_SAST_SCAN_DETAIL",
        );
        override_string(
            &mut self.output.policy_violations,
            "SCANLYTIX_OUTPUT_POLICY_VIOLATIONS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ScanlytixError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.transform.concurrent_threads == 0
            || self.transform.concurrent_threads > MAX_CONCURRENT_THREADS
        {
            return Err(ConfigError::InvalidValue {
                field: "transform.concurrent_threads".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENT_THREADS}"),
            }
            .into());
        }

        if self.transform.state_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "transform.state_path".to_owned(),
                reason: "state path must not be empty".to_owned(),
            }
            .into());
        }

        if self.source.snapshot_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.snapshot_dir".to_owned(),
                reason: "snapshot directory must not be empty".to_owned(),
            }
            .into());
        }

        self.output.validate()?;

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 변환 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// 동시에 처리할 스캔 수
    pub concurrent_threads: usize,
    /// 실행 간 해석 상태를 보관할 디렉토리
    pub state_path: String,
    /// 스윕 반복 간격 (초). 0이면 한 번만 실행
    pub sweep_interval_secs: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            concurrent_threads: 2,
            state_path: "/var/lib/scanlytix/state".to_owned(),
            sweep_interval_secs: 7200,
        }
    }
}

/// 수집 데이터 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 스캔 서비스에서 내보낸 스냅샷 디렉토리
    pub snapshot_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "/var/lib/scanlytix/snapshot".to_owned(),
        }
    }
}

/// 레코드 종류별 출력 이름
///
/// [`SinkFactory`](crate::sink::SinkFactory)가 출력 대상을 고를 때 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordNames {
    /// 프로젝트 정보 레코드
    pub project_info: String,
    /// SAST 스캔 요약 레코드
    pub sast_scan_summary: String,
    /// SAST 스캔 상세 레코드 (경로 노드 단위)
    pub sast_scan_detail: String,
    /// 정책 위반 상세 레코드
    pub policy_violations: String,
}

impl Default for RecordNames {
    fn default() -> Self {
        Self {
            project_info: "RECORD_Project_Info".to_owned(),
            sast_scan_summary: "RECORD_SAST_Scan_Summary".to_owned(),
            sast_scan_detail: "RECORD_SAST_Scan_Detail".to_owned(),
            policy_violations: "RECORD_Policy_Violations".to_owned(),
        }
    }
}

impl RecordNames {
    fn validate(&self) -> Result<(), ScanlytixError> {
        let names = [
            ("output.project_info", &self.project_info),
            ("output.sast_scan_summary", &self.sast_scan_summary),
            ("output.sast_scan_detail", &self.sast_scan_detail),
            ("output.policy_violations", &self.policy_violations),
        ];

        for (i, (field, name)) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: (*field).to_owned(),
                    reason: "record name must not be empty".to_owned(),
                }
                .into());
            }

            if names[..i].iter().any(|(_, other)| other == name) {
                return Err(ConfigError::InvalidValue {
                    field: (*field).to_owned(),
                    reason: format!("record name '{name}' is used more than once"),
                }
                .into());
            }
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
