//! Scanlytix 공통 크레이트
//!
//! 모든 Scanlytix 크레이트가 공유하는 에러 타입, 설정, 평탄화 레코드,
//! 출력 싱크 trait, 메트릭 이름을 정의합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 최상위 에러 (`ScanlytixError`)와 카테고리별 에러
//! - [`config`]: `scanlytix.toml` 파싱 및 환경변수 오버라이드 (`ScanlytixConfig`)
//! - [`record`]: 키 정렬된 평탄화 레코드 (`FlatRecord`) 와 공통 키 상수
//! - [`sink`]: 레코드 출력 추상화 (`RecordSink`, `SinkFactory`)
//! - [`metrics`]: 메트릭 이름 상수와 설명 등록

pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod sink;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, FetchError, ReportError, ResolutionError, ScanlytixError, StateError,
};

// 설정
pub use config::{RecordNames, ScanlytixConfig};

// 레코드
pub use record::FlatRecord;

// 싱크
pub use sink::{LogSink, LogSinkFactory, MemorySink, MemorySinkFactory, RecordSink, SinkFactory};
