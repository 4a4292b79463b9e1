//! 다단계 해석 파이프라인
//!
//! ```text
//! ResolverState ─┐
//!                ▼
//! MetadataIndex ──> ProjectResolver ──> ScanResolver ──> Resolution
//!   (팀/프리셋)      (add_project)        (add_scan)       (descriptors, state)
//! ```
//!
//! - [`project`]: 프로젝트에 팀/프리셋/정책 이름을 붙이고 팀별로 등록
//! - [`scan`]: 스캔을 프로젝트에 묶고 디스크립터와 다음 실행 상태를 생성
//! - [`state`]: 실행 사이에 유지되는 해석 상태 파일

pub mod project;
pub mod scan;
pub mod state;

pub use project::{Project, ProjectResolver};
pub use scan::{Resolution, ScanResolver};
pub use state::{ProjectState, ResolverState};
