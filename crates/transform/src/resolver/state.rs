//! 해석 상태: 실행 사이에 유지되는 스냅샷
//!
//! 스윕이 끝나면 알려진 팀/프리셋/프로젝트와 프로젝트별, 제품별 마지막
//! 확인 시각을 JSON 파일로 저장하고, 다음 실행 시작 시 다시 읽습니다.
//! 저장은 임시 파일에 쓴 뒤 이름을 바꾸는 방식으로 원자적으로 수행합니다.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TransformError;
use crate::product::ScanProduct;

/// 프로젝트별 저장 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// 프로젝트 이름
    pub name: String,
    /// 소유 팀 ID
    pub team_id: String,
    /// 프리셋 ID
    pub preset_id: u64,
    /// 제품 이름 → 마지막 확인 시각
    #[serde(default)]
    pub last_check: BTreeMap<String, DateTime<Utc>>,
}

impl ProjectState {
    /// 제품의 마지막 확인 시각을 반환합니다.
    pub fn last_check_for(&self, product: ScanProduct) -> Option<DateTime<Utc>> {
        self.last_check.get(product.as_str()).copied()
    }
}

/// 해석 상태 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverState {
    /// 팀 ID → 팀 이름
    #[serde(default)]
    pub teams: BTreeMap<String, String>,
    /// 프리셋 ID → 프리셋 이름
    #[serde(default)]
    pub presets: BTreeMap<u64, String>,
    /// 프로젝트 ID → 프로젝트 상태
    #[serde(default)]
    pub projects: BTreeMap<u64, ProjectState>,
}

impl ResolverState {
    /// 프로젝트의 제품별 마지막 확인 시각을 반환합니다.
    pub fn last_check(&self, project_id: u64, product: ScanProduct) -> Option<DateTime<Utc>> {
        self.projects
            .get(&project_id)
            .and_then(|project| project.last_check_for(product))
    }

    /// 상태 파일을 읽습니다.
    ///
    /// 파일이 없으면 첫 실행으로 보고 빈 상태를 반환합니다.
    ///
    /// # Errors
    ///
    /// 파일을 읽을 수 없거나 JSON 형식이 잘못되면 `TransformError::State` 반환
    pub async fn load(path: &Path) -> Result<Self, TransformError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no resolver state found, starting fresh");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TransformError::State {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let state: Self = serde_json::from_str(&content).map_err(|e| TransformError::State {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(
            path = %path.display(),
            projects = state.projects.len(),
            "resolver state loaded"
        );
        Ok(state)
    }

    /// 상태 파일을 원자적으로 저장합니다.
    ///
    /// 상위 디렉토리가 없으면 생성합니다.
    ///
    /// # Errors
    ///
    /// 직렬화 또는 파일 쓰기 실패 시 에러 반환
    pub async fn save(&self, path: &Path) -> Result<(), TransformError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| TransformError::State {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransformError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| TransformError::Io {
                path: tmp_path.display().to_string(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| TransformError::Io {
                path: path.display().to_string(),
                source: e,
            })?;

        debug!(path = %path.display(), "resolver state saved");
        Ok(())
    }
}
