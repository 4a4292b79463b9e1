//! 프로젝트 해석기
//!
//! 원본 프로젝트 레코드에 팀/프리셋 이름과 정책 이름을 붙여 [`Project`]를 만들고,
//! 팀별로 등록합니다. 해석이 끝나면 [`ScanResolver`]로 넘어갑니다.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TransformError;
use crate::index::MetadataIndex;
use crate::product::ScanProduct;
use crate::resolver::scan::ScanResolver;
use crate::resolver::state::ResolverState;

/// 해석된 프로젝트
///
/// 스캔을 추가하는 동안에만 집계 맵이 갱신되며, 스윕이 시작되면
/// `Arc<Project>`로 고정되어 더 이상 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 프로젝트 이름
    pub project_name: String,
    /// 소유 팀 ID
    pub team_id: String,
    /// 소유 팀 이름
    pub team_name: String,
    /// 프리셋 ID
    pub preset_id: u64,
    /// 프리셋 이름
    pub preset_name: String,
    /// `;`로 연결된 정책 이름
    pub policies: String,
    /// 제품별 마지막 스캔 완료 시각
    pub last_scan_dates: BTreeMap<ScanProduct, DateTime<Utc>>,
    /// 제품별 스캔 수
    pub scan_counts: BTreeMap<ScanProduct, u64>,
}

impl Project {
    /// 스캔 하나를 집계에 반영합니다.
    pub(crate) fn record_scan(&mut self, product: ScanProduct, finish_time: DateTime<Utc>) {
        self.last_scan_dates
            .entry(product)
            .and_modify(|latest| {
                if finish_time > *latest {
                    *latest = finish_time;
                }
            })
            .or_insert(finish_time);
        *self.scan_counts.entry(product).or_insert(0) += 1;
    }
}

/// 프로젝트 해석기
#[derive(Debug)]
pub struct ProjectResolver {
    metadata: MetadataIndex,
    prior: ResolverState,
    projects: BTreeMap<u64, Project>,
    team_projects: HashMap<String, BTreeSet<u64>>,
}

impl ProjectResolver {
    /// 메타데이터 인덱스와 이전 실행 상태로 해석기를 생성합니다.
    pub fn new(metadata: MetadataIndex, prior: ResolverState) -> Self {
        Self {
            metadata,
            prior,
            projects: BTreeMap::new(),
            team_projects: HashMap::new(),
        }
    }

    /// 프로젝트를 등록합니다.
    ///
    /// 같은 프로젝트를 다시 등록하면 이전 값을 덮어씁니다.
    ///
    /// # Errors
    ///
    /// 팀 또는 프리셋 ID를 해석할 수 없으면 `TransformError::Configuration` 반환
    pub fn add_project(
        &mut self,
        team_id: &str,
        preset_id: u64,
        project_id: u64,
        project_name: &str,
        policies: impl Into<String>,
    ) -> Result<(), TransformError> {
        let team_name = self.metadata.resolve_team(team_id)?.to_owned();
        let preset_name = self.metadata.resolve_preset(preset_id)?.to_owned();

        if let Some(previous) = self.projects.get(&project_id) {
            if previous.team_id != team_id {
                if let Some(members) = self.team_projects.get_mut(&previous.team_id) {
                    members.remove(&project_id);
                }
            }
        }

        self.team_projects
            .entry(team_id.to_owned())
            .or_default()
            .insert(project_id);

        debug!(
            project_id,
            project_name,
            team = %team_name,
            preset = %preset_name,
            "project registered"
        );

        self.projects.insert(
            project_id,
            Project {
                project_id,
                project_name: project_name.to_owned(),
                team_id: team_id.to_owned(),
                team_name,
                preset_id,
                preset_name,
                policies: policies.into(),
                last_scan_dates: BTreeMap::new(),
                scan_counts: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// 팀에 등록된 프로젝트 ID를 오름차순으로 반환합니다.
    pub fn projects_for_team(&self, team_id: &str) -> Vec<u64> {
        self.team_projects
            .get(team_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 등록된 프로젝트를 조회합니다.
    pub fn project(&self, project_id: u64) -> Option<&Project> {
        self.projects.get(&project_id)
    }

    /// 등록된 프로젝트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// 등록된 프로젝트가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// 프로젝트 해석을 마치고 스캔 해석기를 반환합니다.
    pub fn resolve(self) -> ScanResolver {
        ScanResolver::new(self.metadata, self.prior, self.projects)
    }
}
