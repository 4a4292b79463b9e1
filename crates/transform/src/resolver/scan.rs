//! 스캔 해석기
//!
//! 해석된 프로젝트에 스캔을 묶고, 확인 시각을 찍은 [`ScanDescriptor`] 목록과
//! 다음 실행을 위한 [`ResolverState`]를 만듭니다.
//!
//! 이전 실행의 마지막 확인 시각 이전에 끝난 스캔은 집계에는 포함되지만
//! 디스크립터는 만들지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::descriptor::ScanDescriptor;
use crate::error::TransformError;
use crate::index::MetadataIndex;
use crate::product::ScanProduct;
use crate::resolver::project::Project;
use crate::resolver::state::{ProjectState, ResolverState};

/// 이번 실행에서 처리할 스캔
#[derive(Debug, Clone)]
struct PendingScan {
    project_id: u64,
    scan_id: String,
    scan_type: String,
    product: ScanProduct,
    finish_time: DateTime<Utc>,
}

/// 해석 결과
#[derive(Debug)]
pub struct Resolution {
    /// 처리할 스캔 디스크립터 (추가된 순서)
    pub descriptors: Vec<ScanDescriptor>,
    /// 고정된 프로젝트 목록
    pub projects: Vec<Arc<Project>>,
    /// 다음 실행을 위한 해석 상태
    pub state: ResolverState,
}

/// 스캔 해석기
#[derive(Debug)]
pub struct ScanResolver {
    metadata: MetadataIndex,
    prior: ResolverState,
    projects: BTreeMap<u64, Project>,
    pending: Vec<PendingScan>,
    latest_seen: BTreeMap<(u64, ScanProduct), DateTime<Utc>>,
    skipped: usize,
}

impl ScanResolver {
    pub(crate) fn new(
        metadata: MetadataIndex,
        prior: ResolverState,
        projects: BTreeMap<u64, Project>,
    ) -> Self {
        Self {
            metadata,
            prior,
            projects,
            pending: Vec::new(),
            latest_seen: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// 스캔을 프로젝트에 추가합니다.
    ///
    /// # Errors
    ///
    /// - 알 수 없는 프로젝트: `TransformError::OrphanScan`
    /// - 디스패치할 수 없는 제품 이름: `TransformError::UnknownProduct`
    pub fn add_scan(
        &mut self,
        project_id: u64,
        scan_type: &str,
        product: &str,
        scan_id: &str,
        finish_time: DateTime<Utc>,
    ) -> Result<(), TransformError> {
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| TransformError::OrphanScan {
                scan_id: scan_id.to_owned(),
                project_id,
            })?;
        let product: ScanProduct = product.parse()?;

        project.record_scan(product, finish_time);
        self.latest_seen
            .entry((project_id, product))
            .and_modify(|latest| {
                if finish_time > *latest {
                    *latest = finish_time;
                }
            })
            .or_insert(finish_time);

        if let Some(last_check) = self.prior.last_check(project_id, product) {
            if finish_time <= last_check {
                debug!(scan_id, project_id, %product, "scan already processed");
                self.skipped += 1;
                return Ok(());
            }
        }

        self.pending.push(PendingScan {
            project_id,
            scan_id: scan_id.to_owned(),
            scan_type: scan_type.to_owned(),
            product,
            finish_time,
        });
        Ok(())
    }

    /// 처리 대기 중인 스캔 수를 반환합니다.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// 디스크립터를 만들고 다음 실행 상태를 계산합니다.
    ///
    /// 스캔이 있었던 프로젝트/제품의 마지막 확인 시각은 `check_time`과
    /// 가장 늦은 스캔 완료 시각 중 늦은 쪽으로 기록합니다.
    pub fn resolve(self, check_time: DateTime<Utc>) -> Resolution {
        let state = self.next_state(check_time);

        let frozen: BTreeMap<u64, Arc<Project>> = self
            .projects
            .into_iter()
            .map(|(id, project)| (id, Arc::new(project)))
            .collect();

        let descriptors: Vec<ScanDescriptor> = self
            .pending
            .into_iter()
            .filter_map(|scan| {
                frozen.get(&scan.project_id).map(|project| {
                    ScanDescriptor::new(
                        scan.scan_id,
                        scan.scan_type,
                        scan.product,
                        scan.finish_time,
                        check_time,
                        Arc::clone(project),
                    )
                })
            })
            .collect();

        info!(
            projects = frozen.len(),
            descriptors = descriptors.len(),
            skipped = self.skipped,
            "scans resolved"
        );

        Resolution {
            descriptors,
            projects: frozen.into_values().collect(),
            state,
        }
    }

    fn next_state(&self, check_time: DateTime<Utc>) -> ResolverState {
        let mut state = ResolverState {
            teams: self
                .metadata
                .teams()
                .map(|(id, name)| (id.to_owned(), name.to_owned()))
                .collect(),
            presets: self
                .metadata
                .presets()
                .map(|(id, name)| (id, name.to_owned()))
                .collect(),
            projects: BTreeMap::new(),
        };

        for (project_id, project) in &self.projects {
            let mut last_check = self
                .prior
                .projects
                .get(project_id)
                .map(|prior| prior.last_check.clone())
                .unwrap_or_default();

            let products: BTreeSet<ScanProduct> = project.scan_counts.keys().copied().collect();
            for product in products {
                let latest = self
                    .latest_seen
                    .get(&(*project_id, product))
                    .copied()
                    .unwrap_or(check_time);
                last_check.insert(product.as_str().to_owned(), latest.max(check_time));
            }

            state.projects.insert(
                *project_id,
                ProjectState {
                    name: project.project_name.clone(),
                    team_id: project.team_id.clone(),
                    preset_id: project.preset_id,
                    last_check,
                },
            );
        }

        state
    }
}
