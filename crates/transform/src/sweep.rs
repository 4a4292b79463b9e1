//! 스윕 엔진: 부트스트랩과 제한된 워커 풀 기반 스캔 처리
//!
//! [`Transformer::bootstrap`]이 조회기에서 메타데이터와 스캔 목록을 읽어
//! 디스크립터를 만들고, [`Transformer::sweep`]이 디스크립터마다 다음을 수행합니다.
//!
//! 1. 프로젝트 위반 조회 (프로젝트당 한 번, 조회를 맡은 워커가 프로젝트 정보 레코드 출력)
//! 2. 스캔별 위반 집계 설정
//! 3. 제품별 처리 (SAST: 리포트 다운로드, 변환, 요약 / SCA: 로그만)
//! 4. 정책 위반 상세 레코드 생성
//! 5. 스캔이 끝까지 성공하면 배치를 싱크로 출력
//!
//! 취소 신호가 오면 새 원격 호출을 시작하지 않고, 진행 중인 호출도 중단합니다.
//! 취소되거나 실패한 스캔의 레코드는 출력하지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use scanlytix_core::metrics as m;
use scanlytix_core::sink::SinkFactory;

use crate::config::SweepConfig;
use crate::descriptor::{ScanDescriptor, ScanState};
use crate::emit::{self, RecordBatch, RecordKind, Sinks};
use crate::error::TransformError;
use crate::index::{MetadataIndex, PolicyIndex};
use crate::product::ScanProduct;
use crate::report;
use crate::resolver::project::{Project, ProjectResolver};
use crate::resolver::state::ResolverState;
use crate::source::{ScanDataSource, cancellable};
use crate::types::SastScan;
use crate::violation::{ViolatedPolicyCollection, ViolationCache};

/// 스윕 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// 처리 대상 스캔 수
    pub scans_total: usize,
    /// 레코드를 출력한 스캔 수
    pub scans_emitted: usize,
    /// 실패한 스캔 수
    pub scans_failed: usize,
    /// 취소된 스캔 수 (시작하지 못한 스캔 포함)
    pub scans_cancelled: usize,
    /// 출력한 레코드 수 (프로젝트 정보 레코드 포함)
    pub records_emitted: usize,
}

/// 변환기
///
/// 부트스트랩으로 생성하며, 한 번의 스윕을 수행합니다.
pub struct Transformer<S: ScanDataSource> {
    source: Arc<S>,
    cancel: CancellationToken,
    policies: Option<Arc<PolicyIndex>>,
    sast_scans: Arc<HashMap<String, SastScan>>,
    descriptors: Vec<ScanDescriptor>,
    projects: Vec<Arc<Project>>,
    next_state: ResolverState,
}

impl<S: ScanDataSource> Transformer<S> {
    /// 조회기에서 데이터를 읽어 처리할 디스크립터를 준비합니다.
    ///
    /// 정책 데이터 조회 실패는 경고만 남기고 정책 없이 계속합니다.
    ///
    /// # Errors
    ///
    /// - 프리셋/팀/프로젝트/스캔 조회 실패: `TransformError::RemoteFetch`
    /// - 해석 실패: `Configuration`, `PolicyNotFound`, `OrphanScan`, `UnknownProduct`
    /// - 취소: `TransformError::Cancelled`
    pub async fn bootstrap(
        source: Arc<S>,
        cancel: CancellationToken,
        prior: ResolverState,
    ) -> Result<Self, TransformError> {
        let check_time = Utc::now();

        let mut policies = match cancellable(&cancel, || source.policies(&cancel)).await {
            Ok(policies) => {
                debug!(policies = policies.len(), "policies loaded");
                Some(PolicyIndex::new(policies))
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(error = %e, "policy data is not available, continuing without policies");
                None
            }
        };

        let mut metadata = MetadataIndex::from_state(&prior);
        for preset in cancellable(&cancel, || source.presets(&cancel)).await? {
            metadata.add_preset(preset.preset_id, preset.preset_name);
        }
        for team in cancellable(&cancel, || source.teams(&cancel)).await? {
            metadata.add_team(team.team_id, team.team_name);
        }

        let mut project_resolver = ProjectResolver::new(metadata, prior);
        let projects = cancellable(&cancel, || source.projects(&cancel)).await?;
        for project in &projects {
            let policy_names = match policies.as_mut() {
                Some(index) => {
                    let ids = cancellable(&cancel, || {
                        source.project_policy_ids(project.project_id, &cancel)
                    })
                    .await?;
                    let names = index.flatten_policy_names(&ids)?;
                    index.correlate_project_to_policies(project.project_id, ids);
                    names
                }
                None => String::new(),
            };

            project_resolver.add_project(
                &project.team_id,
                project.preset_id,
                project.project_id,
                &project.project_name,
                policy_names,
            )?;
        }

        let mut scan_resolver = project_resolver.resolve();
        let mut sast_scans = HashMap::new();
        for scan in cancellable(&cancel, || source.sast_scans(&cancel)).await? {
            scan_resolver.add_scan(
                scan.project_id,
                &scan.scan_type,
                ScanProduct::Sast.as_str(),
                &scan.scan_id,
                scan.finish_time,
            )?;
            sast_scans.insert(scan.scan_id.clone(), scan);
        }

        for project in &projects {
            let sca_scans =
                cancellable(&cancel, || source.sca_scans(project.project_id, &cancel)).await?;
            for scan in sca_scans {
                scan_resolver.add_scan(
                    scan.project_id,
                    "Composition",
                    ScanProduct::Sca.as_str(),
                    &scan.scan_id,
                    scan.finish_time,
                )?;
            }
        }

        let resolution = scan_resolver.resolve(check_time);
        info!(
            projects = resolution.projects.len(),
            scans = resolution.descriptors.len(),
            policies = policies.is_some(),
            "bootstrap completed"
        );

        Ok(Self {
            source,
            cancel,
            policies: policies.map(Arc::new),
            sast_scans: Arc::new(sast_scans),
            descriptors: resolution.descriptors,
            projects: resolution.projects,
            next_state: resolution.state,
        })
    }

    /// 처리 대기 중인 디스크립터를 반환합니다.
    pub fn descriptors(&self) -> &[ScanDescriptor] {
        &self.descriptors
    }

    /// 해석된 프로젝트를 반환합니다.
    pub fn projects(&self) -> &[Arc<Project>] {
        &self.projects
    }

    /// 정책 데이터가 있는지 확인합니다.
    pub fn has_policies(&self) -> bool {
        self.policies.is_some()
    }

    /// 다음 실행을 위한 해석 상태를 반환합니다.
    pub fn next_state(&self) -> &ResolverState {
        &self.next_state
    }

    /// 모든 디스크립터를 최대 `concurrent_threads`개씩 동시에 처리합니다.
    ///
    /// 모든 워커가 끝나거나 취소를 관찰한 뒤에 반환합니다.
    pub async fn sweep(&mut self, concurrent_threads: usize, sinks: Sinks) -> SweepSummary {
        let descriptors = std::mem::take(&mut self.descriptors);
        let mut summary = SweepSummary {
            scans_total: descriptors.len(),
            ..Default::default()
        };

        let ctx = Arc::new(SweepContext {
            source: Arc::clone(&self.source),
            cancel: self.cancel.clone(),
            policies: self.policies.clone(),
            sast_scans: Arc::clone(&self.sast_scans),
            violations: ViolationCache::new(),
            sinks,
            project_records: AtomicUsize::new(0),
        });

        let semaphore = Arc::new(Semaphore::new(concurrent_threads.max(1)));
        let mut tasks = JoinSet::new();
        let mut spawned = 0usize;

        for descriptor in descriptors {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let ctx = Arc::clone(&ctx);
            let scan_id = descriptor.scan_id.clone();
            let product = descriptor.product;
            let span = info_span!("scan", scan_id = %scan_id, product = %product);
            tasks.spawn(
                async move {
                    let _permit = permit;
                    let result = ctx.process(descriptor).await;
                    (scan_id, product, result)
                }
                .instrument(span),
            );
            spawned += 1;
        }

        summary.scans_cancelled = summary.scans_total - spawned;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, product, Ok(written))) => {
                    summary.scans_emitted += 1;
                    summary.records_emitted += written;
                    count_scan(product, "emitted");
                }
                Ok((scan_id, product, Err(e))) if e.is_cancelled() => {
                    debug!(scan_id = %scan_id, "scan cancelled");
                    summary.scans_cancelled += 1;
                    count_scan(product, "cancelled");
                }
                Ok((scan_id, product, Err(e))) => {
                    error!(scan_id = %scan_id, error = %e, "scan processing failed");
                    summary.scans_failed += 1;
                    count_scan(product, "failed");
                }
                Err(e) => {
                    error!(error = %e, "scan task failed");
                    summary.scans_failed += 1;
                }
            }
        }

        summary.records_emitted += ctx.project_records.load(Ordering::Relaxed);
        debug!(
            projects = ctx.violations.resolved_projects(),
            "policy violation lookups finished"
        );
        summary
    }
}

fn count_scan(product: ScanProduct, result: &'static str) {
    counter!(
        m::SWEEP_SCANS_TOTAL,
        m::LABEL_PRODUCT => product.as_str(),
        m::LABEL_RESULT => result
    )
    .increment(1);
}

/// 워커들이 공유하는 스윕 컨텍스트
struct SweepContext<S: ScanDataSource> {
    source: Arc<S>,
    cancel: CancellationToken,
    policies: Option<Arc<PolicyIndex>>,
    sast_scans: Arc<HashMap<String, SastScan>>,
    violations: ViolationCache,
    sinks: Sinks,
    project_records: AtomicUsize,
}

impl<S: ScanDataSource> SweepContext<S> {
    /// 디스크립터 하나를 처리하고 출력한 레코드 수를 반환합니다.
    async fn process(&self, mut descriptor: ScanDescriptor) -> Result<usize, TransformError> {
        let collection = self.violations_for(&descriptor.project).await?;
        if let Some(counts) = collection.counts_for_scan(&descriptor.scan_id) {
            descriptor.set_violation_counts(counts);
        }
        descriptor.advance(ScanState::PolicyResolved);

        let mut batch = RecordBatch::new();
        let mut descriptor = match descriptor.product {
            ScanProduct::Sast => self.sast_action(descriptor, &mut batch).await?,
            ScanProduct::Sca => {
                debug!(scan_id = %descriptor.scan_id, "composition scan has no report transform");
                descriptor
            }
        };
        descriptor.advance(ScanState::Dispatched);

        self.policy_violation_details(&descriptor, &collection, &mut batch)?;

        if self.cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let written = batch.flush(&self.sinks);
        descriptor.advance(ScanState::Emitted);
        debug!(scan_id = %descriptor.scan_id, records = written, "scan emitted");
        Ok(written)
    }

    /// 프로젝트 위반 모음을 가져옵니다. 프로젝트당 한 번만 조회합니다.
    ///
    /// 조회를 맡은 워커는 프로젝트 정보 레코드를 바로 출력합니다.
    async fn violations_for(
        &self,
        project: &Arc<Project>,
    ) -> Result<Arc<ViolatedPolicyCollection>, TransformError> {
        let project_id = project.project_id;
        let (collection, claimed) = self
            .violations
            .get_or_fetch(project_id, || self.fetch_violations(project_id))
            .await?;

        if claimed {
            self.sinks
                .write(RecordKind::ProjectInfo, emit::project_info_record(project));
            self.project_records.fetch_add(1, Ordering::Relaxed);
        }
        Ok(collection)
    }

    async fn fetch_violations(
        &self,
        project_id: u64,
    ) -> Result<ViolatedPolicyCollection, TransformError> {
        if self.policies.is_none() {
            return Ok(ViolatedPolicyCollection::new());
        }

        match cancellable(&self.cancel, || {
            self.source.policy_violations(project_id, &self.cancel)
        })
        .await
        {
            Ok(rules) => Ok(ViolatedPolicyCollection::from_rules(rules)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(
                    project_id,
                    error = %e,
                    "policy violations unavailable, treating project as having none"
                );
                counter!(m::POLICY_VIOLATION_FETCH_FAILURES_TOTAL).increment(1);
                Ok(ViolatedPolicyCollection::new())
            }
        }
    }

    /// SAST 처리: 리포트를 받아 상세 레코드로 변환하고 요약 레코드를 만듭니다.
    async fn sast_action(
        &self,
        descriptor: ScanDescriptor,
        batch: &mut RecordBatch,
    ) -> Result<ScanDescriptor, TransformError> {
        let scan_id = descriptor.scan_id.clone();
        debug!(scan_id = %scan_id, "retrieving report");
        let report = cancellable(&self.cancel, || {
            self.source.sast_report(&scan_id, &self.cancel)
        })
        .await?;

        let started = Instant::now();
        let (descriptor, details) = tokio::task::spawn_blocking(move || {
            let mut descriptor = descriptor;
            let details = report::transform_report(&mut descriptor, &report);
            (descriptor, details)
        })
        .await
        .map_err(|e| TransformError::Format {
            scan_id: scan_id.clone(),
            reason: format!("report transform task failed: {e}"),
        })?;
        let details = details?;
        histogram!(m::REPORT_TRANSFORM_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        debug!(scan_id = %scan_id, details = details.len(), "report processed");

        batch.extend(RecordKind::ScanDetail, details);
        batch.push(
            RecordKind::ScanSummary,
            emit::scan_summary_record(&descriptor, self.sast_scans.get(&scan_id)),
        );
        Ok(descriptor)
    }

    /// 스캔에 해당하는 위반 규칙마다 정책 위반 상세 레코드를 만듭니다.
    fn policy_violation_details(
        &self,
        descriptor: &ScanDescriptor,
        collection: &ViolatedPolicyCollection,
        batch: &mut RecordBatch,
    ) -> Result<(), TransformError> {
        let (Some(rules), Some(policies)) = (
            collection.rules_for_scan(&descriptor.scan_id),
            self.policies.as_deref(),
        ) else {
            return Ok(());
        };

        let header = emit::scan_header(descriptor);
        let assigned = policies.policies_for_project(descriptor.project.project_id);
        for rule in rules {
            let policy = policies.policy_by_id(rule.policy_id)?;
            if !assigned.contains(&rule.policy_id) {
                debug!(
                    scan_id = %descriptor.scan_id,
                    policy_id = rule.policy_id,
                    "violated policy is not assigned to the project"
                );
            }
            batch.push(
                RecordKind::PolicyViolation,
                emit::policy_violation_record(&header, rule, &policy.name),
            );
        }
        Ok(())
    }
}

/// 한 번의 스윕 전체를 실행합니다.
///
/// 해석 상태 로드 → 부트스트랩 → 스윕 → 해석 상태 저장 순서로 진행하며,
/// 스윕이 취소되었으면 상태를 저장하지 않아 다음 실행이 남은 스캔을 다시 처리합니다.
///
/// # Errors
///
/// 설정 검증, 상태 파일, 부트스트랩 실패 시 에러 반환.
/// 스캔 단위 실패는 에러가 아니라 [`SweepSummary::scans_failed`]에 집계됩니다.
pub async fn run_transform<S: ScanDataSource>(
    config: &SweepConfig,
    source: Arc<S>,
    factory: &dyn SinkFactory,
    cancel: CancellationToken,
) -> Result<SweepSummary, TransformError> {
    config.validate()?;

    let sweep_id = Uuid::new_v4();
    let span = info_span!("sweep", sweep_id = %sweep_id);

    async move {
        let started = Instant::now();
        let state_file = config.state_file();

        let prior = ResolverState::load(&state_file).await?;
        let mut transformer = Transformer::bootstrap(source, cancel.clone(), prior).await?;

        let sinks = Sinks::from_factory(factory, &config.record_names);
        let summary = transformer.sweep(config.concurrent_threads, sinks).await;

        if cancel.is_cancelled() {
            warn!(
                cancelled = summary.scans_cancelled,
                "sweep cancelled, resolver state not saved"
            );
        } else {
            transformer.next_state().save(&state_file).await?;
        }

        histogram!(m::SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(
            scans = summary.scans_total,
            emitted = summary.scans_emitted,
            failed = summary.scans_failed,
            cancelled = summary.scans_cancelled,
            records = summary.records_emitted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sweep completed"
        );
        Ok::<_, TransformError>(summary)
    }
    .instrument(span)
    .await
}
