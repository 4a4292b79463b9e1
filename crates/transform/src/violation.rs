//! 정책 위반 수집과 프로젝트 단위 캐시
//!
//! [`ViolatedPolicyCollection`]은 프로젝트 하나의 위반 규칙을 스캔 ID로 묶어 보관합니다.
//! [`ViolationCache`]는 프로젝트마다 위반 조회를 한 번만 수행하도록 보장하며,
//! 가장 먼저 조회를 맡은 워커만 조회를 실행하고 나머지는 그 결과를 기다립니다.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::descriptor::ViolationCounts;
use crate::error::TransformError;
use crate::types::PolicyViolationRule;

/// 프로젝트 하나의 위반 규칙 모음
#[derive(Debug, Clone, Default)]
pub struct ViolatedPolicyCollection {
    by_scan: HashMap<String, Vec<PolicyViolationRule>>,
}

impl ViolatedPolicyCollection {
    /// 빈 모음을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 위반 규칙 목록으로 모음을 생성합니다. 스캔별 입력 순서는 유지됩니다.
    pub fn from_rules(rules: impl IntoIterator<Item = PolicyViolationRule>) -> Self {
        let mut by_scan: HashMap<String, Vec<PolicyViolationRule>> = HashMap::new();
        for rule in rules {
            by_scan.entry(rule.scan_id.clone()).or_default().push(rule);
        }
        Self { by_scan }
    }

    /// 스캔의 위반 규칙을 반환합니다 (위반이 없으면 `None`).
    pub fn rules_for_scan(&self, scan_id: &str) -> Option<&[PolicyViolationRule]> {
        self.by_scan.get(scan_id).map(Vec::as_slice)
    }

    /// 스캔의 위반 집계를 계산합니다 (위반이 없으면 `None`).
    pub fn counts_for_scan(&self, scan_id: &str) -> Option<ViolationCounts> {
        let rules = self.rules_for_scan(scan_id)?;
        let policies: BTreeSet<u64> = rules.iter().map(|r| r.policy_id).collect();
        let rule_ids: BTreeSet<u64> = rules.iter().map(|r| r.rule_id).collect();
        Some(ViolationCounts {
            policies_violated: policies.len(),
            rules_violated: rule_ids.len(),
            violations: rules.len(),
        })
    }

    /// 위반 규칙이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.by_scan.is_empty()
    }
}

/// 프로젝트별 위반 조회 결과 캐시
///
/// 셀 테이블을 잠그는 것은 셀을 꺼내는 동안뿐이며, 조회 자체는 잠금 밖에서 수행합니다.
#[derive(Debug, Default)]
pub struct ViolationCache {
    cells: Mutex<HashMap<u64, Arc<OnceCell<Arc<ViolatedPolicyCollection>>>>>,
}

impl ViolationCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로젝트의 위반 모음을 반환하며, 처음 요청이면 `fetch`로 조회합니다.
    ///
    /// 두 번째 값은 이번 호출이 조회를 실행했는지 여부입니다.
    /// `fetch`가 실패하면 셀은 비어 있는 채로 남습니다.
    ///
    /// # Errors
    ///
    /// `fetch`의 에러를 그대로 반환
    pub async fn get_or_fetch<F, Fut>(
        &self,
        project_id: u64,
        fetch: F,
    ) -> Result<(Arc<ViolatedPolicyCollection>, bool), TransformError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ViolatedPolicyCollection, TransformError>>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cells.entry(project_id).or_default())
        };

        let mut claimed = false;
        let collection = cell
            .get_or_try_init(|| {
                claimed = true;
                async move { fetch().await.map(Arc::new) }
            })
            .await?;

        Ok((Arc::clone(collection), claimed))
    }

    /// 조회가 끝난 프로젝트 수를 반환합니다.
    pub fn resolved_projects(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.initialized()).count()
    }
}
