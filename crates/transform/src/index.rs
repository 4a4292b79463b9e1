//! 메타데이터/정책 인덱스
//!
//! - [`MetadataIndex`]: 프리셋 ID → 이름, 팀 ID → 이름 매핑
//! - [`PolicyIndex`]: 정책 ID → 정책 상세, 프로젝트 ID → 적용 정책 ID 목록
//!
//! 두 인덱스 모두 삽입과 조회만 지원합니다. 같은 ID를 다시 삽입하면 덮어씁니다.

use std::collections::HashMap;

use crate::error::TransformError;
use crate::resolver::state::ResolverState;
use crate::types::Policy;

/// 프리셋/팀 이름 인덱스
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    presets: HashMap<u64, String>,
    teams: HashMap<String, String>,
}

impl MetadataIndex {
    /// 빈 인덱스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이전 실행의 해석 상태로 인덱스를 채웁니다.
    ///
    /// 이후 조회된 프리셋/팀이 같은 ID로 삽입되면 상태 값을 덮어씁니다.
    pub fn from_state(state: &ResolverState) -> Self {
        let mut index = Self::new();
        for (id, name) in &state.presets {
            index.add_preset(*id, name.clone());
        }
        for (id, name) in &state.teams {
            index.add_team(id.clone(), name.clone());
        }
        index
    }

    /// 프리셋을 등록합니다.
    pub fn add_preset(&mut self, preset_id: u64, name: impl Into<String>) {
        self.presets.insert(preset_id, name.into());
    }

    /// 팀을 등록합니다.
    pub fn add_team(&mut self, team_id: impl Into<String>, name: impl Into<String>) {
        self.teams.insert(team_id.into(), name.into());
    }

    /// 프리셋 이름을 조회합니다.
    pub fn preset_name(&self, preset_id: u64) -> Option<&str> {
        self.presets.get(&preset_id).map(String::as_str)
    }

    /// 팀 이름을 조회합니다.
    pub fn team_name(&self, team_id: &str) -> Option<&str> {
        self.teams.get(team_id).map(String::as_str)
    }

    /// 프리셋 이름을 해석합니다.
    ///
    /// # Errors
    ///
    /// 등록되지 않은 ID면 `TransformError::Configuration` 반환
    pub fn resolve_preset(&self, preset_id: u64) -> Result<&str, TransformError> {
        self.preset_name(preset_id)
            .ok_or_else(|| TransformError::Configuration {
                reference: "preset",
                id: preset_id.to_string(),
            })
    }

    /// 팀 이름을 해석합니다.
    ///
    /// # Errors
    ///
    /// 등록되지 않은 ID면 `TransformError::Configuration` 반환
    pub fn resolve_team(&self, team_id: &str) -> Result<&str, TransformError> {
        self.team_name(team_id)
            .ok_or_else(|| TransformError::Configuration {
                reference: "team",
                id: team_id.to_owned(),
            })
    }

    /// 등록된 프리셋을 순회합니다.
    pub fn presets(&self) -> impl Iterator<Item = (u64, &str)> {
        self.presets.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// 등록된 팀을 순회합니다.
    pub fn teams(&self) -> impl Iterator<Item = (&str, &str)> {
        self.teams.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

/// 정책 인덱스
///
/// 정책 데이터를 불러오지 못한 배포에서는 인덱스 자체가 없으며
/// (`Option<PolicyIndex>`), 정책 관련 기능은 "정책 없음"으로 동작합니다.
#[derive(Debug, Clone, Default)]
pub struct PolicyIndex {
    policies: HashMap<u64, Policy>,
    project_policies: HashMap<u64, Vec<u64>>,
}

impl PolicyIndex {
    /// 정책 목록으로 인덱스를 생성합니다.
    pub fn new(policies: impl IntoIterator<Item = Policy>) -> Self {
        let mut index = Self::default();
        for policy in policies {
            index.add_policy(policy);
        }
        index
    }

    /// 정책을 등록합니다.
    pub fn add_policy(&mut self, policy: Policy) {
        self.policies.insert(policy.policy_id, policy);
    }

    /// 등록된 정책 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// 등록된 정책이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// 프로젝트에 적용되는 정책 ID 목록을 저장합니다.
    pub fn correlate_project_to_policies(
        &mut self,
        project_id: u64,
        policy_ids: impl IntoIterator<Item = u64>,
    ) {
        self.project_policies
            .insert(project_id, policy_ids.into_iter().collect());
    }

    /// 프로젝트에 적용되는 정책 ID 목록을 반환합니다.
    pub fn policies_for_project(&self, project_id: u64) -> &[u64] {
        self.project_policies
            .get(&project_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 정책을 ID로 조회합니다.
    ///
    /// # Errors
    ///
    /// 등록되지 않은 ID면 `TransformError::PolicyNotFound` 반환
    pub fn policy_by_id(&self, policy_id: u64) -> Result<&Policy, TransformError> {
        self.policies
            .get(&policy_id)
            .ok_or(TransformError::PolicyNotFound(policy_id))
    }

    /// 정책 이름을 입력 순서대로 `;`로 연결합니다.
    ///
    /// # Errors
    ///
    /// 등록되지 않은 ID가 있으면 `TransformError::PolicyNotFound` 반환
    pub fn flatten_policy_names(&self, policy_ids: &[u64]) -> Result<String, TransformError> {
        let names = policy_ids
            .iter()
            .map(|id| self.policy_by_id(*id).map(|p| p.name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy(id: u64, name: &str) -> Policy {
        Policy {
            policy_id: id,
            name: name.to_owned(),
            description: None,
        }
    }

    #[test]
    fn resolves_known_ids() {
        let mut index = MetadataIndex::new();
        index.add_preset(36, "Checkmarx Default");
        index.add_team("1", "/CxServer/SP/Company");

        assert_eq!(index.resolve_preset(36).unwrap(), "Checkmarx Default");
        assert_eq!(index.resolve_team("1").unwrap(), "/CxServer/SP/Company");
    }

    #[test]
    fn unknown_team_is_configuration_error() {
        let index = MetadataIndex::new();
        let err = index.resolve_team("missing").unwrap_err();
        assert!(matches!(
            err,
            TransformError::Configuration {
                reference: "team",
                ..
            }
        ));
    }

    #[test]
    fn unknown_preset_is_configuration_error() {
        let index = MetadataIndex::new();
        assert!(matches!(
            index.resolve_preset(9),
            Err(TransformError::Configuration {
                reference: "preset",
                ..
            })
        ));
    }

    #[test]
    fn add_same_id_overwrites() {
        let mut index = MetadataIndex::new();
        index.add_preset(1, "old");
        index.add_preset(1, "new");
        assert_eq!(index.preset_name(1), Some("new"));
    }

    #[test]
    fn from_state_seeds_names() {
        let mut state = ResolverState::default();
        state.presets.insert(5, "All".to_owned());
        state.teams.insert("t1".to_owned(), "/CxServer".to_owned());

        let index = MetadataIndex::from_state(&state);
        assert_eq!(index.preset_name(5), Some("All"));
        assert_eq!(index.team_name("t1"), Some("/CxServer"));
    }

    #[test]
    fn policy_by_id_unknown_fails() {
        let index = PolicyIndex::new(vec![policy(1, "A")]);
        assert!(matches!(
            index.policy_by_id(2),
            Err(TransformError::PolicyNotFound(2))
        ));
    }

    #[test]
    fn flatten_preserves_input_order() {
        let index = PolicyIndex::new(vec![policy(2, "C"), policy(3, "A"), policy(7, "B")]);
        assert_eq!(index.flatten_policy_names(&[3, 7, 2]).unwrap(), "A;B;C");
    }

    #[test]
    fn flatten_empty_list_is_empty_string() {
        let index = PolicyIndex::new(vec![policy(1, "A")]);
        assert_eq!(index.flatten_policy_names(&[]).unwrap(), "");
    }

    #[test]
    fn flatten_unknown_id_fails() {
        let index = PolicyIndex::new(vec![policy(1, "A")]);
        assert!(index.flatten_policy_names(&[1, 4]).is_err());
    }

    #[test]
    fn correlate_overwrites_previous_set() {
        let mut index = PolicyIndex::new(vec![policy(1, "A"), policy(2, "B")]);
        index.correlate_project_to_policies(10, [1, 2]);
        index.correlate_project_to_policies(10, [2]);
        assert_eq!(index.policies_for_project(10), &[2]);
        assert!(index.policies_for_project(11).is_empty());
    }

    proptest! {
        #[test]
        fn flatten_joins_names_in_input_order(ids in proptest::collection::vec(0u64..50, 0..20)) {
            let index = PolicyIndex::new((0u64..50).map(|id| policy(id, &format!("P{id}"))));
            let flat = index.flatten_policy_names(&ids).unwrap();
            let expected: Vec<String> = ids.iter().map(|id| format!("P{id}")).collect();
            prop_assert_eq!(flat, expected.join(";"));
        }
    }
}
