#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scanlytix_transform::{Policy, PolicyIndex};

#[derive(Debug, Arbitrary)]
struct Input {
    policies: Vec<(u8, String)>,
    ids: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let index = PolicyIndex::new(input.policies.into_iter().map(|(id, name)| Policy {
        policy_id: u64::from(id),
        name,
        description: None,
    }));
    let ids: Vec<u64> = input.ids.into_iter().map(u64::from).collect();

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let _ = index.flatten_policy_names(&ids);
});
