#![no_main]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use scanlytix_transform::{Project, ScanDescriptor, ScanProduct, transform_report};

fuzz_target!(|data: &[u8]| {
    let project = Project {
        project_id: 1,
        project_name: "fuzz".to_owned(),
        team_id: "t".to_owned(),
        team_name: "/CxServer".to_owned(),
        preset_id: 1,
        preset_name: "Default".to_owned(),
        policies: String::new(),
        last_scan_dates: BTreeMap::new(),
        scan_counts: BTreeMap::new(),
    };
    let at = Utc.timestamp_opt(0, 0).unwrap();
    let mut descriptor =
        ScanDescriptor::new("1", "Full", ScanProduct::Sast, at, at, Arc::new(project));

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(records) = transform_report(&mut descriptor, data) {
        // 모든 상세 레코드는 프로젝트/스캔 키를 물려받아야 한다
        for record in &records {
            assert!(record.contains_key("ProjectId"));
            assert!(record.contains_key("ScanId"));
        }
    }
});
