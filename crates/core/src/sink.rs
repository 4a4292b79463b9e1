//! 레코드 출력 싱크: 평탄화 레코드의 출력 추상화
//!
//! 변환 엔진은 [`RecordSink`]에 레코드를 쓰기만 하며, 저장 방식은 알지 못합니다.
//! 싱크는 여러 워커에서 동시에 호출되므로 `Send + Sync`여야 합니다.
//!
//! # 구현체
//!
//! - [`LogSink`]: 레코드를 JSON 한 줄로 `tracing` 이벤트에 기록
//! - [`MemorySink`]: 레코드를 메모리에 보관 (테스트, dry-run)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::record::FlatRecord;

/// 레코드 이벤트의 tracing target
pub const RECORD_TARGET: &str = "scanlytix::records";

/// 평탄화 레코드 출력 trait
///
/// 여러 워커가 동시에 `write`를 호출할 수 있습니다.
pub trait RecordSink: Send + Sync {
    /// 레코드 하나를 출력합니다.
    fn write(&self, record: FlatRecord);
}

/// 레코드 종류 이름으로 싱크를 만드는 팩토리
pub trait SinkFactory: Send + Sync {
    /// 레코드 종류에 맞는 싱크를 생성합니다.
    fn create(&self, record_type: &str) -> Arc<dyn RecordSink>;
}

/// tracing 기반 로그 싱크
///
/// 각 레코드를 `scanlytix::records` target의 `info` 이벤트로 기록합니다.
/// 구독자 설정으로 레코드 종류별 파일 분리가 가능합니다.
#[derive(Debug, Clone)]
pub struct LogSink {
    record_type: String,
}

impl LogSink {
    /// 레코드 종류 이름으로 싱크를 생성합니다.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
        }
    }

    /// 레코드 종류 이름을 반환합니다.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }
}

impl RecordSink for LogSink {
    fn write(&self, record: FlatRecord) {
        info!(
            target: RECORD_TARGET,
            record_type = %self.record_type,
            record = %record,
        );
    }
}

/// [`LogSink`] 팩토리
#[derive(Debug, Clone, Default)]
pub struct LogSinkFactory;

impl SinkFactory for LogSinkFactory {
    fn create(&self, record_type: &str) -> Arc<dyn RecordSink> {
        Arc::new(LogSink::new(record_type))
    }
}

/// 메모리 보관 싱크
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<FlatRecord>>,
}

impl MemorySink {
    /// 빈 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 기록된 레코드의 복사본을 반환합니다.
    pub fn records(&self) -> Vec<FlatRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// 기록된 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 기록된 레코드가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn write(&self, record: FlatRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// [`MemorySink`] 팩토리
///
/// 같은 레코드 종류에 대해서는 항상 같은 싱크를 반환합니다.
#[derive(Debug, Default)]
pub struct MemorySinkFactory {
    sinks: Mutex<HashMap<String, Arc<MemorySink>>>,
}

impl MemorySinkFactory {
    /// 새 팩토리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 종류의 싱크를 반환합니다 (생성된 적 없으면 `None`).
    pub fn sink(&self, record_type: &str) -> Option<Arc<MemorySink>> {
        self.sinks
            .lock()
            .ok()
            .and_then(|sinks| sinks.get(record_type).cloned())
    }

    /// 레코드 종류로 기록된 레코드를 반환합니다.
    pub fn records(&self, record_type: &str) -> Vec<FlatRecord> {
        self.sink(record_type)
            .map(|sink| sink.records())
            .unwrap_or_default()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create(&self, record_type: &str) -> Arc<dyn RecordSink> {
        let mut sinks = match self.sinks.lock() {
            Ok(sinks) => sinks,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sink = sinks
            .entry(record_type.to_owned())
            .or_insert_with(|| Arc::new(MemorySink::new()));
        Arc::clone(sink) as Arc<dyn RecordSink>
    }
}
