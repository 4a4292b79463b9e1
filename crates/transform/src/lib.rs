#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`TransformError`)
//! - [`config`]: Sweep configuration (`SweepConfig`, builder)
//! - [`types`]: Collaborator record types (`Preset`, `Team`, `ProjectRecord`, `SastScan`, ...)
//! - [`source`]: Remote data source abstraction (`ScanDataSource`, `cancellable`)
//! - [`index`]: Metadata and policy indexes (`MetadataIndex`, `PolicyIndex`)
//! - [`product`]: Closed dispatch set (`ScanProduct`)
//! - [`resolver`]: Project/scan resolution and persisted state (`ProjectResolver`, `ScanResolver`, `ResolverState`)
//! - [`descriptor`]: Per-scan unit of work (`ScanDescriptor`, `ScanState`)
//! - [`violation`]: Policy violations and the per-project lookup cache
//! - [`report`]: Streaming SAST XML report transformer
//! - [`emit`]: Record builders, sinks and per-scan batches
//! - [`sweep`]: Bootstrap and bounded worker pool (`Transformer`, `run_transform`)

pub mod config;
pub mod descriptor;
pub mod emit;
pub mod error;
pub mod index;
pub mod product;
pub mod report;
pub mod resolver;
pub mod source;
pub mod sweep;
pub mod types;
pub mod violation;

// --- Public API Re-exports ---

// Sweep (main orchestrator)
pub use sweep::{SweepSummary, Transformer, run_transform};

// Configuration
pub use config::{SweepConfig, SweepConfigBuilder};

// Error
pub use error::TransformError;

// Source
pub use source::{ScanDataSource, cancellable};

// Types
pub use types::{Policy, PolicyViolationRule, Preset, ProjectRecord, SastScan, ScaScan, Team};

// Resolution
pub use descriptor::{ReportMetadata, ScanDescriptor, ScanState, ViolationCounts};
pub use index::{MetadataIndex, PolicyIndex};
pub use product::ScanProduct;
pub use resolver::{Project, ProjectResolver, Resolution, ResolverState, ScanResolver};

// Output
pub use emit::{DATE_FORMAT, RecordBatch, RecordKind, Sinks, format_date};
pub use report::transform_report;
pub use violation::{ViolatedPolicyCollection, ViolationCache};
