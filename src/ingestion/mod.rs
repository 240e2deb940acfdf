//! Discovery entrypoints and pipeline stages.
//!
//! Most callers should use [`crate::host::Plugin`] or [`discover_from_url`] (from [`unified`]),
//! which:
//!
//! - fetches the resource with a hard byte cap ([`fetch`], [`normalize`])
//! - detects the delimiter unless one is configured ([`dialect`])
//! - parses records ([`csv`]), validates the header ([`header`])
//! - infers column types ([`infer`]) and materializes rows ([`rows`])
//! - optionally reports diagnostics/alerts to an [`IngestionObserver`]

pub mod csv;
pub mod dialect;
pub mod fetch;
pub mod header;
pub mod infer;
pub mod normalize;
pub mod observability;
pub mod rows;
pub mod unified;

pub use dialect::{DelimiterDetector, DetectionResult, Dialect};
pub use fetch::FetchOptions;
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use unified::{
    DEFAULT_TABLE_NAME, Discovery, IngestionOptions, discover_from_reader, discover_from_text, discover_from_url,
    severity_for_error,
};
