//! `url-table` discovers a typed table from a delimited-text resource served over HTTP.
//!
//! Discovery happens once per registration and never fails: the resource is fetched with a hard
//! byte cap, its delimiter is sniffed, the text is parsed, the header validated, each column's
//! type inferred, and the rows captured for replay. Whatever goes wrong is kept as a diagnostic;
//! the worst outcome is an empty table.
//!
//! The primary entrypoint is [`host::Plugin`], built from a validated
//! [`config::ConnectionConfig`]. The pipeline stages are also usable on their own from
//! [`ingestion`].
//!
//! ## Inferred types
//!
//! Each column gets one [`types::ColumnType`], decided in priority order:
//!
//! - [`types::ColumnType::Date`]: every value contains `YYYY-MM-DD` or `MM/DD/YYYY`
//! - [`types::ColumnType::Integer`]: every value is an integer literal (decimal, `0x`, `0o`, `0b`)
//! - [`types::ColumnType::Numeric`]: every value is a floating-point literal
//! - [`types::ColumnType::String`]: anything else, and columns without values
//!
//! Cells stay strings in [`types::Row`]; [`host::HostValue`] converts them for the host.
//!
//! ## Quick example: discover from text
//!
//! ```rust
//! use url_table::ingestion::{discover_from_text, IngestionOptions};
//! use url_table::types::ColumnType;
//!
//! let text = "city;population\nLyon;522250\nNantes;320732\n";
//! let discovery = discover_from_text(text, &IngestionOptions::default());
//!
//! assert_eq!(discovery.dialect.delimiter, b';');
//! assert_eq!(discovery.schema.columns[1].column_type, ColumnType::Integer);
//! assert_eq!(discovery.schema.rows[0].get("city"), Some("Lyon"));
//! assert!(discovery.is_clean());
//! ```
//!
//! ## Registering a connection
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use url_table::config::ConnectionConfig;
//! use url_table::host::Plugin;
//! use url_table::ingestion::{IngestionSeverity, TracingObserver};
//!
//! # fn main() -> Result<(), url_table::ConfigError> {
//! let config = ConnectionConfig::from_toml_str(r#"dataURL = "https://example.com/data.csv""#)?;
//! let plugin = Plugin::new(config)?
//!     .with_observer(Arc::new(TracingObserver), IngestionSeverity::Error);
//! for (name, table) in plugin.tables() {
//!     println!("{name}: {} columns, {} rows", table.columns().len(), table.row_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: fetch, detection, parsing, validation, inference, materialization
//! - [`host`]: column definitions, value conversion, table registration
//! - [`config`]: typed connection configuration
//! - [`types`]: documents, records, columns, rows
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod host;
pub mod ingestion;
pub mod types;

pub use error::{ConfigError, ConfigResult, DiagnosticKind, HeaderViolation, IngestionError};
