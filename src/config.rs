//! Connection configuration.
//!
//! Loaded from TOML and validated before any discovery runs:
//!
//! ```toml
//! dataURL = "https://example.com/data.csv"
//! separator = "\\t"      # optional; overrides delimiter detection
//! comment = "#"          # optional; lines starting with it are skipped
//! header = true          # optional; false means the first record is data
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::ingestion::dialect::parse_separator;
use crate::ingestion::fetch::{DEFAULT_MAX_TOTAL_BYTES, DEFAULT_READ_CHUNK_BYTES, FetchOptions};

/// Typed connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Absolute `http`/`https` URL of the delimited-text resource.
    #[serde(rename = "dataURL")]
    pub data_url: String,

    /// Escaped single-character separator (`","`, `"\\t"`, `"|"`). Detection is skipped when set.
    #[serde(default)]
    pub separator: Option<String>,

    /// Single ASCII character marking comment lines.
    #[serde(default)]
    pub comment: Option<String>,

    /// Whether the first record holds column names.
    #[serde(default = "default_header")]
    pub header: bool,

    /// Discard all rows when the header has empty or duplicate names.
    #[serde(default)]
    pub strict_header: bool,

    /// Override of the fetch byte cap.
    #[serde(default)]
    pub max_total_bytes: Option<usize>,

    /// Override of the per-read chunk size.
    #[serde(default)]
    pub read_chunk_bytes: Option<usize>,
}

fn default_header() -> bool {
    true
}

impl ConnectionConfig {
    /// A configuration with defaults for everything but the URL. Not validated.
    pub fn new(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
            separator: None,
            comment: None,
            header: true,
            strict_header: false,
            max_total_bytes: None,
            read_chunk_bytes: None,
        }
    }

    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ConnectionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field. Called by the loaders; call it yourself on hand-built values.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.data_url).map_err(|e| ConfigError::Invalid {
            field: "dataURL",
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "dataURL",
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if let Some(sep) = &self.separator {
            parse_separator(sep).map_err(|e| ConfigError::Invalid {
                field: "separator",
                message: e.to_string(),
            })?;
        }
        self.comment_byte()?;

        for (field, value) in [
            ("max_total_bytes", self.max_total_bytes),
            ("read_chunk_bytes", self.read_chunk_bytes),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The separator override as a delimiter byte, if configured and valid.
    pub fn separator_byte(&self) -> Option<u8> {
        self.separator.as_deref().and_then(|s| parse_separator(s).ok())
    }

    /// The comment character as a byte. An empty string means no comment character.
    pub fn comment_byte(&self) -> ConfigResult<Option<u8>> {
        match self.comment.as_deref() {
            None | Some("") => Ok(None),
            Some(c) if c.len() == 1 && c.is_ascii() => Ok(Some(c.as_bytes()[0])),
            Some(c) => Err(ConfigError::Invalid {
                field: "comment",
                message: format!("expected a single ASCII character, got {c:?}"),
            }),
        }
    }

    /// Fetch limits, with defaults for anything not overridden.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_total_bytes: self.max_total_bytes.unwrap_or(DEFAULT_MAX_TOTAL_BYTES),
            read_chunk_bytes: self.read_chunk_bytes.unwrap_or(DEFAULT_READ_CHUNK_BYTES),
        }
    }
}
