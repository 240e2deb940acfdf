//! Bounded streaming fetch.
//!
//! [`fetch_url`] issues one GET and hands the response body to [`read_bounded`], which pulls it
//! in chunks, normalizes it through [`TextNormalizer`] and stops at a hard byte cap. Nothing in
//! here returns an error to the caller: failures come back next to whatever text was read.

use std::io::{ErrorKind, Read};

use reqwest::blocking::Client;
use tracing::{debug, error, warn};

use crate::error::IngestionError;
use crate::types::RawDocument;

use super::normalize::TextNormalizer;

/// Default hard cap on raw bytes read from the source (20 MB).
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 20_000_000;
/// Default size of a single read (1 MB).
pub const DEFAULT_READ_CHUNK_BYTES: usize = 1_000_000;

/// Limits for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Stop reading once this many raw bytes have been read.
    pub max_total_bytes: usize,
    /// Upper bound for a single read call.
    pub read_chunk_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
        }
    }
}

/// Fetch `url` and read its body with [`read_bounded`].
///
/// A failed request or a non-success status yields an empty document plus the error.
pub fn fetch_url(
    client: &Client,
    url: &str,
    options: &FetchOptions,
) -> (RawDocument, Vec<IngestionError>) {
    debug!(%url, "fetching");
    let response = match client.get(url).send() {
        Ok(r) => r,
        Err(e) => {
            error!(%url, error = %e, "request failed");
            return (RawDocument::empty(), vec![IngestionError::Http(e)]);
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "non-success status");
        return (
            RawDocument::empty(),
            vec![IngestionError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            }],
        );
    }

    let (doc, err) = read_bounded(response, options);
    debug!(
        %url,
        bytes = doc.bytes_read,
        complete = doc.complete,
        "fetched"
    );
    (doc, err.into_iter().collect())
}

/// Read `source` into a [`RawDocument`], stopping at EOF, at `max_total_bytes`, or at the first
/// read error.
///
/// When reading stops before EOF the text is cut back to its last complete line, so a parser
/// never sees a partial trailing record.
pub fn read_bounded<R: Read>(
    mut source: R,
    options: &FetchOptions,
) -> (RawDocument, Option<IngestionError>) {
    let max_total = options.max_total_bytes;
    let mut buf = vec![0_u8; options.read_chunk_bytes.clamp(1, max_total.max(1))];
    let mut normalizer = TextNormalizer::new();
    let mut text = String::new();
    let mut total: usize = 0;
    let mut complete = false;
    let mut failure = None;

    while total < max_total {
        let want = buf.len().min(max_total - total);
        match source.read(&mut buf[..want]) {
            Ok(0) => {
                complete = true;
                break;
            }
            Ok(n) => {
                total += n;
                normalizer.push(&buf[..n], &mut text);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(bytes = total, error = %e, "read failed; keeping partial data");
                failure = Some(IngestionError::Io(e));
                break;
            }
        }
    }

    if failure.is_none() && !complete {
        complete = source_exhausted(&mut source);
    }

    normalizer.finish(&mut text);
    if !complete {
        if failure.is_none() {
            warn!(cap = max_total, "byte cap reached; truncating to last complete line");
        }
        truncate_to_last_line(&mut text);
    }

    let doc = RawDocument {
        text,
        complete,
        bytes_read: total as u64,
    };
    (doc, failure)
}

/// Probe whether a source that filled the cap exactly has anything left.
fn source_exhausted<R: Read>(source: &mut R) -> bool {
    let mut probe = [0_u8; 1];
    loop {
        match source.read(&mut probe) {
            Ok(0) => return true,
            Ok(_) => return false,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return false,
        }
    }
}

/// Drop everything after the last `\n`. Text without any line terminator becomes empty.
pub fn truncate_to_last_line(text: &mut String) {
    match text.rfind('\n') {
        Some(idx) => text.truncate(idx + 1),
        None => text.clear(),
    }
}
