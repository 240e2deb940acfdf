//! Delimiter sniffing and separator configuration.

use std::fmt;

use tracing::debug;

use crate::error::IngestionError;

/// Candidate delimiters, in tie-break priority order.
pub const CANDIDATE_DELIMITERS: [char; 7] = [',', '\t', ';', '|', ':', '^', '~'];

/// Default number of records sampled by [`DelimiterDetector`].
pub const DEFAULT_SAMPLE_RECORDS: usize = 4;

/// Delimiter and quote chosen for a document.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    pub delimiter: char,
    pub quote: char,
}

impl fmt::Debug for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionResult")
            .field("delimiter", &escape_separator(self.delimiter))
            .field("quote", &self.quote)
            .finish()
    }
}

impl DetectionResult {
    /// The delimiter in its escaped configuration form, as accepted by [`parse_separator`].
    pub fn separator_config(&self) -> String {
        escape_separator(self.delimiter)
    }
}

/// Samples the first records of a document and picks the most probable delimiter.
///
/// A candidate qualifies when it appears the same, non-zero number of times (outside quoted
/// spans) in every sampled record. The most frequent qualifying candidate wins; ties go to the
/// earlier entry of [`CANDIDATE_DELIMITERS`]. With no qualifying candidate the result is a comma.
#[derive(Debug, Clone, Copy)]
pub struct DelimiterDetector {
    sample_records: usize,
    comment: Option<char>,
}

impl Default for DelimiterDetector {
    fn default() -> Self {
        Self {
            sample_records: DEFAULT_SAMPLE_RECORDS,
            comment: None,
        }
    }
}

impl DelimiterDetector {
    pub fn new(sample_records: usize) -> Self {
        Self {
            sample_records: sample_records.max(1),
            comment: None,
        }
    }

    /// Skip records starting with `comment` when sampling.
    pub fn with_comment(mut self, comment: Option<char>) -> Self {
        self.comment = comment;
        self
    }

    pub fn detect(&self, text: &str, quote: char) -> DetectionResult {
        let counts = self.sample_counts(text, quote);

        let mut best: Option<(char, usize)> = None;
        for (idx, &candidate) in CANDIDATE_DELIMITERS.iter().enumerate() {
            let Some(first) = counts.first().map(|c| c[idx]) else {
                break;
            };
            if first == 0 || counts.iter().any(|c| c[idx] != first) {
                continue;
            }
            // Strictly greater keeps the earlier candidate on ties.
            if best.is_none_or(|(_, n)| first > n) {
                best = Some((candidate, first));
            }
        }

        let delimiter = best.map_or(',', |(c, _)| c);
        debug!(
            delimiter = %escape_separator(delimiter),
            sampled = counts.len(),
            "detected delimiter"
        );
        DetectionResult { delimiter, quote }
    }

    /// Per-record candidate counts for the first non-blank records of `text`.
    ///
    /// Records end at `\n` outside quotes; a doubled quote toggles the quote state twice and so
    /// needs no special casing.
    fn sample_counts(&self, text: &str, quote: char) -> Vec<[usize; CANDIDATE_DELIMITERS.len()]> {
        let mut out = Vec::with_capacity(self.sample_records);
        let mut current = [0_usize; CANDIDATE_DELIMITERS.len()];
        let mut in_quotes = false;
        let mut blank = true;
        let mut in_comment = false;

        for c in text.chars() {
            if in_comment {
                in_comment = c != '\n';
                continue;
            }
            if blank && !in_quotes && Some(c) == self.comment {
                in_comment = true;
                continue;
            }
            if c == quote {
                in_quotes = !in_quotes;
                blank = false;
                continue;
            }
            if in_quotes {
                continue;
            }
            if c == '\n' {
                if !blank {
                    out.push(current);
                    if out.len() == self.sample_records {
                        return out;
                    }
                }
                current = [0; CANDIDATE_DELIMITERS.len()];
                blank = true;
                continue;
            }
            blank = false;
            if let Some(idx) = CANDIDATE_DELIMITERS.iter().position(|&d| d == c) {
                current[idx] += 1;
            }
        }
        if !blank {
            out.push(current);
        }
        out
    }
}

/// Settings handed to the parser.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    /// Lines starting with this byte are skipped.
    pub comment: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            comment: None,
        }
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("delimiter", &(self.delimiter as char))
            .field("quote", &(self.quote as char))
            .field("comment", &self.comment.map(|c| c as char))
            .finish()
    }
}

impl Dialect {
    /// Build a dialect from a detection result, passing the delimiter through its escaped
    /// configuration form.
    pub fn from_detection(detected: &DetectionResult) -> Result<Self, IngestionError> {
        let delimiter = parse_separator(&detected.separator_config())?;
        let quote = quote_byte(detected.quote)?;
        Ok(Self {
            delimiter,
            quote,
            comment: None,
        })
    }

    pub(crate) fn csv_reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .comment(self.comment);
        builder
    }
}

/// Escape a separator character into its configuration form (`\t` for tab, `\\` for a
/// backslash, ...). Printable characters other than quotes and backslash are returned as is.
pub fn escape_separator(c: char) -> String {
    match c {
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        '"' => "\\\"".to_string(),
        c if c.is_control() => c.escape_unicode().to_string(),
        c => c.to_string(),
    }
}

/// Parse an escaped separator configuration value into a single delimiter byte.
///
/// Accepts one literal character or one escape: `\t`, `\n`, `\r`, `\\`, `\'`, `\"`, `\xHH`,
/// `\u{...}`. The result must be ASCII.
pub fn parse_separator(value: &str) -> Result<u8, IngestionError> {
    let invalid = |message: &str| IngestionError::InvalidSeparator {
        value: value.to_owned(),
        message: message.to_owned(),
    };

    let mut chars = value.chars();
    let c = match chars.next() {
        None => return Err(invalid("separator is empty")),
        Some('\\') => {
            let escape = chars.next().ok_or_else(|| invalid("dangling escape"))?;
            match escape {
                't' => '\t',
                'n' => '\n',
                'r' => '\r',
                '\\' => '\\',
                '\'' => '\'',
                '"' => '"',
                'x' => {
                    let hex: String = chars.by_ref().take(2).collect();
                    if hex.len() != 2 {
                        return Err(invalid("\\x expects two hex digits"));
                    }
                    u8::from_str_radix(&hex, 16)
                        .map(char::from)
                        .map_err(|_| invalid("\\x expects two hex digits"))?
                }
                'u' => {
                    let rest: String = chars.by_ref().collect();
                    let digits = rest
                        .strip_prefix('{')
                        .and_then(|r| r.strip_suffix('}'))
                        .ok_or_else(|| invalid("\\u expects {hex}"))?;
                    u32::from_str_radix(digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| invalid("invalid unicode escape"))?
                }
                _ => return Err(invalid("unknown escape")),
            }
        }
        Some(c) => c,
    };

    if chars.next().is_some() {
        return Err(invalid("separator must be a single character"));
    }
    ascii_byte(c).ok_or_else(|| invalid("separator must be ASCII"))
}

/// The quote character as a byte. Only ASCII quotes are usable by the parser.
pub fn quote_byte(quote: char) -> Result<u8, IngestionError> {
    ascii_byte(quote).ok_or_else(|| IngestionError::InvalidSeparator {
        value: quote.to_string(),
        message: "quote must be a single ASCII character".to_string(),
    })
}

fn ascii_byte(c: char) -> Option<u8> {
    if c.is_ascii() { Some(c as u8) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> char {
        DelimiterDetector::default().detect(text, '"').delimiter
    }

    #[test]
    fn detects_common_delimiters() {
        assert_eq!(detect("a,b,c\n1,2,3\n"), ',');
        assert_eq!(detect("a\tb\tc\n1\t2\t3\n"), '\t');
        assert_eq!(detect("a;b\n1;2\n"), ';');
        assert_eq!(detect("a|b|c\n1|2|3\n"), '|');
    }

    #[test]
    fn ignores_delimiters_inside_quotes() {
        let text = "name;note\n\"Smith, J\";\"a, b, c\"\nDoe;x\n";
        assert_eq!(detect(text), ';');
    }

    #[test]
    fn quoted_newline_does_not_split_a_record() {
        let text = "a|b\n\"multi\nline\"|2\nx|y\n";
        assert_eq!(detect(text), '|');
    }

    #[test]
    fn most_frequent_consistent_candidate_wins() {
        // Two colons per record beat one semicolon per record.
        assert_eq!(detect("a:b:c;d\n1:2:3;4\n"), ':');
    }

    #[test]
    fn tie_goes_to_priority_order() {
        assert_eq!(detect("a,b;c\n1,2;3\n"), ',');
        assert_eq!(detect("a;b\tc\n1;2\t3\n"), '\t');
    }

    #[test]
    fn inconsistent_input_falls_back_to_comma() {
        assert_eq!(detect("a;b\n1;2;3\nfoo\n"), ',');
        assert_eq!(detect(""), ',');
    }

    #[test]
    fn only_sampled_records_count() {
        let mut text = String::from("a;b\n1;2\n3;4\n5;6\n");
        text.push_str("7;8;9;10\n");
        assert_eq!(DelimiterDetector::new(4).detect(&text, '"').delimiter, ';');
        assert_eq!(DelimiterDetector::new(5).detect(&text, '"').delimiter, ',');
    }

    #[test]
    fn blank_lines_are_not_sampled() {
        assert_eq!(detect("a;b\n\n1;2\n\n"), ';');
    }

    #[test]
    fn comment_lines_are_not_sampled() {
        let text = "# exported: a, b, c\na;b\n1;2\n";
        let detector = DelimiterDetector::default().with_comment(Some('#'));
        assert_eq!(detector.detect(text, '"').delimiter, ';');
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "x|y,z\n1|2,3\n";
        let first = DelimiterDetector::default().detect(text, '"');
        for _ in 0..10 {
            assert_eq!(DelimiterDetector::default().detect(text, '"'), first);
        }
    }

    #[test]
    fn separator_escape_round_trips_candidates() {
        for c in CANDIDATE_DELIMITERS {
            assert_eq!(parse_separator(&escape_separator(c)).unwrap(), c as u8);
        }
        assert_eq!(escape_separator('\t'), "\\t");
    }

    #[test]
    fn parse_separator_accepts_escapes() {
        assert_eq!(parse_separator(",").unwrap(), b',');
        assert_eq!(parse_separator("\\t").unwrap(), b'\t');
        assert_eq!(parse_separator("\\x1f").unwrap(), 0x1f);
        assert_eq!(parse_separator("\\u{7c}").unwrap(), b'|');
    }

    #[test]
    fn parse_separator_rejects_bad_values() {
        for bad in ["", ",,", "\\", "\\q", "é", "\\xZZ"] {
            let err = parse_separator(bad).unwrap_err();
            assert!(matches!(err, IngestionError::InvalidSeparator { .. }), "{bad:?}");
        }
    }

    #[test]
    fn dialect_from_detection() {
        let d = Dialect::from_detection(&DetectionResult {
            delimiter: '\t',
            quote: '"',
        })
        .unwrap();
        assert_eq!(d.delimiter, b'\t');
        assert_eq!(d.quote, b'"');
        assert_eq!(d.comment, None);
    }
}
