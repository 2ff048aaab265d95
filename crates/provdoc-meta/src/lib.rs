//! # provdoc-meta - Metadata Preamble Extraction
//!
//! Provider schema descriptions can carry a small metadata preamble ahead of
//! the human-readable text. The preamble is a delimiter-separated list of
//! key/value pairs introduced by a marker word:
//!
//! ```text
//! <delim>meta<delim>key1<delim>value1<delim>...<delim>keyN<delim>valueN<delim><description>
//! ```
//!
//! This crate splits such a blob into its metadata map and the remaining
//! description.
//!
//! ```rust
//! use provdoc_meta::{extract_description, extract_metadata};
//!
//! let full = ":meta:subcategory:mysubcategory:This is a regular description.";
//!
//! let metadata = extract_metadata(full, ":");
//! assert_eq!(metadata.get("subcategory").map(String::as_str), Some("mysubcategory"));
//! assert_eq!(extract_description(full, ":"), "This is a regular description.");
//! ```
//!
//! ## Parsing Rules
//!
//! - The delimiter is a literal string of any length; it is never treated as
//!   a pattern.
//! - Without the `<delim>meta<delim>` prefix there is no metadata and the
//!   description is the whole input.
//! - After the prefix, pairs are read while the next token is a key: a
//!   non-empty token without whitespace that is followed by a delimiter. A
//!   value runs to the next delimiter, or to the end of the input.
//! - A value never starts with whitespace. `NOTE: requires 3.5` after the
//!   pairs is prose, not the key `NOTE`.
//! - The first token that does not start a pair starts the description,
//!   which is kept verbatim, further delimiters included.
//! - A trailing key without a delimiter after it is description text.
//! - A repeated key keeps its last value.
//!
//! A description that opens with a single word, the delimiter and then
//! non-whitespace (`NOTE:see below`) still reads as a pair; the format has no
//! way to tell the two apart.
//!
//! Extraction is total: every input, including an empty string or an empty
//! delimiter, yields a result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Delimiter used when the caller does not configure one.
pub const DEFAULT_DELIMITER: &str = ":";

/// Word that introduces the metadata preamble.
pub const DEFAULT_MARKER: &str = "meta";

/// Metadata key/value pairs.
pub type Metadata = BTreeMap<String, String>;

/// The delimiter and marker that frame a metadata preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaSyntax {
    pub delimiter: String,
    pub marker: String,
}

impl MetaSyntax {
    /// Syntax with the given delimiter and the default marker.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            marker: DEFAULT_MARKER.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// The literal prefix that opens a metadata section, or `None` when the
    /// delimiter is empty and no section can exist.
    pub fn prefix(&self) -> Option<String> {
        if self.delimiter.is_empty() {
            return None;
        }
        Some(format!("{0}{1}{0}", self.delimiter, self.marker))
    }
}

impl Default for MetaSyntax {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// A blob split into its metadata and description.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub description: String,
}

impl Document {
    /// A document with no metadata.
    pub fn plain(description: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(),
            description: description.into(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }
}

/// Splits `full` into metadata and description.
pub fn split_document(full: &str, syntax: &MetaSyntax) -> Document {
    let delimiter = syntax.delimiter.as_str();
    let Some(mut rest) = syntax
        .prefix()
        .and_then(|prefix| full.strip_prefix(prefix.as_str()))
    else {
        tracing::trace!(delimiter, "no metadata section");
        return Document::plain(full);
    };

    let mut metadata = Metadata::new();
    while let Some((key, after_key)) = rest.split_once(delimiter) {
        if !is_key(key) || after_key.starts_with(char::is_whitespace) {
            break;
        }
        let (value, after_value) = after_key.split_once(delimiter).unwrap_or((after_key, ""));
        metadata.insert(key.to_string(), value.to_string());
        rest = after_value;
    }

    tracing::debug!(
        delimiter,
        keys = metadata.len(),
        description_bytes = rest.len(),
        "extracted metadata"
    );

    Document {
        metadata,
        description: rest.to_string(),
    }
}

fn is_key(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}

/// Returns the metadata pairs of `full`; empty when there is no section.
pub fn extract_metadata(full: &str, delimiter: &str) -> Metadata {
    split_document(full, &MetaSyntax::new(delimiter)).metadata
}

/// Returns `full` without its metadata section.
pub fn extract_description(full: &str, delimiter: &str) -> String {
    split_document(full, &MetaSyntax::new(delimiter)).description
}
