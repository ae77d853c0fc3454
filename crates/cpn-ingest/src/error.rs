//! # Ingest Error Types
//!
//! Record failures carry the feed kind, the feed file, and the zero-based
//! record index so the offending row can be found upstream.

use std::path::PathBuf;

use cpn_core::{CodeListError, ValidationError};
use cpn_store::StoreError;
use thiserror::Error;

use crate::feeds::FeedKind;

/// Errors from loading configuration or feeds, or from running the pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A feed file could not be read.
    #[error("failed to read feed {}: {source}", path.display())]
    Read {
        /// Feed file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A feed file is not valid YAML.
    #[error("failed to parse feed {}: {source}", path.display())]
    Parse {
        /// Feed file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The feed document is not a sequence.
    #[error("feed {} must be a sequence of records", path.display())]
    NotASequence {
        /// Feed file.
        path: PathBuf,
    },

    /// An item of the feed sequence is not a mapping.
    #[error("feed {}: record {index} is not a mapping", path.display())]
    NotAMapping {
        /// Feed file.
        path: PathBuf,
        /// Zero-based record index.
        index: usize,
    },

    /// A record failed validation.
    #[error("{kind} feed {}: record {index}: {source}", path.display())]
    Record {
        /// Feed kind.
        kind: FeedKind,
        /// Feed file.
        path: PathBuf,
        /// Zero-based record index.
        index: usize,
        /// What was wrong with the record.
        #[source]
        source: ValidationError,
    },

    /// A mapped record could not be written.
    #[error("{kind} feed {}: record {index}: {source}", path.display())]
    Store {
        /// Feed kind.
        kind: FeedKind,
        /// Feed file.
        path: PathBuf,
        /// Zero-based record index.
        index: usize,
        /// The sink failure.
        #[source]
        source: StoreError,
    },

    /// The run configuration could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        /// Config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The run configuration is malformed.
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        /// Config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A configured jurisdiction alias points at no known country.
    #[error("invalid jurisdiction alias: {0}")]
    Alias(#[source] ValidationError),

    /// The code lists could not be loaded.
    #[error(transparent)]
    Codes(#[from] CodeListError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_locates_the_row() {
        let err = IngestError::Record {
            kind: FeedKind::CdLinks,
            path: PathBuf::from("feeds/cd-links.yaml"),
            index: 4,
            source: ValidationError::missing("Variable"),
        };
        assert_eq!(
            err.to_string(),
            "cd-links feed feeds/cd-links.yaml: record 4: Variable: required value is missing"
        );
    }

    #[test]
    fn code_list_errors_are_transparent() {
        let err: IngestError = CodeListError::MissingList("sector").into();
        assert_eq!(err.to_string(), "code lists are missing the \"sector\" list");
    }
}
