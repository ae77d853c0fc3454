//! # Error Types
//!
//! Structured errors for record construction and code-list loading.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Validation errors always name the offending field and the raw value.
//! - Code-list errors name the field list and the code that drifted.
//! - Resolution misses are not errors; see [`crate::jurisdiction`].

use std::path::PathBuf;

use thiserror::Error;

/// Failure to construct a policy, target, or jurisdiction from source data.
///
/// Fatal for the offending record. Bad codes indicate bad source data that
/// must be fixed upstream, so nothing is coerced or dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The code is not a declared symbolic name for the field.
    #[error("{field}: unknown code {value:?}")]
    UnknownCode {
        /// Field the code was assigned to.
        field: &'static str,
        /// The raw code.
        value: String,
    },

    /// The code is declared but not enabled by the loaded code list.
    #[error("{field}: code {value:?} is not in the loaded code list")]
    DisabledCode {
        /// Field the code was assigned to.
        field: &'static str,
        /// The raw code.
        value: String,
    },

    /// A required field is missing or blank.
    #[error("{field}: required value is missing")]
    Missing {
        /// The missing field.
        field: String,
    },

    /// A field holds a value of the wrong type.
    #[error("{field}: expected {expected}, got {value}")]
    WrongType {
        /// The offending field.
        field: String,
        /// Description of the expected type.
        expected: &'static str,
        /// Rendering of the value found.
        value: String,
    },

    /// A numeric field is NaN or infinite.
    #[error("{field}: number must be finite, got {value}")]
    NonFinite {
        /// The offending field.
        field: &'static str,
        /// The rejected number.
        value: f64,
    },

    /// A range whose low bound exceeds its high bound.
    #[error("range: low bound {low} exceeds high bound {high}")]
    InvertedRange {
        /// Low bound.
        low: f64,
        /// High bound.
        high: f64,
    },

    /// Malformed identifier such as an alpha-3 code.
    #[error("{field}: invalid value {value:?}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// The raw value.
        value: String,
    },

    /// A jurisdiction name could not be resolved under strict resolution.
    #[error("coverage: jurisdiction {name:?} could not be resolved")]
    UnresolvedJurisdiction {
        /// The unresolved name.
        name: String,
    },
}

impl ValidationError {
    /// Build a [`ValidationError::Missing`] for `field`.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    /// Build a [`ValidationError::WrongType`] for `field`.
    pub fn wrong_type(
        field: impl Into<String>,
        expected: &'static str,
        value: impl std::fmt::Display,
    ) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }
}

/// Failure to load or validate the external code lists.
#[derive(Error, Debug)]
pub enum CodeListError {
    /// The code-list file could not be read.
    #[error("failed to read code lists from {}: {source}", path.display())]
    Read {
        /// Path of the code-list file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The code-list document is not valid YAML of the expected shape.
    #[error("failed to parse code lists: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required field list is absent.
    #[error("code lists are missing the {0:?} list")]
    MissingList(&'static str),

    /// A listed code has no declared counterpart.
    #[error("code list {list:?} names undeclared code {code:?}")]
    UnknownCode {
        /// The field list.
        list: &'static str,
        /// The drifted code.
        code: String,
    },

    /// A code appears twice in one list.
    #[error("code list {list:?} repeats code {code:?}")]
    DuplicateCode {
        /// The field list.
        list: &'static str,
        /// The repeated code.
        code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_code_names_field_and_value() {
        let err = ValidationError::UnknownCode {
            field: "sector",
            value: "SPACE".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sector"));
        assert!(msg.contains("SPACE"));
    }

    #[test]
    fn wrong_type_display() {
        let err = ValidationError::wrong_type("End year", "integer", "soon");
        assert_eq!(err.to_string(), "End year: expected integer, got soon");
    }

    #[test]
    fn inverted_range_display() {
        let err = ValidationError::InvertedRange {
            low: 5.0,
            high: 1.0,
        };
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn code_list_read_error_mentions_path() {
        let err = CodeListError::Read {
            path: PathBuf::from("structure.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("structure.yaml"));
    }
}
