//! # Record Model
//!
//! The canonical in-memory representation of a climate policy and its
//! nested targets and jurisdictions.
//!
//! ## Validation
//!
//! Every value is validated when it is assigned. Enumerated fields go
//! through the [`CodeRegistry`]; an unrecognized code is a
//! [`ValidationError`], never silently dropped. Fields are private and only
//! reachable through validating constructors, so a built [`Policy`] is
//! always valid.
//!
//! ## Defaults
//!
//! Sequences (`sector`, `instrument`, `coverage`) default to empty and
//! `targets` to an empty mapping. Empty and absent values are omitted from
//! canonical output.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::codes::{CodeRegistry, ImplementationState, Instrument, Sector};
use crate::error::ValidationError;
use crate::jurisdiction::Jurisdiction;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The quantitative value of a target: one number or a closed range.
///
/// A target carries at most one measurement, so "both value and range" is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// A single value.
    Scalar(f64),
    /// A `(low, high)` range with `low <= high`.
    Range {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl Measurement {
    /// A single finite value.
    pub fn scalar(value: f64) -> Result<Self, ValidationError> {
        finite("value", value)?;
        Ok(Self::Scalar(value))
    }

    /// A finite range with `low <= high`.
    pub fn range(low: f64, high: f64) -> Result<Self, ValidationError> {
        finite("range", low)?;
        finite("range", high)?;
        if low > high {
            return Err(ValidationError::InvertedRange { low, high });
        }
        Ok(Self::Range { low, high })
    }

    /// The scalar value, if this is a scalar.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Range { .. } => None,
        }
    }

    /// The `(low, high)` pair, if this is a range.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Scalar(_) => None,
            Self::Range { low, high } => Some((*low, *high)),
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

/// A quantitative expression of a policy's goal.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    quantity: String,
    unit: String,
    measurement: Option<Measurement>,
    year: Option<i32>,
    reference_year: Option<i32>,
}

impl Target {
    /// Create a target for `quantity` measured in `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Missing`] if either string is blank.
    pub fn new(quantity: impl Into<String>, unit: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            quantity: required("quantity", quantity.into())?,
            unit: required("unit", unit.into())?,
            measurement: None,
            year: None,
            reference_year: None,
        })
    }

    /// Set a single value, replacing any previous measurement.
    pub fn with_value(mut self, value: f64) -> Result<Self, ValidationError> {
        self.measurement = Some(Measurement::scalar(value)?);
        Ok(self)
    }

    /// Set a range, replacing any previous measurement.
    pub fn with_range(mut self, low: f64, high: f64) -> Result<Self, ValidationError> {
        self.measurement = Some(Measurement::range(low, high)?);
        Ok(self)
    }

    /// Set the measurement directly.
    pub fn with_measurement(mut self, measurement: Option<Measurement>) -> Self {
        self.measurement = measurement;
        self
    }

    /// Set the target year.
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Set the reference (baseline) year.
    pub fn with_reference_year(mut self, year: Option<i32>) -> Self {
        self.reference_year = year;
        self
    }

    /// What is measured.
    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    /// Unit of the measurement.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The measurement, if any.
    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    /// Target date.
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Baseline date.
    pub fn reference_year(&self) -> Option<i32> {
        self.reference_year
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Provenance of a policy record: a URL or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A web address, kept exactly as written.
    Url {
        /// The trimmed text from the source record.
        raw: String,
        /// The parsed address.
        url: Url,
    },
    /// Any other citation text.
    Text(String),
}

impl Source {
    /// Classify `raw` as a URL or text. Blank input yields `None`.
    ///
    /// Only whitespace-free `http`, `https`, and `ftp` strings are treated
    /// as URLs, so citation text with a leading `Note:` is kept verbatim.
    /// Parsing only classifies; the text itself is never normalized.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.contains(char::is_whitespace) {
            if let Ok(url) = Url::parse(trimmed) {
                if matches!(url.scheme(), "http" | "https" | "ftp") {
                    return Some(Self::Url {
                        raw: trimmed.to_string(),
                        url,
                    });
                }
            }
        }
        Some(Self::Text(trimmed.to_string()))
    }

    /// The parsed address, for URL sources.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Url { url, .. } => Some(url),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { raw, .. } => f.write_str(raw),
            Self::Text(text) => f.write_str(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// One governmental or organizational climate policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Policy {
    name: Option<String>,
    sector: Vec<Sector>,
    instrument: Vec<Instrument>,
    state: Option<ImplementationState>,
    coverage: Vec<Jurisdiction>,
    description: Option<String>,
    targets: BTreeMap<String, Target>,
    source: Option<Source>,
}

impl Policy {
    /// Start building a policy validated against `registry`.
    pub fn builder(registry: &CodeRegistry) -> PolicyBuilder<'_> {
        PolicyBuilder {
            registry,
            policy: Policy::default(),
        }
    }

    /// Official name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sectors, in source order.
    pub fn sector(&self) -> &[Sector] {
        &self.sector
    }

    /// Instruments, in source order.
    pub fn instrument(&self) -> &[Instrument] {
        &self.instrument
    }

    /// Implementation state.
    pub fn state(&self) -> Option<ImplementationState> {
        self.state
    }

    /// Jurisdictions covered, in source order.
    pub fn coverage(&self) -> &[Jurisdiction] {
        &self.coverage
    }

    /// Free-text description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Targets keyed by label, sorted by label.
    pub fn targets(&self) -> &BTreeMap<String, Target> {
        &self.targets
    }

    /// Provenance.
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }
}

/// Assembles a [`Policy`] from one source row.
///
/// Every setter validates; the first failure aborts the record.
#[derive(Debug)]
pub struct PolicyBuilder<'r> {
    registry: &'r CodeRegistry,
    policy: Policy,
}

impl<'r> PolicyBuilder<'r> {
    /// Set the name. Blank names are treated as absent.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.policy.name = optional(name.into());
        self
    }

    /// Set the description. Blank descriptions are treated as absent.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.policy.description = optional(description.into());
        self
    }

    /// Set the source from raw text or a URL.
    pub fn source(mut self, source: &str) -> Self {
        self.policy.source = Source::parse(source);
        self
    }

    /// Append one sector code.
    pub fn sector(mut self, code: &str) -> Result<Self, ValidationError> {
        self.policy.sector.push(self.registry.sector(code)?);
        Ok(self)
    }

    /// Append several sector codes, in order.
    pub fn sectors<'a>(
        mut self,
        codes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ValidationError> {
        let parsed = self.registry.sectors(codes)?;
        self.policy.sector.extend(parsed);
        Ok(self)
    }

    /// Append an already-typed sector, checking it is enabled.
    pub fn sector_code(mut self, code: Sector) -> Result<Self, ValidationError> {
        if !self.registry.allows_sector(code) {
            return Err(ValidationError::DisabledCode {
                field: "sector",
                value: code.to_string(),
            });
        }
        self.policy.sector.push(code);
        Ok(self)
    }

    /// Append one instrument code.
    pub fn instrument(mut self, code: &str) -> Result<Self, ValidationError> {
        self.policy.instrument.push(self.registry.instrument(code)?);
        Ok(self)
    }

    /// Append several instrument codes, in order.
    pub fn instruments<'a>(
        mut self,
        codes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ValidationError> {
        let parsed = self.registry.instruments(codes)?;
        self.policy.instrument.extend(parsed);
        Ok(self)
    }

    /// Append an already-typed instrument, checking it is enabled.
    pub fn instrument_code(mut self, code: Instrument) -> Result<Self, ValidationError> {
        if !self.registry.allows_instrument(code) {
            return Err(ValidationError::DisabledCode {
                field: "instrument",
                value: code.to_string(),
            });
        }
        self.policy.instrument.push(code);
        Ok(self)
    }

    /// Set the implementation state from its code.
    pub fn state(mut self, code: &str) -> Result<Self, ValidationError> {
        self.policy.state = Some(self.registry.state(code)?);
        Ok(self)
    }

    /// Set an already-typed implementation state, checking it is enabled.
    pub fn state_code(mut self, code: ImplementationState) -> Result<Self, ValidationError> {
        if !self.registry.allows_state(code) {
            return Err(ValidationError::DisabledCode {
                field: "state",
                value: code.to_string(),
            });
        }
        self.policy.state = Some(code);
        Ok(self)
    }

    /// Append a covered jurisdiction.
    pub fn jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.policy.coverage.push(jurisdiction);
        self
    }

    /// Add a target under `label`.
    ///
    /// # Errors
    ///
    /// Labels must be non-blank and unique within the policy.
    pub fn target(mut self, label: &str, target: Target) -> Result<Self, ValidationError> {
        let label = required("targets", label.to_string())?;
        if self.policy.targets.contains_key(&label) {
            return Err(ValidationError::Invalid {
                field: "targets",
                value: format!("duplicate label {label:?}"),
            });
        }
        self.policy.targets.insert(label, target);
        Ok(self)
    }

    /// Finish the policy.
    pub fn build(self) -> Policy {
        self.policy
    }
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
