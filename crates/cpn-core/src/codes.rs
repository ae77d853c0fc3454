//! # Code Registry
//!
//! The finite enumerations used to validate policy fields: [`Sector`],
//! [`Instrument`], and [`ImplementationState`].
//!
//! Each enumeration is declared statically. The external code-list file
//! (`structure.yaml`) does not create codes; it selects which declared codes
//! are enabled for a run. Every listed code is checked against the
//! declaration when the file is loaded, so drift between the file and the
//! binary is reported at startup rather than at the first record that uses
//! the drifted code.
//!
//! The registry is built once per process and is immutable afterwards.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CodeListError, ValidationError};

/// A statically declared code enumeration.
pub trait Code: FromStr<Err = ValidationError> + Copy + Ord + fmt::Display {
    /// Policy field the code is assigned to.
    const FIELD: &'static str;
    /// Key of the code list in the code-list document.
    const LIST: &'static str;
}

/// Declares a code enumeration with its symbolic names.
///
/// Generates `ALL`, the [`Code`] impl, `as_str()`, `Display`, `FromStr`, and serde
/// impls that route through `FromStr` so unknown names are rejected at
/// deserialization time.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal, list = $list:literal {
            $($(#[$vmeta:meta])* $variant:ident => $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl Code for $name {
            const FIELD: &'static str = $field;
            const LIST: &'static str = $list;
        }

        impl $name {
            /// Every declared code, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant,)+];

            /// The symbolic name of this code.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($code => Ok(Self::$variant),)+
                    other => Err(ValidationError::UnknownCode {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

code_enum! {
    /// Economic sector a policy addresses.
    Sector, field = "sector", list = "sector" {
        /// Economy-wide or cross-cutting.
        General => "GENERAL",
        /// Energy supply as a whole.
        Energy => "ENERGY",
        /// Electricity and heat generation.
        Electricity => "ELECTRICITY",
        /// Road, rail, aviation, shipping.
        Transport => "TRANSPORT",
        /// Residential and commercial buildings.
        Buildings => "BUILDINGS",
        /// Industrial processes and energy use.
        Industry => "INDUSTRY",
        /// Agriculture.
        Agriculture => "AGRICULTURE",
        /// Forestry.
        Forestry => "FORESTRY",
        /// Land use and land-use change.
        LandUse => "LAND_USE",
        /// Waste management.
        Waste => "WASTE",
        /// Fluorinated gases.
        FGases => "F_GASES",
    }
}

code_enum! {
    /// Type of policy instrument.
    Instrument, field = "instrument", list = "instrument" {
        /// Quantified target.
        Target => "TARGET",
        /// Regulatory instrument: codes, standards, obligations.
        Regulation => "REGULATION",
        /// Economic instrument: prices, trading schemes.
        Economic => "ECONOMIC",
        /// Fiscal or financial incentive.
        Fiscal => "FISCAL",
        /// Information and education.
        Information => "INFORMATION",
        /// Research, development and deployment.
        Research => "RESEARCH",
        /// Voluntary approach.
        Voluntary => "VOLUNTARY",
        /// Strategic planning and policy support.
        Planning => "PLANNING",
        /// Public investment.
        PublicInvestment => "PUBLIC_INVESTMENT",
    }
}

code_enum! {
    /// Implementation state of a policy.
    ImplementationState, field = "state", list = "implementation state" {
        /// Announced or planned.
        Planned => "PLANNED",
        /// Drafted, not adopted.
        Draft => "DRAFT",
        /// Adopted and in force.
        InForce => "IN_FORCE",
        /// Under review.
        UnderReview => "UNDER_REVIEW",
        /// Superseded by another policy.
        Superseded => "SUPERSEDED",
        /// Ended.
        Ended => "ENDED",
    }
}

/// The external code-list document.
///
/// A mapping from field name to an ordered list of symbolic code names, as
/// found in `structure.yaml`:
///
/// ```yaml
/// sector: [ENERGY, TRANSPORT]
/// instrument: [REGULATION]
/// implementation state: [IN_FORCE, ENDED]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeLists {
    /// Enabled sector codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Vec<String>>,
    /// Enabled instrument codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<Vec<String>>,
    /// Enabled implementation-state codes.
    #[serde(
        rename = "implementation state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub implementation_state: Option<Vec<String>>,
}

impl CodeLists {
    /// Parse a code-list document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, CodeListError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// The set of codes enabled for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRegistry {
    sectors: Vec<Sector>,
    instruments: Vec<Instrument>,
    states: Vec<ImplementationState>,
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CodeRegistry {
    /// Registry with every declared code enabled.
    pub fn builtin() -> Self {
        Self {
            sectors: Sector::ALL.to_vec(),
            instruments: Instrument::ALL.to_vec(),
            states: ImplementationState::ALL.to_vec(),
        }
    }

    /// Build a registry from loaded code lists.
    ///
    /// # Errors
    ///
    /// - [`CodeListError::MissingList`] if a field list is absent.
    /// - [`CodeListError::UnknownCode`] if a listed code is not declared.
    /// - [`CodeListError::DuplicateCode`] if a list repeats a code.
    pub fn from_code_lists(lists: &CodeLists) -> Result<Self, CodeListError> {
        let registry = Self {
            sectors: enable(lists.sector.as_deref())?,
            instruments: enable(lists.instrument.as_deref())?,
            states: enable(lists.implementation_state.as_deref())?,
        };
        tracing::debug!(
            sectors = registry.sectors.len(),
            instruments = registry.instruments.len(),
            states = registry.states.len(),
            "code registry loaded"
        );
        Ok(registry)
    }

    /// Read, parse, and validate a code-list file.
    pub fn load(path: &Path) -> Result<Self, CodeListError> {
        let text = std::fs::read_to_string(path).map_err(|source| CodeListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_code_lists(&CodeLists::from_yaml(&text)?)
    }

    /// Validate a single sector code.
    pub fn sector(&self, raw: &str) -> Result<Sector, ValidationError> {
        check(&self.sectors, raw)
    }

    /// Validate a single instrument code.
    pub fn instrument(&self, raw: &str) -> Result<Instrument, ValidationError> {
        check(&self.instruments, raw)
    }

    /// Validate an implementation-state code.
    pub fn state(&self, raw: &str) -> Result<ImplementationState, ValidationError> {
        check(&self.states, raw)
    }

    /// Validate a sequence of sector codes, preserving order.
    pub fn sectors<'a>(
        &self,
        raw: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Sector>, ValidationError> {
        raw.into_iter().map(|s| self.sector(s)).collect()
    }

    /// Validate a sequence of instrument codes, preserving order.
    pub fn instruments<'a>(
        &self,
        raw: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Instrument>, ValidationError> {
        raw.into_iter().map(|s| self.instrument(s)).collect()
    }

    /// Whether an already-typed sector is enabled.
    pub fn allows_sector(&self, code: Sector) -> bool {
        self.sectors.contains(&code)
    }

    /// Whether an already-typed instrument is enabled.
    pub fn allows_instrument(&self, code: Instrument) -> bool {
        self.instruments.contains(&code)
    }

    /// Whether an already-typed state is enabled.
    pub fn allows_state(&self, code: ImplementationState) -> bool {
        self.states.contains(&code)
    }

    /// The enabled codes as a code-list document.
    pub fn code_lists(&self) -> CodeLists {
        fn names<T: fmt::Display>(codes: &[T]) -> Option<Vec<String>> {
            Some(codes.iter().map(ToString::to_string).collect())
        }
        CodeLists {
            sector: names(&self.sectors),
            instrument: names(&self.instruments),
            implementation_state: names(&self.states),
        }
    }
}

fn enable<T: Code>(raw: Option<&[String]>) -> Result<Vec<T>, CodeListError> {
    let list = T::LIST;
    let raw = raw.ok_or(CodeListError::MissingList(list))?;
    let mut enabled = Vec::with_capacity(raw.len());
    for code in raw {
        let parsed: T = code.parse().map_err(|_| CodeListError::UnknownCode {
            list,
            code: code.clone(),
        })?;
        if enabled.contains(&parsed) {
            return Err(CodeListError::DuplicateCode {
                list,
                code: code.clone(),
            });
        }
        enabled.push(parsed);
    }
    enabled.sort_unstable();
    Ok(enabled)
}

fn check<T: Code>(enabled: &[T], raw: &str) -> Result<T, ValidationError> {
    let code: T = raw.parse()?;
    if enabled.contains(&code) {
        Ok(code)
    } else {
        Err(ValidationError::DisabledCode {
            field: T::FIELD,
            value: code.to_string(),
        })
    }
}
