//! # Jurisdictions
//!
//! Resolution of human-readable jurisdiction names to ISO 3166-1 alpha-3
//! codes, and the [`Jurisdiction`] entity carried in a policy's coverage.
//!
//! ## Resolution
//!
//! A resolver is a pure lookup behind the [`JurisdictionResolver`] trait.
//! A miss yields `None`; it is never an error. Callers that want misses to
//! be fatal use [`Jurisdiction::country_strict`].
//!
//! The built-in [`CountryTable`] matches ISO short names case-insensitively
//! and also accepts exact uppercase alpha-2 and alpha-3 codes. Extra names
//! ("USA", "South Korea", ...) are registered as aliases.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::countries::ISO_3166_1;
use crate::error::ValidationError;

/// An ISO 3166-1 alpha-3 code: exactly three ASCII uppercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AlphaCode(String);

impl AlphaCode {
    /// Create an alpha-3 code, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] unless the value is three ASCII
    /// uppercase letters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.len() == 3 && value.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(value))
        } else {
            Err(ValidationError::Invalid {
                field: "alpha_3",
                value,
            })
        }
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AlphaCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for AlphaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved country record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO short name.
    pub name: String,
    /// ISO 3166-1 alpha-2 code.
    pub alpha_2: String,
    /// ISO 3166-1 alpha-3 code.
    pub alpha_3: AlphaCode,
}

/// Maps a human-readable jurisdiction name to a country record.
pub trait JurisdictionResolver {
    /// Look up `name`. Returns `None` when there is no match.
    fn resolve(&self, name: &str) -> Option<Country>;
}

/// In-memory country table with name, code, and alias indexes.
#[derive(Debug, Clone)]
pub struct CountryTable {
    countries: Vec<Country>,
    by_name: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl CountryTable {
    /// The built-in ISO 3166-1 table.
    pub fn iso3166() -> Self {
        let countries = ISO_3166_1
            .iter()
            .filter_map(|(a2, a3, name)| {
                Some(Country {
                    name: (*name).to_string(),
                    alpha_2: (*a2).to_string(),
                    alpha_3: AlphaCode::new(*a3).ok()?,
                })
            })
            .collect();
        Self::from_countries(countries)
    }

    /// Build a table from arbitrary country records.
    pub fn from_countries(countries: Vec<Country>) -> Self {
        let mut by_name = HashMap::with_capacity(countries.len());
        let mut by_code = HashMap::with_capacity(countries.len() * 2);
        for (idx, c) in countries.iter().enumerate() {
            by_name.insert(name_key(&c.name), idx);
            by_code.insert(c.alpha_2.clone(), idx);
            by_code.insert(c.alpha_3.as_str().to_string(), idx);
        }
        Self {
            countries,
            by_name,
            by_code,
        }
    }

    /// Register an additional name for the country with code `alpha_3`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] if no country in the table has
    /// that alpha-3 code.
    pub fn with_alias(mut self, alias: &str, alpha_3: &str) -> Result<Self, ValidationError> {
        let idx = *self
            .by_code
            .get(alpha_3.trim())
            .filter(|&&i| self.countries[i].alpha_3.as_str() == alpha_3.trim())
            .ok_or_else(|| ValidationError::Invalid {
                field: "alias",
                value: format!("{alias} -> {alpha_3}"),
            })?;
        self.by_name.insert(name_key(alias), idx);
        Ok(self)
    }

    /// Number of countries in the table.
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        Self::iso3166()
    }
}

impl JurisdictionResolver for CountryTable {
    fn resolve(&self, name: &str) -> Option<Country> {
        let trimmed = name.trim();
        let idx = self.by_name.get(&name_key(trimmed)).or_else(|| {
            let is_code = matches!(trimmed.len(), 2 | 3)
                && trimmed.bytes().all(|b| b.is_ascii_uppercase());
            if is_code {
                self.by_code.get(trimmed)
            } else {
                None
            }
        })?;
        Some(self.countries[*idx].clone())
    }
}

fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Kind of jurisdiction. Only countries exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionKind {
    /// A sovereign country or territory with an ISO 3166-1 code.
    #[default]
    Country,
}

impl JurisdictionKind {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
        }
    }

    /// Label used in coverage tags.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Country => "Country",
        }
    }
}

impl fmt::Display for JurisdictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity, normally a country, to which a policy applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    /// Jurisdiction kind.
    #[serde(default)]
    pub kind: JurisdictionKind,
    /// The name the jurisdiction was constructed from.
    pub name: String,
    /// Resolution result; `None` when the name was not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Country>,
}

impl Jurisdiction {
    /// Construct a country jurisdiction, resolving `name`.
    ///
    /// A resolution miss produces a jurisdiction with no resolved data.
    pub fn country(name: &str, resolver: &dyn JurisdictionResolver) -> Self {
        let resolved = resolver.resolve(name);
        if resolved.is_none() {
            tracing::debug!(name, "jurisdiction not resolved");
        }
        Self {
            kind: JurisdictionKind::Country,
            name: name.trim().to_string(),
            resolved,
        }
    }

    /// Construct a country jurisdiction, treating a miss as fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnresolvedJurisdiction`] on a miss.
    pub fn country_strict(
        name: &str,
        resolver: &dyn JurisdictionResolver,
    ) -> Result<Self, ValidationError> {
        let j = Self::country(name, resolver);
        if j.resolved.is_none() {
            return Err(ValidationError::UnresolvedJurisdiction {
                name: j.name,
            });
        }
        Ok(j)
    }

    /// The resolved alpha-3 code, if any.
    pub fn alpha_3(&self) -> Option<&AlphaCode> {
        self.resolved.as_ref().map(|c| &c.alpha_3)
    }

    /// Whether resolution succeeded.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Coverage tag of the form `"Country :: DEU"`, if resolved.
    pub fn tag(&self) -> Option<String> {
        self.alpha_3()
            .map(|code| format!("{} :: {}", self.kind.label(), code))
    }
}
