//! # cpn-core: Climate Policy Record Model
//!
//! Foundational types for normalizing climate-policy records from
//! heterogeneous sources into one canonical schema.
//!
//! ## Components
//!
//! - [`codes`]: the Code Registry. Statically declared [`Sector`],
//!   [`Instrument`], and [`ImplementationState`] enums, enabled per run by an
//!   external code list and checked against it at load time.
//! - [`jurisdiction`]: the Jurisdiction Resolver. Name → ISO 3166-1 alpha-3
//!   lookup behind [`JurisdictionResolver`], with a built-in [`CountryTable`].
//! - [`model`]: the Record Model. [`Policy`], [`Target`], [`Measurement`],
//!   and [`Source`], validated at construction.
//! - [`canonical`]: the Canonicalizer. Ordered, null-stripped payload plus
//!   sharding key.
//!
//! ## Crate Policy
//!
//! - No I/O beyond reading the code-list file.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Invalid source data is an error, never silently coerced.

pub mod canonical;
pub mod codes;
mod countries;
pub mod error;
pub mod jurisdiction;
pub mod model;

// Re-export primary types for ergonomic imports.
pub use canonical::{strip_empty, CanonicalPolicy, Canonicalizer, CoverageMode};
pub use codes::{Code, CodeLists, CodeRegistry, ImplementationState, Instrument, Sector};
pub use error::{CodeListError, ValidationError};
pub use jurisdiction::{
    AlphaCode, Country, CountryTable, Jurisdiction, JurisdictionKind, JurisdictionResolver,
};
pub use model::{Measurement, Policy, PolicyBuilder, Source, Target};
