//! # Canonicalization
//!
//! Converts a validated [`Policy`] into its canonical form: an ordered
//! mapping of plain scalars, sequences, and mappings ready for YAML output,
//! plus the sharding key used to name the output file.
//!
//! ## Rules
//!
//! 1. Fields are emitted in a fixed order: `name`, `sector`, `instrument`,
//!    `state`, `source`, `description`, `coverage`, `targets`. Enumerated
//!    codes emit their symbolic name.
//! 2. **Null stripping**: `null`, empty sequences, and empty mappings are
//!    removed, recursively, so output is minimal and diff-friendly.
//! 3. Coverage emits `"Country :: <ALPHA3>"` tags (see [`CoverageMode`]).
//! 4. Targets emit `quantity`, `year`, `reference year`, `value`, `range`,
//!    `unit`, in that order, omitting absent ones.
//!
//! The sharding key is the alpha-3 code of the first covered jurisdiction
//! when it resolved, and absent otherwise. Payload and key are produced in
//! one pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Number, Value};

use crate::jurisdiction::AlphaCode;
use crate::model::{Measurement, Policy, Target};

/// How a policy's coverage is rendered into tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Tag only the first jurisdiction, and only if it resolved.
    #[default]
    First,
    /// Tag every resolved jurisdiction, deduplicated, in coverage order.
    All,
}

impl CoverageMode {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::All => "all",
        }
    }
}

impl fmt::Display for CoverageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(format!("unknown coverage mode {other:?}; expected first or all")),
        }
    }
}

/// A canonicalized policy: serializable payload plus sharding key.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPolicy {
    payload: Mapping,
    shard: Option<AlphaCode>,
}

impl CanonicalPolicy {
    /// The ordered, null-stripped payload.
    pub fn payload(&self) -> &Mapping {
        &self.payload
    }

    /// The resolved alpha-3 code used for file naming, if any.
    pub fn shard(&self) -> Option<&AlphaCode> {
        self.shard.as_ref()
    }

    /// Split into payload and sharding key.
    pub fn into_parts(self) -> (Mapping, Option<AlphaCode>) {
        (self.payload, self.shard)
    }
}

/// Canonicalizes policies under a fixed coverage mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    coverage: CoverageMode,
}

impl Canonicalizer {
    /// Create a canonicalizer with the given coverage mode.
    pub fn new(coverage: CoverageMode) -> Self {
        Self { coverage }
    }

    /// The coverage mode in effect.
    pub fn coverage_mode(&self) -> CoverageMode {
        self.coverage
    }

    /// Produce the canonical form of `policy`.
    pub fn canonicalize(&self, policy: &Policy) -> CanonicalPolicy {
        let mut out = Mapping::new();
        out.insert(key("name"), opt_str(policy.name()));
        out.insert(key("sector"), names(policy.sector()));
        out.insert(key("instrument"), names(policy.instrument()));
        out.insert(
            key("state"),
            opt_str(policy.state().as_ref().map(|s| s.as_str())),
        );
        out.insert(
            key("source"),
            policy
                .source()
                .map_or(Value::Null, |s| Value::String(s.to_string())),
        );
        out.insert(key("description"), opt_str(policy.description()));

        let (tags, shard) = self.coverage_tags(policy);
        out.insert(
            key("coverage"),
            Value::Sequence(tags.into_iter().map(Value::String).collect()),
        );

        let targets: Mapping = policy
            .targets()
            .iter()
            .map(|(label, t)| (Value::String(label.clone()), target_value(t)))
            .collect();
        out.insert(key("targets"), Value::Mapping(targets));

        let payload = match strip_empty(Value::Mapping(out)) {
            Some(Value::Mapping(m)) => m,
            _ => Mapping::new(),
        };
        CanonicalPolicy { payload, shard }
    }

    fn coverage_tags(&self, policy: &Policy) -> (Vec<String>, Option<AlphaCode>) {
        let coverage = policy.coverage();
        let shard = coverage.first().and_then(|j| j.alpha_3()).cloned();
        let tags: Vec<String> = match self.coverage {
            CoverageMode::First => coverage.first().and_then(|j| j.tag()).into_iter().collect(),
            CoverageMode::All => {
                let mut tags = Vec::new();
                for tag in coverage.iter().filter_map(|j| j.tag()) {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
                tags
            }
        };
        (tags, shard)
    }
}

fn target_value(t: &Target) -> Value {
    let mut m = Mapping::new();
    m.insert(key("quantity"), Value::String(t.quantity().to_string()));
    m.insert(key("year"), opt_int(t.year()));
    m.insert(key("reference year"), opt_int(t.reference_year()));
    let (value, range) = match t.measurement() {
        Some(Measurement::Scalar(v)) => (float(*v), Value::Null),
        Some(Measurement::Range { low, high }) => {
            (Value::Null, Value::Sequence(vec![float(*low), float(*high)]))
        }
        None => (Value::Null, Value::Null),
    };
    m.insert(key("value"), value);
    m.insert(key("range"), range);
    m.insert(key("unit"), Value::String(t.unit().to_string()));
    Value::Mapping(m)
}

/// Remove `null`, empty sequences, and empty mappings, recursively.
///
/// Returns `None` if `value` itself is empty after stripping.
pub fn strip_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Sequence(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(strip_empty).collect();
            (!kept.is_empty()).then_some(Value::Sequence(kept))
        }
        Value::Mapping(map) => {
            let kept: Mapping = map
                .into_iter()
                .filter_map(|(k, v)| strip_empty(v).map(|v| (k, v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Mapping(kept))
        }
        Value::Tagged(tagged) => {
            let tagged = *tagged;
            strip_empty(tagged.value).map(|value| {
                Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                    tag: tagged.tag,
                    value,
                }))
            })
        }
        scalar => Some(scalar),
    }
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn opt_str(s: Option<&str>) -> Value {
    s.map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn opt_int(n: Option<i32>) -> Value {
    n.map_or(Value::Null, |n| Value::Number(Number::from(i64::from(n))))
}

fn float(v: f64) -> Value {
    Value::Number(Number::from(v))
}

fn names<T: fmt::Display>(codes: &[T]) -> Value {
    Value::Sequence(codes.iter().map(|c| Value::String(c.to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeRegistry;
    use crate::jurisdiction::{CountryTable, Jurisdiction};
    use crate::model::Target;

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn energy_germany_scenario() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let policy = Policy::builder(&registry)
            .sector("ENERGY")
            .unwrap()
            .jurisdiction(Jurisdiction::country("Germany", &table))
            .build();

        let canonical = Canonicalizer::default().canonicalize(&policy);
        assert_eq!(
            canonical.payload(),
            &yaml("sector: [ENERGY]\ncoverage: ['Country :: DEU']\n")
        );
        assert!(!canonical.payload().contains_key("targets"));
        assert_eq!(canonical.shard().map(AlphaCode::as_str), Some("DEU"));
    }

    #[test]
    fn empty_policy_has_empty_payload_and_no_shard() {
        let policy = Policy::builder(&CodeRegistry::builtin()).build();
        let canonical = Canonicalizer::default().canonicalize(&policy);
        assert!(canonical.payload().is_empty());
        assert!(canonical.shard().is_none());
    }

    #[test]
    fn zero_coverage_omits_field() {
        let policy = Policy::builder(&CodeRegistry::builtin())
            .name("No attribution")
            .build();
        let canonical = Canonicalizer::default().canonicalize(&policy);
        assert!(!canonical.payload().contains_key("coverage"));
        assert!(canonical.shard().is_none());
    }

    #[test]
    fn scalar_target_omits_range() {
        let target = Target::new("Renewable share", "%")
            .unwrap()
            .with_value(30.5)
            .unwrap()
            .with_year(Some(2030));
        let policy = Policy::builder(&CodeRegistry::builtin())
            .target("default", target)
            .unwrap()
            .build();
        let canonical = Canonicalizer::default().canonicalize(&policy);
        assert_eq!(
            canonical.payload(),
            &yaml(
                "targets:\n  default:\n    quantity: Renewable share\n    year: 2030\n    value: 30.5\n    unit: '%'\n"
            )
        );
    }

    #[test]
    fn range_target_emits_pair() {
        let target = Target::new("Emissions", "Mt CO2e")
            .unwrap()
            .with_range(10.0, 12.5)
            .unwrap()
            .with_reference_year(Some(2005));
        let policy = Policy::builder(&CodeRegistry::builtin())
            .target("default", target)
            .unwrap()
            .build();
        let canonical = Canonicalizer::default().canonicalize(&policy);
        let t = &canonical.payload()["targets"]["default"];
        assert_eq!(t["range"], serde_yaml::from_str::<Value>("[10.0, 12.5]").unwrap());
        assert_eq!(t["reference year"], Value::Number(2005.into()));
        assert!(t.get("value").is_none());
        assert!(t.get("year").is_none());
    }

    #[test]
    fn url_source_is_emitted_as_written() {
        let raw = "HTTPS://de.Wikipedia.org/wiki/Österreich/../Klima";
        let policy = Policy::builder(&CodeRegistry::builtin())
            .source(raw)
            .build();
        assert!(policy.source().and_then(|s| s.url()).is_some());
        let canonical = Canonicalizer::default().canonicalize(&policy);
        assert_eq!(canonical.payload()["source"], Value::String(raw.to_string()));
    }

    #[test]
    fn field_order_is_fixed() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let policy = Policy::builder(&registry)
            .target("t", Target::new("q", "u").unwrap())
            .unwrap()
            .jurisdiction(Jurisdiction::country("Brazil", &table))
            .description("d")
            .source("s")
            .state("PLANNED")
            .unwrap()
            .instrument("FISCAL")
            .unwrap()
            .sector("WASTE")
            .unwrap()
            .name("n")
            .build();
        let canonical = Canonicalizer::default().canonicalize(&policy);
        let keys: Vec<&str> = canonical
            .payload()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(
            keys,
            [
                "name",
                "sector",
                "instrument",
                "state",
                "source",
                "description",
                "coverage",
                "targets"
            ]
        );
        let target_keys: Vec<&str> = canonical.payload()["targets"]["t"]
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(target_keys, ["quantity", "unit"]);
    }

    #[test]
    fn first_mode_tags_only_first_jurisdiction() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let policy = Policy::builder(&registry)
            .jurisdiction(Jurisdiction::country("France", &table))
            .jurisdiction(Jurisdiction::country("Spain", &table))
            .build();
        let canonical = Canonicalizer::new(CoverageMode::First).canonicalize(&policy);
        assert_eq!(
            canonical.payload()["coverage"],
            serde_yaml::from_str::<Value>("['Country :: FRA']").unwrap()
        );
        assert_eq!(canonical.shard().unwrap().as_str(), "FRA");
    }

    #[test]
    fn all_mode_tags_every_resolved_jurisdiction() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let policy = Policy::builder(&registry)
            .jurisdiction(Jurisdiction::country("France", &table))
            .jurisdiction(Jurisdiction::country("Atlantis", &table))
            .jurisdiction(Jurisdiction::country("Spain", &table))
            .jurisdiction(Jurisdiction::country("FRA", &table))
            .build();
        let canonical = Canonicalizer::new(CoverageMode::All).canonicalize(&policy);
        assert_eq!(
            canonical.payload()["coverage"],
            serde_yaml::from_str::<Value>("['Country :: FRA', 'Country :: ESP']").unwrap()
        );
        assert_eq!(canonical.shard().unwrap().as_str(), "FRA");
    }

    #[test]
    fn unresolved_first_jurisdiction_gives_no_tag_and_no_shard() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let policy = Policy::builder(&registry)
            .jurisdiction(Jurisdiction::country("Atlantis", &table))
            .jurisdiction(Jurisdiction::country("Spain", &table))
            .build();
        let canonical = Canonicalizer::new(CoverageMode::First).canonicalize(&policy);
        assert!(!canonical.payload().contains_key("coverage"));
        assert!(canonical.shard().is_none());
    }

    #[test]
    fn strip_empty_is_recursive() {
        let value: Value = serde_yaml::from_str(
            "a: null\nb: []\nc: {}\nd:\n  e: null\n  f: [null, {}]\ng: 0\nh: ''\n",
        )
        .unwrap();
        let stripped = strip_empty(value).unwrap();
        assert_eq!(stripped, serde_yaml::from_str::<Value>("g: 0\nh: ''\n").unwrap());
        assert_eq!(strip_empty(Value::Null), None);
    }

    #[test]
    fn coverage_mode_parse() {
        assert_eq!("all".parse::<CoverageMode>().unwrap(), CoverageMode::All);
        assert_eq!("first".parse::<CoverageMode>().unwrap(), CoverageMode::First);
        assert!("some".parse::<CoverageMode>().is_err());
        assert_eq!(CoverageMode::default().to_string(), "first");
    }
}
