//! # Source Feeds
//!
//! Each upstream database has its own record layout. A [`PolicyFeed`] maps
//! one raw record from its feed file onto validated [`Policy`] values. The
//! mappers know the source keys; everything downstream sees only the common
//! record model.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use cpn_core::{CodeRegistry, Jurisdiction, JurisdictionResolver, Policy, Target, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;
use crate::fields::{Fields, RawRecord};

/// Source string for every CD-LINKS record.
pub const CD_LINKS_SOURCE: &str = "CD-LINKS database";

/// Spreadsheet the COMMIT records were compiled in.
pub const COMMIT_SHEET: &str = "Bridging Scenario GPP list 24 October 2019_final";

/// Separator of multi-valued code cells in New Climate records.
const LIST_SEPARATOR: &str = ", ";

/// The supported source databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// New Climate Institute climate policy database.
    NewClimate,
    /// CD-LINKS national policy targets.
    CdLinks,
    /// COMMIT good-practice policy list.
    Commit,
}

impl FeedKind {
    /// All feed kinds.
    pub const ALL: [FeedKind; 3] = [Self::NewClimate, Self::CdLinks, Self::Commit];

    /// The kind's name as used in configuration and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewClimate => "new-climate",
            Self::CdLinks => "cd-links",
            Self::Commit => "commit",
        }
    }

    /// The mapper for this kind.
    pub fn mapper(&self) -> &'static dyn PolicyFeed {
        match self {
            Self::NewClimate => &NewClimate,
            Self::CdLinks => &CdLinks,
            Self::Commit => &Commit,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(FeedKind::as_str).collect();
                format!("unknown feed kind {s:?}; expected one of {}", known.join(", "))
            })
    }
}

/// What a mapper needs besides the record itself.
#[derive(Clone, Copy)]
pub struct FeedContext<'a> {
    /// Enabled codes.
    pub registry: &'a CodeRegistry,
    /// Jurisdiction name lookup.
    pub resolver: &'a dyn JurisdictionResolver,
    /// Treat unresolved jurisdiction names as record errors.
    pub strict: bool,
}

impl fmt::Debug for FeedContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedContext")
            .field("registry", self.registry)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl FeedContext<'_> {
    /// Build a country jurisdiction, honouring strict resolution.
    pub fn country(&self, name: &str) -> Result<Jurisdiction, ValidationError> {
        if self.strict {
            Jurisdiction::country_strict(name, self.resolver)
        } else {
            Ok(Jurisdiction::country(name, self.resolver))
        }
    }
}

/// Maps raw records of one source format to policies.
pub trait PolicyFeed: Sync {
    /// Which source this mapper reads.
    fn kind(&self) -> FeedKind;

    /// Map one raw record. A record yields zero or more policies.
    ///
    /// # Errors
    ///
    /// A missing key, a wrongly typed value, or an invalid code fails the
    /// whole record.
    fn map_record(&self, raw: &RawRecord, ctx: &FeedContext<'_>)
        -> Result<Vec<Policy>, ValidationError>;
}

/// New Climate records: one nested `Policy` mapping, no targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewClimate;

impl PolicyFeed for NewClimate {
    fn kind(&self) -> FeedKind {
        FeedKind::NewClimate
    }

    fn map_record(
        &self,
        raw: &RawRecord,
        ctx: &FeedContext<'_>,
    ) -> Result<Vec<Policy>, ValidationError> {
        let p = Fields::new(raw).mapping("Policy")?;
        let policy = Policy::builder(ctx.registry)
            .name(p.str("Name of policy")?)
            .sectors(p.list("Sector name", LIST_SEPARATOR)?)?
            .instruments(p.list("Type of policy instrument", LIST_SEPARATOR)?)?
            .state(p.str("Implementation state")?)?
            .jurisdiction(ctx.country(p.str("Country")?)?)
            .source(p.str("Source or references")?)
            .build();
        Ok(vec![policy])
    }
}

/// CD-LINKS records: one sector, one country, one `default` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdLinks;

impl PolicyFeed for CdLinks {
    fn kind(&self) -> FeedKind {
        FeedKind::CdLinks
    }

    fn map_record(
        &self,
        raw: &RawRecord,
        ctx: &FeedContext<'_>,
    ) -> Result<Vec<Policy>, ValidationError> {
        let r = Fields::new(raw);
        let mut target = Target::new(r.str("Variable")?, r.str("Unit")?)?
            .with_year(r.opt_year("End year")?)
            .with_reference_year(r.opt_year("Base year")?);
        target = if r.has("Value") {
            target.with_value(r.number("Value")?)?
        } else {
            let (low, high) = r.pair("Range")?;
            target.with_range(low, high)?
        };

        let policy = Policy::builder(ctx.registry)
            .sector(r.str("Sector")?)?
            .jurisdiction(ctx.country(r.str("Country")?)?)
            .source(CD_LINKS_SOURCE)
            .target("default", target)?
            .build();
        Ok(vec![policy])
    }
}

/// COMMIT records: one sector, a developed and a developing target, no
/// coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Commit;

impl Commit {
    fn target(r: &Fields<'_>, group: &str) -> Result<Target, ValidationError> {
        let target = Target::new(r.str("Variable")?, r.str("Unit")?)?
            .with_value(r.number(&format!("{group} Countries Value"))?)?
            .with_year(r.opt_year(&format!("{group} Countries Year"))?);
        Ok(target)
    }
}

impl PolicyFeed for Commit {
    fn kind(&self) -> FeedKind {
        FeedKind::Commit
    }

    fn map_record(
        &self,
        raw: &RawRecord,
        ctx: &FeedContext<'_>,
    ) -> Result<Vec<Policy>, ValidationError> {
        let r = Fields::new(raw);
        let source = format!(
            "COMMIT database / ‘{}’ via Google Sheet “{COMMIT_SHEET}”.",
            r.str("Source")?
        );
        let policy = Policy::builder(ctx.registry)
            .sector(r.str("Sector")?)?
            .source(&source)
            .description(r.opt_str("Comment General")?.unwrap_or_default())
            .target("developed", Self::target(&r, "Developed")?)?
            .target("developing", Self::target(&r, "Developing")?)?
            .build();
        Ok(vec![policy])
    }
}

/// Read a feed file: a YAML sequence of mappings.
///
/// An empty file is an empty feed.
pub fn load_feed(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_yaml::from_str(&text).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = value else {
        return Err(IngestError::NotASequence {
            path: path.to_path_buf(),
        });
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(IngestError::NotAMapping {
                path: path.to_path_buf(),
                index,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpn_core::{CountryTable, ImplementationState, Instrument, Measurement, Sector, Source};
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn map(kind: FeedKind, raw: Value, strict: bool) -> Result<Vec<Policy>, ValidationError> {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let ctx = FeedContext {
            registry: &registry,
            resolver: &table,
            strict,
        };
        kind.mapper().map_record(&record(raw), &ctx)
    }

    fn new_climate() -> Value {
        json!({"Policy": {
            "Name of policy": "Renewable Energy Sources Act",
            "Sector name": "ENERGY, ELECTRICITY",
            "Type of policy instrument": "ECONOMIC, REGULATION",
            "Implementation state": "IN_FORCE",
            "Country": "Germany",
            "Source or references": "https://www.gesetze-im-internet.de/eeg_2014/"
        }})
    }

    #[test]
    fn new_climate_maps_all_fields() {
        let policies = map(FeedKind::NewClimate, new_climate(), false).unwrap();
        assert_eq!(policies.len(), 1);
        let p = &policies[0];
        assert_eq!(p.name(), Some("Renewable Energy Sources Act"));
        assert_eq!(p.sector(), &[Sector::Energy, Sector::Electricity]);
        assert_eq!(p.instrument(), &[Instrument::Economic, Instrument::Regulation]);
        assert_eq!(p.state(), Some(ImplementationState::InForce));
        assert_eq!(p.coverage()[0].alpha_3().map(|c| c.as_str()), Some("DEU"));
        assert!(matches!(p.source(), Some(Source::Url { .. })));
        assert!(p.targets().is_empty());
    }

    #[test]
    fn new_climate_rejects_unknown_codes() {
        let mut raw = new_climate();
        raw["Policy"]["Sector name"] = json!("ENERGY, SPACE");
        let err = map(FeedKind::NewClimate, raw, false).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownCode { field: "sector", .. }));
    }

    #[test]
    fn new_climate_requires_policy_mapping() {
        let err = map(FeedKind::NewClimate, json!({"Name of policy": "x"}), false).unwrap_err();
        assert_eq!(err, ValidationError::missing("Policy"));
    }

    #[test]
    fn strict_resolution_fails_unknown_country() {
        let mut raw = new_climate();
        raw["Policy"]["Country"] = json!("Atlantis");
        assert!(map(FeedKind::NewClimate, raw.clone(), false).is_ok());
        let err = map(FeedKind::NewClimate, raw, true).unwrap_err();
        assert!(matches!(err, ValidationError::UnresolvedJurisdiction { .. }));
    }

    #[test]
    fn cd_links_value_target() {
        let raw = json!({
            "Sector": "ENERGY", "Country": "Brazil",
            "Variable": "Emissions|CO2", "Unit": "Mt CO2/yr",
            "End year": 2030, "Base year": 2005, "Value": 30.5
        });
        let p = &map(FeedKind::CdLinks, raw, false).unwrap()[0];
        assert_eq!(p.name(), None);
        assert_eq!(p.source(), Some(&Source::Text(CD_LINKS_SOURCE.to_string())));
        let t = &p.targets()["default"];
        assert_eq!(t.quantity(), "Emissions|CO2");
        assert_eq!(t.year(), Some(2030));
        assert_eq!(t.reference_year(), Some(2005));
        assert_eq!(t.measurement(), Some(&Measurement::Scalar(30.5)));
    }

    #[test]
    fn cd_links_range_target_without_years() {
        let raw = json!({
            "Sector": "TRANSPORT", "Country": "India",
            "Variable": "Share of EVs", "Unit": "%", "Range": [20, 30]
        });
        let p = &map(FeedKind::CdLinks, raw, false).unwrap()[0];
        let t = &p.targets()["default"];
        assert_eq!(t.year(), None);
        assert_eq!(t.measurement().and_then(Measurement::bounds), Some((20.0, 30.0)));
    }

    #[test]
    fn cd_links_needs_value_or_range() {
        let raw = json!({"Sector": "ENERGY", "Country": "India", "Variable": "x", "Unit": "y"});
        assert_eq!(
            map(FeedKind::CdLinks, raw, false).unwrap_err(),
            ValidationError::missing("Range")
        );
    }

    #[test]
    fn cd_links_wrong_year_type_names_key() {
        let raw = json!({
            "Sector": "ENERGY", "Country": "India", "Variable": "x", "Unit": "y",
            "End year": "soon", "Value": 1
        });
        let err = map(FeedKind::CdLinks, raw, false).unwrap_err();
        assert!(err.to_string().starts_with("End year:"));
    }

    #[test]
    fn commit_has_two_targets_and_no_coverage() {
        let raw = json!({
            "Sector": "BUILDINGS", "Source": "IEA",
            "Comment General": "Zero-energy buildings standard",
            "Variable": "Energy intensity", "Unit": "kWh/m2",
            "Developed Countries Value": 50, "Developed Countries Year": 2030,
            "Developing Countries Value": 80, "Developing Countries Year": 2040
        });
        let p = &map(FeedKind::Commit, raw, false).unwrap()[0];
        assert!(p.coverage().is_empty());
        assert_eq!(p.description(), Some("Zero-energy buildings standard"));
        assert_eq!(
            p.source().map(ToString::to_string).as_deref(),
            Some("COMMIT database / ‘IEA’ via Google Sheet “Bridging Scenario GPP list 24 October 2019_final”.")
        );
        let labels: Vec<&str> = p.targets().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["developed", "developing"]);
        assert_eq!(p.targets()["developing"].year(), Some(2040));
        assert_eq!(p.targets()["developed"].measurement().and_then(Measurement::value), Some(50.0));
    }

    #[test]
    fn commit_description_is_optional() {
        let raw = json!({
            "Sector": "BUILDINGS", "Source": "IEA",
            "Variable": "v", "Unit": "u",
            "Developed Countries Value": 1, "Developing Countries Value": 2
        });
        let p = &map(FeedKind::Commit, raw, false).unwrap()[0];
        assert_eq!(p.description(), None);
    }

    #[test]
    fn feed_kind_parses_names() {
        assert_eq!("cd-links".parse::<FeedKind>(), Ok(FeedKind::CdLinks));
        assert!("cdlinks".parse::<FeedKind>().unwrap_err().contains("new-climate"));
        for kind in FeedKind::ALL {
            assert_eq!(kind.mapper().kind(), kind);
        }
    }

    #[test]
    fn load_feed_reads_sequences_only() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.yaml");
        std::fs::write(&good, "- Sector: ENERGY\n- Sector: WASTE\n").unwrap();
        assert_eq!(load_feed(&good).unwrap().len(), 2);

        let empty = tmp.path().join("empty.yaml");
        std::fs::write(&empty, "\n").unwrap();
        assert!(load_feed(&empty).unwrap().is_empty());

        let scalar = tmp.path().join("scalar.yaml");
        std::fs::write(&scalar, "Sector: ENERGY\n").unwrap();
        assert!(matches!(load_feed(&scalar), Err(IngestError::NotASequence { .. })));

        let mixed = tmp.path().join("mixed.yaml");
        std::fs::write(&mixed, "- Sector: ENERGY\n- just text\n").unwrap();
        assert!(matches!(
            load_feed(&mixed),
            Err(IngestError::NotAMapping { index: 1, .. })
        ));

        assert!(matches!(
            load_feed(&tmp.path().join("absent.yaml")),
            Err(IngestError::Read { .. })
        ));
    }
}
