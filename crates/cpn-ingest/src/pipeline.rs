//! # Normalization Pipeline
//!
//! Feeds are processed in the given order and records within a feed in file
//! order: map, canonicalize, write. The first failing record stops the run;
//! files already written stay in place.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use cpn_core::{Canonicalizer, CodeRegistry, CoverageMode, JurisdictionResolver, Policy};
use cpn_store::{PolicyStore, StoredPolicy};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::feeds::{load_feed, FeedContext, FeedKind};
use crate::fields::RawRecord;

/// A feed file and the format it is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSource {
    /// Source format.
    pub kind: FeedKind,
    /// Feed file.
    pub path: PathBuf,
}

impl FromStr for FeedSource {
    type Err = String;

    /// Parse `KIND=PATH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KIND=PATH, got {s:?}"))?;
        if path.is_empty() {
            return Err(format!("missing path in {s:?}"));
        }
        Ok(Self {
            kind: kind.parse()?,
            path: PathBuf::from(path),
        })
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.path.display())
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Raw records mapped, per feed kind.
    pub records: BTreeMap<FeedKind, usize>,
    /// Files written, per shard key.
    pub files: BTreeMap<String, usize>,
    /// Coverage entries whose name did not resolve.
    pub unresolved: usize,
}

impl RunSummary {
    /// Total files written.
    pub fn written(&self) -> usize {
        self.files.values().sum()
    }

    fn record_written(&mut self, stored: &StoredPolicy) {
        *self.files.entry(stored.shard.to_string()).or_default() += 1;
    }
}

/// Maps, canonicalizes, and stores records from a list of feeds.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    ctx: FeedContext<'a>,
    canonicalizer: Canonicalizer,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with lenient resolution and first-jurisdiction coverage.
    pub fn new(registry: &'a CodeRegistry, resolver: &'a dyn JurisdictionResolver) -> Self {
        Self {
            ctx: FeedContext {
                registry,
                resolver,
                strict: false,
            },
            canonicalizer: Canonicalizer::default(),
        }
    }

    /// Select how many jurisdictions each record keeps.
    pub fn with_coverage(mut self, mode: CoverageMode) -> Self {
        self.canonicalizer = Canonicalizer::new(mode);
        self
    }

    /// Make unresolved jurisdiction names fatal for their record.
    pub fn strict_jurisdictions(mut self, strict: bool) -> Self {
        self.ctx.strict = strict;
        self
    }

    /// Load and process every feed in order.
    pub fn run(
        &self,
        feeds: &[FeedSource],
        store: &mut PolicyStore,
    ) -> Result<RunSummary, IngestError> {
        let mut summary = RunSummary::default();
        for feed in feeds {
            let records = load_feed(&feed.path)?;
            tracing::info!(
                feed = %feed.kind,
                path = %feed.path.display(),
                records = records.len(),
                "processing feed"
            );
            self.run_records(feed, &records, store, &mut summary)?;
        }
        tracing::info!(
            written = summary.written(),
            unresolved = summary.unresolved,
            "run complete"
        );
        Ok(summary)
    }

    /// Process already-loaded records of `feed`, adding to `summary`.
    pub fn run_records(
        &self,
        feed: &FeedSource,
        records: &[RawRecord],
        store: &mut PolicyStore,
        summary: &mut RunSummary,
    ) -> Result<(), IngestError> {
        let mapper = feed.kind.mapper();
        for (index, raw) in records.iter().enumerate() {
            let policies = mapper
                .map_record(raw, &self.ctx)
                .map_err(|source| IngestError::Record {
                    kind: feed.kind,
                    path: feed.path.clone(),
                    index,
                    source,
                })?;
            *summary.records.entry(feed.kind).or_default() += 1;

            for policy in &policies {
                summary.unresolved += unresolved(policy);
                let canonical = self.canonicalizer.canonicalize(policy);
                let stored = store.write(&canonical).map_err(|source| IngestError::Store {
                    kind: feed.kind,
                    path: feed.path.clone(),
                    index,
                    source,
                })?;
                tracing::debug!(
                    feed = %feed.kind,
                    record = index,
                    path = %stored.path.display(),
                    shard = %stored.shard,
                    "record stored"
                );
                summary.record_written(&stored);
            }
        }
        Ok(())
    }
}

fn unresolved(policy: &Policy) -> usize {
    policy.coverage().iter().filter(|j| !j.is_resolved()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpn_core::CountryTable;
    use cpn_store::StoreOptions;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<RawRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn feed_source_parses_kind_and_path() {
        let feed: FeedSource = "cd-links=data/cd links.yaml".parse().unwrap();
        assert_eq!(feed.kind, FeedKind::CdLinks);
        assert_eq!(feed.path, PathBuf::from("data/cd links.yaml"));
        assert_eq!(feed.to_string(), "cd-links=data/cd links.yaml");
        assert!("cd-links".parse::<FeedSource>().is_err());
        assert!("cd-links=".parse::<FeedSource>().is_err());
        assert!("unknown=x.yaml".parse::<FeedSource>().is_err());
    }

    #[test]
    fn records_are_written_and_counted() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let tmp = tempfile::tempdir().unwrap();
        let mut store = PolicyStore::open(tmp.path(), StoreOptions::default()).unwrap();
        let feed = FeedSource {
            kind: FeedKind::CdLinks,
            path: PathBuf::from("inline"),
        };
        let raw = records(json!([
            {"Sector": "ENERGY", "Country": "Brazil", "Variable": "v", "Unit": "u", "Value": 1},
            {"Sector": "ENERGY", "Country": "Brazil", "Variable": "v", "Unit": "u", "Value": 2},
            {"Sector": "ENERGY", "Country": "Atlantis", "Variable": "v", "Unit": "u", "Value": 3}
        ]));

        let mut summary = RunSummary::default();
        Pipeline::new(&registry, &table)
            .run_records(&feed, &raw, &mut store, &mut summary)
            .unwrap();

        assert_eq!(summary.records[&FeedKind::CdLinks], 3);
        assert_eq!(summary.files["BRA"], 2);
        assert_eq!(summary.files["ZZZ"], 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.written(), 3);
        assert!(tmp.path().join("BRA-002.yaml").exists());
    }

    #[test]
    fn failing_record_reports_its_index() {
        let registry = CodeRegistry::builtin();
        let table = CountryTable::iso3166();
        let tmp = tempfile::tempdir().unwrap();
        let mut store = PolicyStore::open(tmp.path(), StoreOptions::default()).unwrap();
        let feed = FeedSource {
            kind: FeedKind::Commit,
            path: PathBuf::from("commit.yaml"),
        };
        let raw = records(json!([
            {"Sector": "WASTE", "Source": "s", "Variable": "v", "Unit": "u",
             "Developed Countries Value": 1, "Developing Countries Value": 2},
            {"Sector": "MINING", "Source": "s", "Variable": "v", "Unit": "u",
             "Developed Countries Value": 1, "Developing Countries Value": 2}
        ]));

        let mut summary = RunSummary::default();
        let err = Pipeline::new(&registry, &table)
            .run_records(&feed, &raw, &mut store, &mut summary)
            .unwrap_err();
        match err {
            IngestError::Record { kind, index, .. } => {
                assert_eq!(kind, FeedKind::Commit);
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(summary.written(), 1);
        assert!(tmp.path().join("ZZZ-001.yaml").exists());
    }

    #[test]
    fn summary_serializes_with_kind_names() {
        let mut summary = RunSummary::default();
        summary.records.insert(FeedKind::NewClimate, 2);
        summary.files.insert("DEU".into(), 2);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["records"]["new-climate"], 2);
        assert_eq!(json["files"]["DEU"], 2);
    }
}
