//! # Run Configuration
//!
//! An optional `cpn.yaml` describing one normalization run:
//!
//! ```yaml
//! codes: structure.yaml        # omitted: built-in code lists
//! output_dir: policies
//! coverage: first              # or: all
//! strict_jurisdictions: false
//! fresh_counters: false
//! wrap_width: 78
//! aliases:
//!   USA: USA
//!   South Korea: KOR
//! feeds:
//!   - kind: new-climate
//!     path: new-climate.yaml
//! ```
//!
//! Relative paths are taken relative to the directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cpn_core::{CodeRegistry, CountryTable, CoverageMode};
use cpn_store::{StoreOptions, DEFAULT_WIDTH};
use serde::Deserialize;

use crate::error::IngestError;
use crate::pipeline::FeedSource;

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "policies";

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Code-list file; `None` selects the built-in lists.
    pub codes: Option<PathBuf>,
    /// Directory receiving the record files.
    pub output_dir: PathBuf,
    /// How many jurisdictions each record carries.
    pub coverage: CoverageMode,
    /// Fail records whose jurisdiction names do not resolve.
    pub strict_jurisdictions: bool,
    /// Ignore existing record files when numbering.
    pub fresh_counters: bool,
    /// Maximum YAML line width.
    pub wrap_width: usize,
    /// Extra jurisdiction names, mapped to alpha-3 codes.
    pub aliases: BTreeMap<String, String>,
    /// Feeds to process, in order.
    pub feeds: Vec<FeedSource>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            codes: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            coverage: CoverageMode::default(),
            strict_jurisdictions: false,
            fresh_counters: false,
            wrap_width: DEFAULT_WIDTH,
            aliases: BTreeMap::new(),
            feeds: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Parse a configuration document. Paths are left as written.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load a configuration file, anchoring relative paths at its directory.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| IngestError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        tracing::debug!(path = %path.display(), feeds = config.feeds.len(), "loaded run config");
        Ok(config.anchored_at(base))
    }

    /// Rewrite relative paths as relative to `base`.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.codes = self.codes.map(anchor);
        self.output_dir = anchor(self.output_dir);
        for feed in &mut self.feeds {
            feed.path = anchor(std::mem::take(&mut feed.path));
        }
        self
    }

    /// The code registry: from `codes` if set, else built in.
    pub fn registry(&self) -> Result<CodeRegistry, IngestError> {
        match &self.codes {
            Some(path) => Ok(CodeRegistry::load(path)?),
            None => Ok(CodeRegistry::builtin()),
        }
    }

    /// The ISO country table extended with the configured aliases.
    pub fn resolver(&self) -> Result<CountryTable, IngestError> {
        self.aliases
            .iter()
            .try_fold(CountryTable::iso3166(), |table, (alias, code)| {
                table.with_alias(alias, code)
            })
            .map_err(IngestError::Alias)
    }

    /// Options for opening the output store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            fresh_counters: self.fresh_counters,
            wrap_width: self.wrap_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::FeedKind;
    use cpn_core::JurisdictionResolver;

    #[test]
    fn empty_document_is_default() {
        let config = RunConfig::from_yaml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("policies"));
        assert_eq!(config.wrap_width, 78);
        assert_eq!(config.coverage, CoverageMode::First);
    }

    #[test]
    fn parses_all_fields() {
        let config = RunConfig::from_yaml(
            "codes: structure.yaml\n\
             output_dir: out\n\
             coverage: all\n\
             strict_jurisdictions: true\n\
             fresh_counters: true\n\
             wrap_width: 100\n\
             aliases:\n  South Korea: KOR\n\
             feeds:\n  - kind: cd-links\n    path: cd-links.yaml\n",
        )
        .unwrap();
        assert_eq!(config.codes, Some(PathBuf::from("structure.yaml")));
        assert_eq!(config.coverage, CoverageMode::All);
        assert!(config.strict_jurisdictions);
        assert!(config.fresh_counters);
        assert_eq!(config.wrap_width, 100);
        assert_eq!(config.feeds[0].kind, FeedKind::CdLinks);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RunConfig::from_yaml("output: x\n").is_err());
        assert!(RunConfig::from_yaml("coverage: some\n").is_err());
    }

    #[test]
    fn load_anchors_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cpn.yaml");
        std::fs::write(
            &path,
            "feeds:\n  - kind: commit\n    path: data/commit.yaml\n  - kind: commit\n    path: /abs/commit.yaml\n",
        )
        .unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, tmp.path().join("policies"));
        assert_eq!(config.feeds[0].path, tmp.path().join("data/commit.yaml"));
        assert_eq!(config.feeds[1].path, PathBuf::from("/abs/commit.yaml"));
    }

    #[test]
    fn aliases_extend_the_resolver() {
        let config = RunConfig::from_yaml("aliases:\n  South Korea: KOR\n").unwrap();
        let table = config.resolver().unwrap();
        let korea = table.resolve("south korea").unwrap();
        assert_eq!(korea.alpha_3.as_str(), "KOR");

        let bad = RunConfig::from_yaml("aliases:\n  Atlantis: ATL\n").unwrap();
        assert!(matches!(bad.resolver(), Err(IngestError::Alias(_))));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = RunConfig::load(Path::new("/nonexistent/cpn.yaml")).unwrap_err();
        assert!(matches!(err, IngestError::ConfigRead { .. }));
    }
}
