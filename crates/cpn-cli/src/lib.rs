//! # cpn-cli: Command-Line Interface
//!
//! Provides the `cpn` binary.
//!
//! ## Subcommands
//!
//! - `cpn normalize`: map feeds onto the common model and write one YAML
//!   file per policy.
//! - `cpn codes`: validate and print the enabled code lists.
//! - `cpn resolve`: look up jurisdiction names.
//!
//! ```bash
//! cpn normalize --feed new-climate=new-climate.yaml --feed cd-links=cd-links.yaml
//! cpn -v --config cpn.yaml normalize --coverage all
//! cpn resolve Germany "Korea, Republic of" Atlantis
//! ```

pub mod codes;
pub mod normalize;
pub mod resolve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cpn_ingest::RunConfig;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG: &str = "cpn.yaml";

/// Load the run configuration.
///
/// An explicit path must exist. Without one, `cpn.yaml` in `cwd` is used if
/// present, else the defaults.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<RunConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG);
            if !candidate.is_file() {
                tracing::debug!("no {DEFAULT_CONFIG} found; using defaults");
                return Ok(RunConfig::default());
            }
            candidate
        }
    };
    RunConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Current directory, or `.` if it cannot be determined.
pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn default_config_is_picked_up_from_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG), "wrap_width: 90\n").unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.wrap_width, 90);
        assert_eq!(config.output_dir, dir.path().join("policies"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml")), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("nope.yaml"));
    }
}
