//! `cpn codes`: validate a code-list file and print what it enables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cpn_core::CodeRegistry;
use cpn_ingest::RunConfig;

/// Arguments for `cpn codes`.
#[derive(Args, Debug, Default)]
pub struct CodesArgs {
    /// Code-list YAML file (default: from config, else built-in lists).
    #[arg(long)]
    pub codes: Option<PathBuf>,
}

/// Execute `cpn codes`.
pub fn run_codes(args: &CodesArgs, config: &RunConfig) -> Result<u8> {
    let registry = match args.codes.as_deref().or(config.codes.as_deref()) {
        Some(path) => CodeRegistry::load(path)
            .with_context(|| format!("loading code lists from {}", path.display()))?,
        None => CodeRegistry::builtin(),
    };
    print!("{}", render(&registry)?);
    Ok(0)
}

fn render(registry: &CodeRegistry) -> Result<String> {
    serde_yaml::to_string(&registry.code_lists()).context("rendering code lists")
}
