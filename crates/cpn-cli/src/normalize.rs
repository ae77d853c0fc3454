//! `cpn normalize`: run the feeds through the pipeline into the output
//! directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use cpn_core::CoverageMode;
use cpn_ingest::{FeedSource, Pipeline, RunConfig, RunSummary};
use cpn_store::PolicyStore;

/// Arguments for `cpn normalize`. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct NormalizeArgs {
    /// Code-list YAML file (default: built-in lists).
    #[arg(long)]
    pub codes: Option<PathBuf>,

    /// Output directory for the policy files.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Feed to process, as KIND=PATH. Repeatable; replaces configured feeds.
    #[arg(long = "feed", value_name = "KIND=PATH")]
    pub feeds: Vec<FeedSource>,

    /// Jurisdictions kept per policy: first or all.
    #[arg(long, value_name = "MODE")]
    pub coverage: Option<CoverageMode>,

    /// Fail on jurisdiction names that do not resolve.
    #[arg(long)]
    pub strict_jurisdictions: bool,

    /// Number files from 1 regardless of existing output; never overwrites.
    #[arg(long)]
    pub fresh_counters: bool,

    /// Maximum YAML line width.
    #[arg(long, value_name = "COLUMNS")]
    pub wrap_width: Option<usize>,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl NormalizeArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(codes) = &self.codes {
            config.codes = Some(codes.clone());
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if !self.feeds.is_empty() {
            config.feeds = self.feeds.clone();
        }
        if let Some(mode) = self.coverage {
            config.coverage = mode;
        }
        if let Some(width) = self.wrap_width {
            config.wrap_width = width;
        }
        config.strict_jurisdictions |= self.strict_jurisdictions;
        config.fresh_counters |= self.fresh_counters;
        config
    }
}

/// Execute `cpn normalize`.
pub fn run_normalize(args: &NormalizeArgs, config: RunConfig) -> Result<u8> {
    let config = args.apply(config);
    if config.feeds.is_empty() {
        bail!("no feeds to process; pass --feed KIND=PATH or list feeds in the config");
    }

    let registry = config.registry().context("loading code lists")?;
    let resolver = config.resolver()?;
    let mut store = PolicyStore::open(&config.output_dir, config.store_options())
        .context("opening output directory")?;

    let summary = Pipeline::new(&registry, &resolver)
        .with_coverage(config.coverage)
        .strict_jurisdictions(config.strict_jurisdictions)
        .run(&config.feeds, &mut store)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &config);
    }
    Ok(0)
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    for (kind, count) in &summary.records {
        println!("  {kind:<12} {count} records");
    }
    for (shard, count) in &summary.files {
        println!("  {shard:<12} {count} files");
    }
    if summary.unresolved > 0 {
        println!("  {} jurisdiction names unresolved", summary.unresolved);
    }
    println!(
        "Wrote {} policies to {}",
        summary.written(),
        config.output_dir.display()
    );
}
