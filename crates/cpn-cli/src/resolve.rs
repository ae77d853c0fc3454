//! `cpn resolve`: show how jurisdiction names resolve, including configured
//! aliases.

use anyhow::Result;
use clap::Args;
use cpn_core::JurisdictionResolver;
use cpn_ingest::RunConfig;

/// Arguments for `cpn resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Jurisdiction names to look up.
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Execute `cpn resolve`.
pub fn run_resolve(args: &ResolveArgs, config: &RunConfig) -> Result<u8> {
    let table = config.resolver()?;
    for line in lookup(&table, &args.names) {
        println!("{line}");
    }
    Ok(0)
}

fn lookup(resolver: &dyn JurisdictionResolver, names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| match resolver.resolve(name) {
            Some(country) => format!("{name}\t{}", country.alpha_3),
            None => format!("{name}\tunresolved"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpn_core::CountryTable;

    #[test]
    fn resolves_and_flags_misses() {
        let names = vec!["Germany".to_string(), "Atlantis".to_string()];
        let lines = lookup(&CountryTable::iso3166(), &names);
        assert_eq!(lines, vec!["Germany\tDEU", "Atlantis\tunresolved"]);
    }
}
