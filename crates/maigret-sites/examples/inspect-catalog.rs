//! Example: Load a site catalog and summarize it.
//!
//! Usage: `cargo run -p maigret-sites --example inspect-catalog -- data.json`

use maigret_sites::{CatalogLoader, DetectionStrategy};
use std::collections::BTreeMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "data.json".to_string());
    println!("Loading site catalog from {path}...\n");

    let report = match CatalogLoader::new(&path).and_then(|loader| loader.load()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("\nFetch the catalog first with `maigret --update`.");
            return Err(Box::new(e));
        }
    };

    println!("✓ {} usable sites", report.registry.len());

    let mut by_strategy: BTreeMap<&str, usize> = BTreeMap::new();
    let mut patterned = 0;
    for rule in &report.registry {
        *by_strategy.entry(rule.strategy.kind()).or_default() += 1;
        if rule.username_pattern.is_some() {
            patterned += 1;
        }
        if let DetectionStrategy::ResponseUrl { not_found_url } = &rule.strategy {
            println!("  • {} redirects missing users to {}", rule.name, not_found_url);
        }
    }

    println!();
    for (kind, count) in &by_strategy {
        println!("  {kind}: {count}");
    }
    println!("  with regexCheck: {patterned}");

    if !report.rejected.is_empty() {
        println!("\n⚠ {} entries rejected:", report.rejected.len());
        for error in &report.rejected {
            println!("  {}: {}", error.site, error.reason);
        }
    }

    Ok(())
}
