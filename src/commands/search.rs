use anyhow::Result;
use log::debug;

use crate::registry::{PackageSummary, Registry};
use crate::runtime::Runtime;

use super::config::Config;

/// Search the registry and print the matches
#[tracing::instrument(skip(config))]
pub async fn search<R: Runtime, G: Registry>(term: &str, config: &Config<R, G>) -> Result<()> {
    let results = config.registry.search(term).await?;
    debug!("Registry returned {} result(s)", results.len());
    println!("{}", format_search_results(term, &results));
    Ok(())
}

pub(crate) fn format_search_results(term: &str, results: &[PackageSummary]) -> String {
    if results.is_empty() {
        return format!("No packages found matching '{}'.", term);
    }

    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut lines = vec![format!(
        "Found {} package(s) matching '{}':",
        results.len(),
        term
    )];
    for result in results {
        match result.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => {
                lines.push(format!("  {:<width$}  {}", result.name, description, width = width))
            }
            None => lines.push(format!("  {}", result.name)),
        }
    }
    lines.join("\n")
}
