pub mod json;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

use crate::parser;
use crate::store::FileStore;
use crate::utils::Config;

/// Generate a report from a result tree file.
///
/// `results_path` and screenshot paths inside the tree resolve against `workdir`.
pub async fn generate_report(
    results_path: &Path,
    project_id: &str,
    workdir: &Path,
    output: Option<&Path>,
) -> Result<types::RunReport> {
    let mut config = Config::with_workdir(workdir);
    config.results_file = results_path.to_path_buf();

    let store = FileStore::new(&config);
    let report = parser::parse_results(&store, project_id, config.screenshot_limit)
        .with_context(|| format!("Failed to parse {}", config.results_path().display()))?;

    json::generate(&report, output).await?;
    Ok(report)
}
