use super::types::RunReport;
use anyhow::Result;
use std::path::Path;

/// Pretty JSON, the format used for every persisted report
pub fn to_pretty(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Generate JSON report
pub async fn generate(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let json = to_pretty(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
