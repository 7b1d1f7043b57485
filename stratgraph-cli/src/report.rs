//! Batch validation results and their CSV form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use stratgraph_core::validate::ValidationReport;

/// One validated file.
pub struct FileReport {
    pub path: PathBuf,
    pub report: ValidationReport,
}

/// Export batch results as CSV, one row per error.
///
/// Columns: file, status, code, block_id, message. A valid file gets a single
/// row with empty code, block_id, and message.
pub fn validation_csv(reports: &[FileReport]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["file", "status", "code", "block_id", "message"])?;

    for r in reports {
        let file = r.path.display().to_string();
        if r.report.errors.is_empty() {
            wtr.write_record([file.as_str(), "valid", "", "", ""])?;
            continue;
        }
        for e in &r.report.errors {
            wtr.write_record([
                file.as_str(),
                "invalid",
                e.code.as_str(),
                e.block_id.as_ref().map_or("", |id| id.as_str()),
                e.display_message(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}
