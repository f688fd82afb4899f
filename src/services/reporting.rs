//! Report serialization, format chosen by file extension.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Result, UploaderError};
use crate::models::ReportEntry;

/// Write the run report to `path` as pretty JSON (`.json`) or CSV
/// (`.csv`). Any other extension is a configuration error.
pub fn save_report(report: &BTreeMap<String, ReportEntry>, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => save_as_json(report, path)?,
        "csv" => save_as_csv(report, path)?,
        _ => return Err(UploaderError::UnsupportedReportFormat { extension }),
    }
    info!(path = %path.display(), "wrote submission report");
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    entries: &'a BTreeMap<String, ReportEntry>,
}

fn save_as_json(report: &BTreeMap<String, ReportEntry>, path: &Path) -> Result<()> {
    let wrapped = JsonReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        entries: report,
    };
    let json = serde_json::to_string_pretty(&wrapped)
        .map_err(|e| UploaderError::Config(format!("failed to serialize report: {}", e)))?;
    std::fs::write(path, json)?;
    Ok(())
}

fn save_as_csv(report: &BTreeMap<String, ReportEntry>, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "User Directory",
        "Student Name",
        "Student Email",
        "Student ID",
        "Submitted Files",
        "No Match Files",
        "No Submission Questions",
        "Errors",
    ])?;
    for (fname, entry) in report {
        let (name, email, id) = match &entry.student {
            Some(s) => (s.name.as_str(), s.email.as_str(), s.id.as_str()),
            None => ("", "", ""),
        };
        writer.write_record([
            fname.as_str(),
            name,
            email,
            id,
            &entry.submitted.join(", "),
            &entry.no_match.join(", "),
            &entry.no_submission.join(", "),
            &entry.errors.join("; "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
