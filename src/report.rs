//! Human- and machine-readable change reports.
//!
//! The reporter runs last, against the same merge tallies the summary is
//! printed from. It owns exactly two side effects, the text and JSON
//! report files, and a failure here never fails the pipeline.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::merge::ClassTally;
use crate::store::BACKUP_STAMP_FMT;

/// Example change descriptions included per entity class.
pub(crate) const MAX_REPORT_EXAMPLES: usize = 50;

#[derive(Debug, Serialize)]
pub(crate) struct ClassReport {
    pub(crate) name: String,
    pub(crate) added: usize,
    pub(crate) modified: usize,
    pub(crate) preserved: usize,
    pub(crate) renamed: usize,
    pub(crate) changes: Vec<String>,
    pub(crate) changes_omitted: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangeReport {
    pub(crate) generated_at: String,
    pub(crate) cycles: Vec<String>,
    pub(crate) classes: Vec<ClassReport>,
}

pub(crate) fn build_report(
    cycles: &[String],
    tallies: &[(String, ClassTally)],
    generated_at: &DateTime<Utc>,
) -> ChangeReport {
    ChangeReport {
        generated_at: generated_at.to_rfc3339(),
        cycles: cycles.to_vec(),
        classes: tallies
            .iter()
            .map(|(name, tally)| {
                let shown = tally.changes.len().min(MAX_REPORT_EXAMPLES);
                ClassReport {
                    name: name.clone(),
                    added: tally.added,
                    modified: tally.modified,
                    preserved: tally.preserved,
                    renamed: tally.renamed,
                    changes: tally.changes[..shown].to_vec(),
                    changes_omitted: tally.changes.len() - shown,
                }
            })
            .collect(),
    }
}

pub(crate) fn render_text(report: &ChangeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "navsync change report");
    let _ = writeln!(out, "generated: {}", report.generated_at);
    let _ = writeln!(out, "cycles: {}", report.cycles.join(", "));
    for class in &report.classes {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ==", class.name);
        let _ = writeln!(
            out,
            "added {} | modified {} | renamed {} | preserved {}",
            class.added, class.modified, class.renamed, class.preserved
        );
        for change in &class.changes {
            let _ = writeln!(out, "  {change}");
        }
        if class.changes_omitted > 0 {
            let _ = writeln!(out, "  (and {} more)", class.changes_omitted);
        }
    }
    out
}

/// Write both report files and return their paths.
pub(crate) fn write_reports(
    report_dir: &Path,
    cycles: &[String],
    tallies: &[(String, ClassTally)],
    generated_at: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(report_dir).map_err(|e| SyncError::io(e, report_dir))?;
    let stamp = generated_at.format(BACKUP_STAMP_FMT).to_string();
    let report = build_report(cycles, tallies, &generated_at);

    let text_path = report_dir.join(format!("changes_{stamp}.txt"));
    fs::write(&text_path, render_text(&report)).map_err(|e| SyncError::io(e, &text_path))?;

    let json_path = report_dir.join(format!("changes_{stamp}.json"));
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| SyncError::data(&json_path, e.to_string()))?;
    fs::write(&json_path, json).map_err(|e| SyncError::io(e, &json_path))?;

    Ok((text_path, json_path))
}
