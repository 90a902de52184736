// Record persistence and report generation

use crate::error::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use strata_scanner::{WalkOutcome, WalkRecord};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Sqlite,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "sqlite" | "db" => Some(OutputFormat::Sqlite),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Sqlite => "db",
        }
    }
}

/// Write-once destination for the records of a walk.
pub trait RecordSink {
    /// Persist `records` for `source_name`, returning where they went.
    fn save(&self, records: &[WalkRecord], source_name: &str) -> Result<PathBuf>;
}

/// Dumps records as a pretty-printed JSON array to `<output_dir>/<source_name>.json`.
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, source_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", source_name))
    }
}

impl RecordSink for JsonFileSink {
    fn save(&self, records: &[WalkRecord], source_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(source_name);
        save_report(&serde_json::to_string_pretty(records)?, &path)?;
        info!("Saved {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

/// Terminal frontier as JSON, for seeding a second-stage process.
pub fn generate_terminal_json(outcome: &WalkOutcome) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&outcome.terminal)
}

/// Human-readable summary of a walk, grouped by depth.
pub fn generate_walk_report(outcome: &WalkOutcome) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  URLs recorded: {}\n", outcome.records.len()));
    report.push_str(&format!("  Depth levels reached: {}\n", outcome.depths_reached()));
    report.push_str(&format!("  Terminal frontier: {}\n", outcome.terminal.len()));
    report.push_str(&format!(
        "  Generated: {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for depth in 0..outcome.depths_reached() {
        let records: Vec<&WalkRecord> = outcome.records_at(depth).collect();
        report.push_str(&format!("## Depth {}\n", depth));
        report.push_str(&format!("  {} URLs\n\n", records.len()));

        for record in records {
            let path = if record.path.is_empty() {
                "(no text)".dimmed().to_string()
            } else {
                record.path.bright_white().to_string()
            };
            report.push_str(&format!("  {} {}\n", path, record.url.dimmed()));
        }
        report.push('\n');
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
