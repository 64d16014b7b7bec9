use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::export_filename;
use crate::models::{MarketEntry, MarketReport};

const HEADER: [&str; 7] = [
    "rank",
    "symbol",
    "beta",
    "samples",
    "price_change_pct",
    "last_close",
    "risk_level",
];

fn record(e: &MarketEntry) -> [String; 7] {
    [
        e.rank.to_string(),
        e.symbol.clone(),
        format!("{:.6}", e.beta.value()),
        e.sample_count.to_string(),
        format!("{:.4}", e.price_change.as_percent()),
        format!("{}", e.last_close),
        e.risk_level.to_string(),
    ]
}

/// Header plus one row per ranked symbol.
fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, report: &MarketReport) -> Result<()> {
    wtr.write_record(HEADER)?;
    for entry in &report.entries {
        wtr.write_record(record(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

/// The market ranking as CSV text, every ranked symbol included.
pub fn market_csv(report: &MarketReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_rows(&mut wtr, report)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV buffer: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// Helper function to create a new file and any missing parent directories.
fn create_file_with_parents(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

/// Writes the market ranking into `directory`, named after benchmark, start and session.
pub fn write_market_csv(report: &MarketReport, directory: &Path) -> Result<PathBuf> {
    let filename = export_filename(
        &report.benchmark,
        report.range.start_ms,
        &report.session.to_string(),
    );
    let path = directory.join(filename);
    let file = create_file_with_parents(&path)?;
    let mut wtr = csv::Writer::from_writer(file);
    write_rows(&mut wtr, report)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    log::info!(
        "Exported {} row(s) to {}",
        report.entries.len(),
        path.display()
    );
    Ok(path)
}
