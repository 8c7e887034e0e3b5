//! CSV export for per-period dispatch results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::SimulationResult;

/// Column suffixes after the leading `period` column, prefixed with the commodity name.
const COLUMNS: &[&str] = &[
    "out",
    "soc",
    "charge",
    "discharge",
    "unmet_demand",
    "unused_commodity",
];

/// Header row for `commodity`, with the flexible profile column when present.
pub fn header(commodity: &str, with_flexible: bool) -> Vec<String> {
    let mut cols = vec!["period".to_string()];
    cols.extend(COLUMNS.iter().map(|c| format!("{commodity}_{c}")));
    if with_flexible {
        cols.push(format!("{commodity}_flexible_demand_profile"));
    }
    cols
}

/// Exports a result to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(result: &SimulationResult, commodity: &str, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(result, commodity, io::BufWriter::new(file))
}

/// Writes a result as CSV to any writer. Output is deterministic.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(result: &SimulationResult, commodity: &str, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    let flexible = result.flexible_demand();

    wtr.write_record(header(commodity, flexible.is_some()))?;

    for (t, r) in result.records().iter().enumerate() {
        let mut row = vec![
            t.to_string(),
            format!("{:.6}", r.output),
            format!("{:.6}", r.soc),
            format!("{:.6}", r.charge),
            format!("{:.6}", r.discharge),
            format!("{:.6}", r.unmet_demand),
            format!("{:.6}", r.unused_commodity),
        ];
        if let Some(profile) = flexible {
            row.push(format!("{:.6}", profile[t]));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
