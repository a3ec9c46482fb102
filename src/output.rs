//! CSV output for harvested rows.
//!
//! Two tables are written side by side: the full row set and a copy without
//! the `abstract` column at `<name>_noabs.csv`.

use crate::error::{HarvestError, Result};
use crate::record::{PaperRecord, CANONICAL_COLUMNS};
use std::path::{Path, PathBuf};
use tracing::info;

/// Provenance column, always present
pub const SOURCE_COLUMN: &str = "source";

/// Flag column, present only when some row carries the flag
pub const CITED_BY_EMPTY_COLUMN: &str = "cited_by_empty";

/// Suffix inserted before `.csv` for the abstract-stripped table
const NOABS_SUFFIX: &str = "_noabs";

/// Paths of the two written tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub full: PathBuf,
    pub noabs: PathBuf,
}

/// `harvest.csv` becomes `harvest_noabs.csv`
pub fn noabs_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let stem = raw.strip_suffix(".csv").unwrap_or(&*raw);
    PathBuf::from(format!("{}{}.csv", stem, NOABS_SUFFIX))
}

/// Header for a row set, in the fixed column order.
pub fn columns(rows: &[PaperRecord], include_abstract: bool) -> Vec<&'static str> {
    let mut cols: Vec<&'static str> = CANONICAL_COLUMNS
        .iter()
        .copied()
        .filter(|c| include_abstract || *c != "abstract")
        .collect();
    cols.push(SOURCE_COLUMN);
    if rows.iter().any(|r| r.cited_by_empty.is_some()) {
        cols.push(CITED_BY_EMPTY_COLUMN);
    }
    cols
}

/// Write one table.
pub fn write_rows(path: &Path, rows: &[PaperRecord], include_abstract: bool) -> Result<()> {
    let header = columns(rows, include_abstract);
    let with_flag = header.contains(&CITED_BY_EMPTY_COLUMN);

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(&header)?;

    for row in rows {
        let mut values = row.field_values();
        if !with_flag {
            values.pop();
        }
        if !include_abstract {
            values.remove(2);
        }
        wtr.write_record(&values)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the full and abstract-stripped tables.
pub fn write_outputs(path: &Path, rows: &[PaperRecord]) -> Result<OutputPaths> {
    if rows.is_empty() {
        return Err(HarvestError::Config(format!(
            "Refusing to write an empty result set to {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    write_rows(path, rows, true)?;
    info!(rows = rows.len(), path = %path.display(), "Wrote papers");

    let noabs = noabs_path(path);
    write_rows(&noabs, rows, false)?;
    info!(rows = rows.len(), path = %noabs.display(), "Wrote no-abstracts file");

    Ok(OutputPaths {
        full: path.to_path_buf(),
        noabs,
    })
}
