// src/report_io.rs
use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info};

use crate::overtime_allocation::allocate_overtime;
use crate::report_error::{ReportError, ReportResult};
use crate::report_table::{build_report, ReportTable};
use crate::timesheet_loader::load_day_groups;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CSV_EXTENSION: &str = "csv";

// --- Input Discovery ---

fn is_csv_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(CSV_EXTENSION))
}

/// Returns the most recently modified CSV file in `dir`.
/// Equal modification times are resolved by the greater file name.
pub fn find_latest_csv(dir: &Path) -> ReportResult<PathBuf> {
    if !dir.is_dir() {
        return Err(ReportError::InputNotFound(dir.to_path_buf()));
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_csv_file(&path) {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        debug!("Candidate input {} (modified {:?})", path.display(), modified);
        let newer = match &latest {
            Some((best, best_path)) => (modified, &path) > (*best, best_path),
            None => true,
        };
        if newer {
            latest = Some((modified, path));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| ReportError::InputNotFound(dir.to_path_buf()))
}

/// Resolves the timesheet to read.
///
/// A bare file name is looked up inside `input_dir`; a path with a directory part
/// is used as given. Without an explicit input the newest CSV in `input_dir` wins.
pub fn resolve_input(explicit: Option<&Path>, input_dir: &Path) -> ReportResult<PathBuf> {
    let path = match explicit {
        Some(p) if p.parent().map_or(true, |parent| parent.as_os_str().is_empty()) => {
            input_dir.join(p)
        }
        Some(p) => p.to_path_buf(),
        None => find_latest_csv(input_dir)?,
    };

    if !path.is_file() {
        return Err(ReportError::InputNotFound(path));
    }
    Ok(path)
}

// --- Output ---

/// Renders the report as UTF-8 CSV with a byte-order mark.
pub fn render_csv(table: &ReportTable) -> ReportResult<Vec<u8>> {
    let mut buf = UTF8_BOM.to_vec();
    {
        let mut wtr = csv::WriterBuilder::new().from_writer(&mut buf);
        wtr.write_record(table.header())?;
        for record in table.records() {
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
    }
    Ok(buf)
}

/// Writes `bytes` next to `path` first and renames it into place, so a failed run
/// never leaves a truncated report behind.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> ReportResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = (|| -> ReportResult<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

// --- Pipeline ---

/// Loader -> allocator -> reshaper, fully in memory.
pub fn build_report_from_reader<R: Read>(reader: R) -> ReportResult<ReportTable> {
    let groups = load_day_groups(reader)?;
    let records = allocate_overtime(&groups);
    Ok(build_report(&records))
}

pub fn generate_report(input: &Path, output: &Path) -> ReportResult<ReportTable> {
    info!("Reading timesheet from {}", input.display());
    let file = File::open(input)?;
    let table = build_report_from_reader(BufReader::new(file))?;

    let bytes = render_csv(&table)?;
    write_atomically(output, &bytes)?;
    info!(
        "Report written to {} ({} rows, {} bytes)",
        output.display(),
        table.rows.len(),
        bytes.len()
    );
    Ok(table)
}
