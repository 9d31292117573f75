// src/timesheet_loader.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::{collections::BTreeMap, io::Read};
use tracing::{debug, info, warn};

use crate::report_error::{ReportError, ReportResult};

// --- Input Column Names ---

pub const COL_PROJECT: &str = "プロジェクト";
pub const COL_PHASE: &str = "工程";
pub const COL_PHASE_INACTIVE: &str = "工程(不稼働)";
pub const COL_DATE: &str = "日付";
pub const COL_HOURS: &str = "時間";

// Redmine exports use either separator depending on locale.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Upper bound for a single logged cell; a day has no more hours than this.
pub const MAX_HOURS_PER_ENTRY: Decimal = dec!(24);

// --- Core Data Structures ---

/// One raw timesheet row, before phase resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub project: String,
    pub phase: Option<String>,
    pub phase_inactive: Option<String>,
    pub date: NaiveDate,
    pub hours: Decimal,
}

impl TimeEntry {
    /// The active phase wins; the inactive-phase column is the fallback.
    pub fn resolved_phase(&self) -> Option<&str> {
        self.phase.as_deref().or(self.phase_inactive.as_deref())
    }
}

/// All hours logged against one (project, phase, date), summed.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub project: String,
    pub phase: String,
    pub date: NaiveDate,
    pub hours: Decimal,
}

struct ColumnIndex {
    project: usize,
    phase: usize,
    phase_inactive: usize,
    date: usize,
    hours: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> ReportResult<Self> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let find = |column: &str| -> ReportResult<usize> {
            names
                .iter()
                .position(|name| *name == column)
                .ok_or_else(|| ReportError::MissingColumn(column.to_string()))
        };

        Ok(Self {
            project: find(COL_PROJECT)?,
            phase: find(COL_PHASE)?,
            phase_inactive: find(COL_PHASE_INACTIVE)?,
            date: find(COL_DATE)?,
            hours: find(COL_HOURS)?,
        })
    }
}

fn non_empty(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn invalid_field(line: u64, column: &str, value: &str) -> ReportError {
    ReportError::InvalidField {
        line,
        column: column.to_string(),
        value: value.to_string(),
    }
}

pub fn parse_entry_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn parse_entry(record: &csv::StringRecord, cols: &ColumnIndex) -> ReportResult<TimeEntry> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();

    let raw_date = record.get(cols.date).unwrap_or("").trim();
    let date = parse_entry_date(raw_date).ok_or_else(|| invalid_field(line, COL_DATE, raw_date))?;

    // A blank hours cell counts as zero hours.
    let raw_hours = record.get(cols.hours).unwrap_or("").trim();
    let hours = if raw_hours.is_empty() {
        debug!("Blank hours on line {}, counting as 0", line);
        Decimal::ZERO
    } else {
        Decimal::from_str(raw_hours)
            .ok()
            .filter(|h| !h.is_sign_negative() && *h <= MAX_HOURS_PER_ENTRY)
            .ok_or_else(|| invalid_field(line, COL_HOURS, raw_hours))?
    };

    Ok(TimeEntry {
        project: non_empty(record, cols.project).unwrap_or_default(),
        phase: non_empty(record, cols.phase),
        phase_inactive: non_empty(record, cols.phase_inactive),
        date,
        hours,
    })
}

/// Reads every row of a timesheet export into typed entries.
/// Fails on a missing required column, on a date that does not parse, or on an
/// hours value that is not a number in `0..=24`.
pub fn read_time_entries<R: Read>(reader: R) -> ReportResult<Vec<TimeEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let cols = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        entries.push(parse_entry(&record, &cols)?);
    }
    debug!("Read {} raw timesheet rows", entries.len());
    Ok(entries)
}

/// Resolves phases and sums hours per (project, phase, date).
/// Rows without any phase are dropped. The result is ordered by (project, phase, date).
pub fn group_by_day(entries: &[TimeEntry]) -> ReportResult<Vec<DayGroup>> {
    let mut grouped: BTreeMap<(String, String, NaiveDate), Decimal> = BTreeMap::new();
    let mut dropped = 0usize;

    for entry in entries {
        let Some(phase) = entry.resolved_phase() else {
            warn!(
                "Dropping row without phase: project='{}', date={}, hours={}",
                entry.project, entry.date, entry.hours
            );
            dropped += 1;
            continue;
        };
        *grouped
            .entry((entry.project.clone(), phase.to_string(), entry.date))
            .or_insert(Decimal::ZERO) += entry.hours;
    }

    if grouped.is_empty() {
        return Err(ReportError::EmptyInput);
    }

    info!(
        "Normalized {} rows into {} day groups ({} dropped)",
        entries.len(),
        grouped.len(),
        dropped
    );

    Ok(grouped
        .into_iter()
        .map(|((project, phase, date), hours)| DayGroup {
            project,
            phase,
            date,
            hours,
        })
        .collect())
}

pub fn load_day_groups<R: Read>(reader: R) -> ReportResult<Vec<DayGroup>> {
    let entries = read_time_entries(reader)?;
    group_by_day(&entries)
}
