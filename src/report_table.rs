// src/report_table.rs
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

use crate::overtime_allocation::{AllocatedRecord, HoursCategory};
use crate::report_error::{ReportError, ReportResult};

// --- Output Column Names ---

pub const COL_PROJECT_NUMBER: &str = "プロジェクト番号";
pub const COL_PROJECT_NAME: &str = "プロジェクト名";
pub const COL_PHASE: &str = "工程";
pub const COL_CATEGORY: &str = "業務時間";
pub const COL_ROW_TOTAL: &str = "合計時間";

pub const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d";

static PROJECT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*(.*)$").expect("project code pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportCategory {
    Regular,
    Overtime,
    RegularTotal,
    OvertimeTotal,
}

impl ReportCategory {
    pub fn label(self) -> &'static str {
        match self {
            ReportCategory::Regular => "定時内",
            ReportCategory::Overtime => "定時外",
            ReportCategory::RegularTotal => "定時内合計",
            ReportCategory::OvertimeTotal => "定時外合計",
        }
    }

    #[cfg(test)]
    pub fn is_summary(self) -> bool {
        matches!(
            self,
            ReportCategory::RegularTotal | ReportCategory::OvertimeTotal
        )
    }
}

impl From<HoursCategory> for ReportCategory {
    fn from(category: HoursCategory) -> Self {
        match category {
            HoursCategory::Regular => ReportCategory::Regular,
            HoursCategory::Overtime => ReportCategory::Overtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub project_number: String,
    pub project_name: String,
    pub phase: String,
    pub category: ReportCategory,
    /// One value per entry of `ReportTable::dates`.
    pub hours: Vec<Decimal>,
    pub total: Decimal,
}

impl ReportRow {
    fn new(
        project_number: String,
        project_name: String,
        phase: String,
        category: ReportCategory,
        hours: Vec<Decimal>,
    ) -> Self {
        let total: Decimal = hours.iter().copied().sum();
        Self {
            project_number,
            project_name,
            phase,
            category,
            hours,
            total,
        }
    }
}

/// Dense project x phase x category by date matrix, summary rows last.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<ReportRow>,
}

/// Splits "101 Alpha" into ("101", "Alpha").
pub fn split_project(project: &str) -> ReportResult<(String, String)> {
    let caps = PROJECT_CODE_RE
        .captures(project)
        .ok_or_else(|| ReportError::UnparseableProject(project.to_string()))?;
    Ok((caps[1].to_string(), caps[2].trim().to_string()))
}

/// Every calendar day of `date`'s month, in order.
pub fn days_of_month(date: NaiveDate) -> Vec<NaiveDate> {
    let Some(first) = date.with_day(1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .collect()
}

/// All days of every month touched by `observed`, ascending.
pub fn densify_calendar<'a, I>(observed: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    let months: BTreeSet<(i32, u32)> = observed
        .into_iter()
        .map(|d| (d.year(), d.month()))
        .collect();

    months
        .into_iter()
        .filter_map(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
        .flat_map(days_of_month)
        .collect()
}

pub fn format_hours(hours: Decimal) -> String {
    hours.normalize().to_string()
}

fn format_cell(hours: Decimal) -> String {
    if hours.is_zero() {
        String::new()
    } else {
        format_hours(hours)
    }
}

fn summary_row(
    category: ReportCategory,
    source: ReportCategory,
    rows: &[ReportRow],
    width: usize,
) -> ReportRow {
    let mut hours = vec![Decimal::ZERO; width];
    for row in rows.iter().filter(|r| r.category == source) {
        for (sum, value) in hours.iter_mut().zip(&row.hours) {
            *sum += *value;
        }
    }
    ReportRow::new(String::new(), String::new(), String::new(), category, hours)
}

/// Pivots allocated records into the final report.
///
/// Projects without a leading number keep their raw text as the project name and a
/// blank project number.
pub fn build_report(records: &[AllocatedRecord]) -> ReportTable {
    let mut pivot: BTreeMap<(&str, &str, HoursCategory), BTreeMap<NaiveDate, Decimal>> =
        BTreeMap::new();
    for record in records {
        *pivot
            .entry((record.project.as_str(), record.phase.as_str(), record.category))
            .or_default()
            .entry(record.date)
            .or_insert(Decimal::ZERO) += record.hours;
    }

    let dates = densify_calendar(records.iter().map(|r| &r.date));
    let mut unparseable: HashSet<&str> = HashSet::new();

    let mut rows: Vec<ReportRow> = pivot
        .iter()
        .map(|(&(project, phase, category), by_date)| {
            let (project_number, project_name) = match split_project(project) {
                Ok(parts) => parts,
                Err(e) => {
                    if unparseable.insert(project) {
                        warn!("{}; keeping it with a blank project number", e);
                    }
                    (String::new(), project.trim().to_string())
                }
            };
            let hours = dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(Decimal::ZERO))
                .collect();
            ReportRow::new(
                project_number,
                project_name,
                phase.to_string(),
                category.into(),
                hours,
            )
        })
        .collect();

    let regular_total = summary_row(
        ReportCategory::RegularTotal,
        ReportCategory::Regular,
        &rows,
        dates.len(),
    );
    let overtime_total = summary_row(
        ReportCategory::OvertimeTotal,
        ReportCategory::Overtime,
        &rows,
        dates.len(),
    );
    rows.push(regular_total);
    rows.push(overtime_total);

    info!(
        "Built report with {} rows over {} date columns",
        rows.len(),
        dates.len()
    );
    ReportTable { dates, rows }
}

impl ReportTable {
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = vec![
            COL_PROJECT_NUMBER.to_string(),
            COL_PROJECT_NAME.to_string(),
            COL_PHASE.to_string(),
            COL_CATEGORY.to_string(),
        ];
        header.extend(
            self.dates
                .iter()
                .map(|d| d.format(DATE_COLUMN_FORMAT).to_string()),
        );
        header.push(COL_ROW_TOTAL.to_string());
        header
    }

    /// Rendered rows: zero date cells are blank, the row total is always numeric.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut fields = vec![
                    row.project_number.clone(),
                    row.project_name.clone(),
                    row.phase.clone(),
                    row.category.label().to_string(),
                ];
                fields.extend(row.hours.iter().map(|h| format_cell(*h)));
                fields.push(format_hours(row.total));
                fields
            })
            .collect()
    }

    #[cfg(test)]
    pub fn summary(&self, category: ReportCategory) -> Option<&ReportRow> {
        self.rows
            .iter()
            .find(|r| r.category == category && category.is_summary())
    }

    #[cfg(test)]
    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }
}
