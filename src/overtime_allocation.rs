// src/overtime_allocation.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::timesheet_loader::DayGroup;

/// Length of the standard workday; anything logged beyond it on a date is overtime.
pub const STANDARD_WORKDAY_HOURS: Decimal = dec!(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HoursCategory {
    Regular,
    Overtime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedRecord {
    pub project: String,
    pub phase: String,
    pub date: NaiveDate,
    pub category: HoursCategory,
    pub hours: Decimal,
}

/// Regular/overtime split for a single day group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoursSplit {
    pub regular: Decimal,
    pub overtime: Decimal,
}

pub fn overtime_budget(total: Decimal) -> Decimal {
    (total - STANDARD_WORKDAY_HOURS).max(Decimal::ZERO)
}

/// Splits one day's entries into regular and overtime hours.
///
/// Entries are visited longest first (ties keep their input order) and each one
/// absorbs as much of the remaining overtime as its own hours allow. The returned
/// splits are indexed like `day_hours`.
pub fn split_day(day_hours: &[Decimal]) -> Vec<HoursSplit> {
    let total: Decimal = day_hours.iter().copied().sum();
    let mut overtime_remaining = overtime_budget(total);

    let mut splits: Vec<HoursSplit> = day_hours
        .iter()
        .map(|&hours| HoursSplit {
            regular: hours,
            overtime: Decimal::ZERO,
        })
        .collect();

    if overtime_remaining.is_zero() {
        return splits;
    }

    let mut order: Vec<usize> = (0..day_hours.len()).collect();
    // sort_by is stable, so equal hours stay in input order.
    order.sort_by(|&a, &b| day_hours[b].cmp(&day_hours[a]));

    for idx in order {
        if overtime_remaining.is_zero() {
            break;
        }
        let hours = day_hours[idx];
        let take = hours.min(overtime_remaining);
        splits[idx] = HoursSplit {
            regular: hours - take,
            overtime: take,
        };
        overtime_remaining -= take;
    }

    splits
}

/// Allocates every day group into a REGULAR and an OVERTIME record.
///
/// Groups are pooled per date across all projects and phases; within a date the
/// order of `groups` is the tie-break order for equal hours.
pub fn allocate_overtime(groups: &[DayGroup]) -> Vec<AllocatedRecord> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&DayGroup>> = BTreeMap::new();
    for group in groups {
        by_date.entry(group.date).or_default().push(group);
    }

    let mut records = Vec::with_capacity(groups.len() * 2);
    let mut overtime_days = 0usize;

    for (date, day) in &by_date {
        let day_hours: Vec<Decimal> = day.iter().map(|g| g.hours).collect();
        let splits = split_day(&day_hours);

        let total: Decimal = day_hours.iter().copied().sum();
        let budget = overtime_budget(total);
        if !budget.is_zero() {
            overtime_days += 1;
        }
        debug!(
            "Allocated {}: {} entries, total {}h, overtime {}h",
            date,
            day.len(),
            total,
            budget
        );

        for (group, split) in day.iter().zip(splits) {
            for (category, hours) in [
                (HoursCategory::Regular, split.regular),
                (HoursCategory::Overtime, split.overtime),
            ] {
                records.push(AllocatedRecord {
                    project: group.project.clone(),
                    phase: group.phase.clone(),
                    date: *date,
                    category,
                    hours,
                });
            }
        }
    }

    info!(
        "Allocated {} day groups over {} dates ({} with overtime)",
        groups.len(),
        by_date.len(),
        overtime_days
    );
    records
}
