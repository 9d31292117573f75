// src/report_error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No timesheet input found: {0}")]
    InputNotFound(PathBuf),
    #[error("Required column '{0}' is missing from the timesheet header")]
    MissingColumn(String),
    #[error("Timesheet contains no usable rows after normalization")]
    EmptyInput,
    #[error("Invalid value '{value}' in column '{column}' on line {line}")]
    InvalidField {
        line: u64,
        column: String,
        value: String,
    },
    // Non-fatal: callers fall back to a blank project number.
    #[error("Project '{0}' has no leading project number")]
    UnparseableProject(String),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
