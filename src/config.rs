// src/config.rs
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "REPORT_";
pub const DEFAULT_INPUT_DIR: &str = "redmine";
pub const DEFAULT_OUTPUT_PATH: &str = "report_output.csv";
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_input_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DIR)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReportConfig {
    /// Directory searched for timesheet exports (REPORT_INPUT_DIR).
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Report destination when none is given on the command line (REPORT_OUTPUT_PATH).
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// tracing filter directive (REPORT_LOG_LEVEL).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_path: default_output_path(),
            log_level: default_log_level(),
        }
    }
}

impl ReportConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::prefixed(ENV_PREFIX).from_env::<ReportConfig>()
    }
}
