use crate::types::IssueKey;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "reqflow.yaml";

pub const REQUIREMENTS_RAW_FILE: &str = "requirements_raw.txt";
pub const REQUIREMENTS_FILE: &str = "requirements.json";
pub const RUN_REPORT_FILE: &str = "run-report.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn requirements_raw_path(out_dir: &Path) -> PathBuf {
    out_dir.join(REQUIREMENTS_RAW_FILE)
}

pub fn requirements_path(out_dir: &Path) -> PathBuf {
    out_dir.join(REQUIREMENTS_FILE)
}

pub fn test_cases_raw_path(out_dir: &Path, key: &IssueKey) -> PathBuf {
    out_dir.join(format!("test_cases_raw_{key}.txt"))
}

pub fn test_cases_path(out_dir: &Path, key: &IssueKey) -> PathBuf {
    out_dir.join(format!("test_cases_{key}.json"))
}

pub fn run_report_path(out_dir: &Path) -> PathBuf {
    out_dir.join(RUN_REPORT_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
