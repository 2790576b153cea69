// crates/ca-ledger-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared fixtures for CA configuration tests.
// Purpose: Write throwaway config documents and assert on load failures.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::fs;
use std::path::PathBuf;

use ca_ledger_config::CaConfig;
use ca_ledger_config::ConfigError;
use tempfile::TempDir;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Minimal valid TOML document with one CA.
pub const MINIMAL_TOML: &str = r#"
[[ca]]
name = "/example"
freshness_period_secs = 720
validity_period_days = 360
challenges = ["PIN"]
"#;

/// Writes `content` to `file_name` inside a fresh temporary directory.
pub fn write_config(file_name: &str, content: &str) -> Result<(TempDir, PathBuf), String> {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join(file_name);
    fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok((dir, path))
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid(result: Result<CaConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

/// Returns a one-CA TOML document with `extra` appended to the section.
pub fn ca_toml(extra: &str) -> String {
    format!("{MINIMAL_TOML}{extra}\n")
}
