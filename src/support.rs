// src/support.rs

//! Support-status lookup table
//!
//! Maps package names to an externally supplied support classification
//! (e.g. `l2`, `l3`, `unsupported`). Loaded from a `supportstatus.txt`
//! file of whitespace-separated `package status` lines; a missing file
//! simply yields an empty table.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct SupportStatus {
    statuses: HashMap<String, String>,
}

impl SupportStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `supportstatus.txt` inside `input_dir`.
    pub fn load(input_dir: &Path) -> Result<Self> {
        let path = input_dir.join("supportstatus.txt");
        if !path.is_file() {
            return Ok(Self::default());
        }
        debug!("reading {}", path.display());
        let mut statuses = HashMap::new();
        for line in std::fs::read_to_string(&path)?.lines() {
            let mut fields = line.split_whitespace();
            if let (Some(package), Some(status)) = (fields.next(), fields.next()) {
                statuses.insert(package.to_string(), status.to_string());
            }
        }
        Ok(Self { statuses })
    }

    /// Status for `package`, if the table has an explicit entry.
    pub fn status(&self, package: &str) -> Option<&str> {
        self.statuses.get(package).map(String::as_str)
    }

    pub fn insert(&mut self, package: impl Into<String>, status: impl Into<String>) {
        self.statuses.insert(package.into(), status.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = SupportStatus::load(dir.path()).unwrap();
        assert!(table.status("bash").is_none());
    }

    #[test]
    fn parses_package_status_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let mut fh = std::fs::File::create(dir.path().join("supportstatus.txt")).unwrap();
        writeln!(fh, "bash l3").unwrap();
        writeln!(fh, "short-line").unwrap();
        writeln!(fh, "vim l2").unwrap();
        drop(fh);

        let table = SupportStatus::load(dir.path()).unwrap();
        assert_eq!(table.status("bash"), Some("l3"));
        assert_eq!(table.status("vim"), Some("l2"));
        assert!(table.status("short-line").is_none());
    }
}
