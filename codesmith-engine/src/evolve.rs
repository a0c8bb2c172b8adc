//! # Evolution log
//!
//! Append-only record of per-run advice from the researcher stage. One
//! timestamped line per entry; the program never reads the file back, so
//! the log only grows.

use crate::error::{self, Result};
use chrono::{SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only advice log
#[derive(Debug, Clone)]
pub struct EvolutionLog {
    path: PathBuf,
}

impl EvolutionLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry: `[<RFC 3339 UTC>] v<version>: <advice>`.
    ///
    /// Multi-line advice is collapsed to a single line.
    pub fn append(&self, version: f64, advice: &str) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let line = format!("[{}] v{:.1}: {}\n", timestamp, version, flatten(advice));

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                error::io_error(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        file.write_all(line.as_bytes()).map_err(|e| {
            error::io_error(format!("failed to append to {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }
}

/// Collapse newlines so each entry stays a single line
fn flatten(advice: &str) -> String {
    advice
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_creates_file() {
        let dir = TempDir::new().unwrap();
        let log = EvolutionLog::new(dir.path().join("evolution_log.txt"));

        log.append(1.1, "tighten the coder prompt").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with('['));
        assert!(content.contains("v1.1: tighten the coder prompt"));
    }

    #[test]
    fn test_entries_accumulate() {
        let dir = TempDir::new().unwrap();
        let log = EvolutionLog::new(dir.path().join("evolution_log.txt"));

        log.append(1.1, "first").unwrap();
        log.append(1.2, "second").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("v1.1: first"));
        assert!(lines[1].contains("v1.2: second"));
    }

    #[test]
    fn test_multiline_advice_is_flattened() {
        let dir = TempDir::new().unwrap();
        let log = EvolutionLog::new(dir.path().join("evolution_log.txt"));

        log.append(1.1, "line one\nline two\n\n  line three").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("line one line two line three"));
    }
}
