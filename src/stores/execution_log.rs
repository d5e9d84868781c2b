//! Append-only execution log: one line per run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::models::{Cid, ScanMode};

#[derive(Debug, Clone)]
pub struct ExecutionLog {
    path: PathBuf,
}

impl ExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(
        &self,
        at: DateTime<Local>,
        mode: ScanMode,
        cid_start: Cid,
        cid_end: Cid,
    ) -> Result<(), StoreError> {
        let line = format_line(at, mode, cid_start, cid_end);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&self.path, e))
    }
}

fn format_line(at: DateTime<Local>, mode: ScanMode, cid_start: Cid, cid_end: Cid) -> String {
    format!(
        "{} mode={} cid_start={} cid_end={}\n",
        at.to_rfc3339(),
        mode,
        cid_start,
        cid_end
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_line() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let line = format_line(at, ScanMode::Partial, 10, 20);
        assert!(line.starts_with("2024-03-01T09:30:00"));
        assert!(line.ends_with(" mode=partial cid_start=10 cid_end=20\n"));
    }

    #[tokio::test]
    async fn test_append_adds_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = ExecutionLog::new(dir.path().join("execution_log.txt"));
        log.append(Local::now(), ScanMode::Full, 1, 2).await.unwrap();
        log.append(Local::now(), ScanMode::Minimal, 1, 2).await.unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("mode=full"));
        assert!(lines[1].contains("mode=minimal"));
    }
}
