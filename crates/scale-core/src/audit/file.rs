// # File Audit Sink
//
// Append-only newline-delimited JSON audit trail.
//
// ## File Format
//
// One reading per line, exactly the query-service wire shape:
//
// ```json
// {"timestamp":"2025-01-09T12:00:00Z","message":"RTW:0.650 kg","weight":0.65,"weightUnit":"kg"}
// ```
//
// ## Concurrency
//
// A dedicated mutex scoped to append operations serializes writers so
// lines never interleave. The lock is independent of the latest-value
// store's lock; auditing never contends with the query path.
//
// ## Read-back
//
// `read_entries` exists for the legacy query endpoint. A missing file
// reads as empty; lines that fail to parse are skipped with a warning
// rather than poisoning the whole trail.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::reading::WeightReading;
use crate::traits::audit_sink::AuditSink;
use async_trait::async_trait;

/// Append-only JSONL audit trail on disk
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl FileAuditSink {
    /// Create a sink, creating parent directories as needed
    ///
    /// The file itself is created lazily on first append.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::audit(format!(
                        "failed to create audit directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self {
            path,
            append_lock: Mutex::new(()),
        })
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable record back, oldest first
    ///
    /// Absent file is an empty trail, not an error.
    pub async fn read_entries(&self) -> Result<Vec<WeightReading>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::audit(format!(
                    "failed to read audit log {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WeightReading>(line) {
                Ok(reading) => entries.push(reading),
                Err(e) => {
                    tracing::warn!("skipping unparseable audit line: {}", e);
                }
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, reading: &WeightReading) -> Result<(), Error> {
        let mut line = serde_json::to_string(reading)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::audit(format!(
                    "failed to open audit log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            Error::audit(format!(
                "failed to append to audit log {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.flush().await.map_err(|e| {
            Error::audit(format!(
                "failed to flush audit log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scale_data.json");

        let sink = FileAuditSink::new(&path).await.unwrap();

        let first = WeightReading::new(Utc::now(), "RTW:0.650 kg", Some(0.65));
        let second = WeightReading::new(Utc::now(), "hello world", None);
        sink.append(&first).await.unwrap();
        sink.append(&second).await.unwrap();

        let entries = sink.read_entries().await.unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[tokio::test]
    async fn test_absent_file_reads_empty() {
        let dir = tempdir().unwrap();
        let sink = FileAuditSink::new(dir.path().join("missing.json"))
            .await
            .unwrap();

        assert!(sink.read_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("scale_data.json");

        let sink = FileAuditSink::new(&path).await.unwrap();
        sink.append(&WeightReading::new(Utc::now(), "1.282KG", Some(1.282)))
            .await
            .unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scale_data.json");

        let sink = FileAuditSink::new(&path).await.unwrap();
        let reading = WeightReading::new(Utc::now(), "RTW:0.550 kg", Some(0.55));
        sink.append(&reading).await.unwrap();

        // Simulate a torn write from a crashed process
        let mut content = fs::read_to_string(&path).await.unwrap();
        content.push_str("{\"timestamp\":\"2025-");
        fs::write(&path, content).await.unwrap();

        let entries = sink.read_entries().await.unwrap();
        assert_eq!(entries, vec![reading]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_line_integrity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scale_data.json");

        let sink = std::sync::Arc::new(FileAuditSink::new(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                let reading =
                    WeightReading::new(Utc::now(), format!("RTW:{i}.000 kg"), Some(i as f64));
                sink.append(&reading).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every line parses back whole
        let entries = sink.read_entries().await.unwrap();
        assert_eq!(entries.len(), 8);
    }
}
