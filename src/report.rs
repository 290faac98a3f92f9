//! Append-only outcome ledgers.
//!
//! Every finished pipeline reports its outcome here. Outcomes land under one
//! of two roots, `success_data/` or `error_data/`, each holding three
//! category files: account indices, egress proxies, and aux tokens. A single
//! mutex is held across all three appends of one report, so records from two
//! accounts never interleave. The three files are not written atomically
//! with respect to each other: a crash mid-report can leave one category
//! ahead of the others, which is acceptable for an observability log.
//!
//! Account secrets are never written here.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Ledger root for successful accounts.
pub const SUCCESS_DIR: &str = "success_data";
/// Ledger root for failed accounts.
pub const FAILURE_DIR: &str = "error_data";
/// Category file for account indices.
pub const INDICES_FILE: &str = "account_indices.txt";
/// Category file for egress proxies.
pub const PROXIES_FILE: &str = "proxies.txt";
/// Category file for aux tokens.
pub const TOKENS_FILE: &str = "tokens.txt";

/// Errors that can occur while appending to a ledger.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem error while creating a directory or appending a line.
    #[error("Ledger IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mutex-guarded, append-only outcome aggregation.
pub struct OutcomeReporter {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl OutcomeReporter {
    /// Creates a reporter rooted at `base_dir`. Directories are created
    /// lazily on first report.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Appends one account's outcome to the matching ledger root.
    ///
    /// Empty or absent egress/token values are skipped rather than written
    /// as blank lines.
    pub async fn report(
        &self,
        succeeded: bool,
        index: usize,
        egress: Option<&str>,
        token: Option<&str>,
    ) -> Result<(), ReportError> {
        let root = self
            .base_dir
            .join(if succeeded { SUCCESS_DIR } else { FAILURE_DIR });

        let _guard = self.lock.lock().await;
        fs::create_dir_all(&root).await?;

        append_line(&root.join(INDICES_FILE), &index.to_string()).await?;
        if let Some(egress) = egress.filter(|v| !v.is_empty()) {
            append_line(&root.join(PROXIES_FILE), egress).await?;
        }
        if let Some(token) = token.filter(|v| !v.is_empty()) {
            append_line(&root.join(TOKENS_FILE), token).await?;
        }

        info!(
            "{} recorded for account {index}",
            if succeeded { "Success" } else { "Failure" }
        );
        Ok(())
    }

    /// Path of the success ledger root.
    pub fn success_dir(&self) -> PathBuf {
        self.base_dir.join(SUCCESS_DIR)
    }

    /// Path of the failure ledger root.
    pub fn failure_dir(&self) -> PathBuf {
        self.base_dir.join(FAILURE_DIR)
    }
}

async fn append_line(path: &Path, value: &str) -> Result<(), ReportError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{value}\n").as_bytes()).await?;
    Ok(())
}
