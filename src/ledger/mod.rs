//! Append-only CSV ledger with one row per processed paper
//!
//! A single writer task owns the file. Workers hold cheap [`LedgerHandle`]
//! clones and send whole records through a bounded channel; the writer turns
//! each record into one complete line before writing it, so rows from
//! different workers can never interleave.
//!
//! # Example
//!
//! ```no_run
//! use paper_harvest::ledger::Ledger;
//! use paper_harvest::PaperRecord;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Ledger::create(Path::new("output.csv")).await?;
//! let handle = ledger.handle();
//! handle
//!     .append(PaperRecord {
//!         year: "2023".to_string(),
//!         title: "Title".to_string(),
//!         authors: "Ada, Lovelace".to_string(),
//!         item_url: "https://papers.nips.cc/paper/x".to_string(),
//!     })
//!     .await?;
//! drop(handle);
//! let rows = ledger.close().await?;
//! assert_eq!(rows, 1);
//! # Ok(())
//! # }
//! ```

mod csv;

pub use csv::{escape_field, format_row, LEDGER_HEADER};

use crate::model::PaperRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Records that may wait for the writer before `append` blocks
const LEDGER_CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while writing the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error on ledger {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ledger writer has stopped")]
    Closed,

    #[error("Ledger writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// Owner of the ledger writer task
pub struct Ledger {
    path: PathBuf,
    sender: mpsc::Sender<PaperRecord>,
    writer: JoinHandle<Result<u64, LedgerError>>,
}

/// Cloneable sending side of the ledger
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<PaperRecord>,
}

impl Ledger {
    /// Creates (or truncates) the ledger file and writes the header row
    ///
    /// The parent directory is created when missing.
    pub async fn create(path: &Path) -> Result<Self, LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let file = File::create(path).await.map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(format!("{}\n", LEDGER_HEADER).as_bytes())
            .await
            .map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;

        let (sender, receiver) = mpsc::channel(LEDGER_CHANNEL_CAPACITY);
        let writer = tokio::spawn(write_rows(path.to_path_buf(), writer, receiver));

        tracing::info!("Ledger opened at {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            sender,
            writer,
        })
    }

    /// Returns a handle that can append records from any task
    pub fn handle(&self) -> LedgerHandle {
        LedgerHandle {
            sender: self.sender.clone(),
        }
    }

    /// Stops accepting records, flushes the file and returns the row count
    ///
    /// Waits until every outstanding [`LedgerHandle`] has been dropped.
    pub async fn close(self) -> Result<u64, LedgerError> {
        drop(self.sender);
        let rows = self.writer.await??;
        tracing::info!("Ledger closed with {} rows at {}", rows, self.path.display());
        Ok(rows)
    }
}

impl LedgerHandle {
    /// Queues one record for writing
    pub async fn append(&self, record: PaperRecord) -> Result<(), LedgerError> {
        self.sender
            .send(record)
            .await
            .map_err(|_| LedgerError::Closed)
    }
}

/// Writer task: the only code that touches the ledger file after creation
async fn write_rows(
    path: PathBuf,
    mut writer: BufWriter<File>,
    mut receiver: mpsc::Receiver<PaperRecord>,
) -> Result<u64, LedgerError> {
    let mut rows = 0u64;

    while let Some(record) = receiver.recv().await {
        let line = format_row(&record);
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };

        if let Err(source) = written {
            tracing::error!(
                path = %path.display(),
                error = %source,
                "failed to write ledger row for {}",
                record.item_url
            );
            return Err(LedgerError::Io { path, source });
        }
        rows += 1;
    }

    writer
        .flush()
        .await
        .map_err(|source| LedgerError::Io { path, source })?;
    Ok(rows)
}
