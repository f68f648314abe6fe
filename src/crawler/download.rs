//! Streaming PDF download into a year directory
//!
//! The body is streamed through an 8 KiB buffered writer into
//! `<dir>/<name>.pdf.<n>.part` and renamed to `<dir>/<name>.pdf` once
//! complete, so an interrupted or failed transfer never leaves a truncated PDF
//! behind. `<n>` is unique per transfer, so two papers sharing a name never
//! write into the same part file. When both succeed the last rename wins.

use crate::crawler::fetcher::{fetch_response, FetchError};
use crate::crawler::retry::Transient;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Size of the write buffer between the network stream and the file
pub const DOWNLOAD_BUFFER_SIZE: usize = 8 * 1024;

/// Extension given to every downloaded artifact
pub const BINARY_EXTENSION: &str = "pdf";

static PART_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Errors raised while downloading an artifact
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DownloadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Transient for DownloadError {
    /// Network failures follow the fetch classification; local I/O failures are permanent
    fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Io { .. } => false,
        }
    }
}

/// Returns the final path of the artifact named `base_name` in `dir`
pub fn binary_path(dir: &Path, base_name: &str) -> PathBuf {
    dir.join(format!("{}.{}", base_name, BINARY_EXTENSION))
}

/// Returns a part file path in `dir` that no other transfer in this process uses
fn part_path(dir: &Path, base_name: &str) -> PathBuf {
    let n = PART_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{}.{}.{}.part", base_name, BINARY_EXTENSION, n))
}

/// Downloads `url` to `<dir>/<base_name>.pdf`
///
/// Creates `dir` when it does not exist (creating an existing directory is
/// not an error). Returns the path of the written file.
///
/// # Errors
///
/// - [`DownloadError::Fetch`] when the request fails, the server answers with
///   a non-success status, or the body stream breaks
/// - [`DownloadError::Io`] when the directory or file cannot be written
pub async fn download_binary(
    client: &Client,
    url: &Url,
    dir: &Path,
    base_name: &str,
) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DownloadError::io(dir, e))?;

    let final_path = binary_path(dir, base_name);
    let temp_path = part_path(dir, base_name);

    match stream_to_file(client, url, &temp_path).await {
        Ok(bytes) => {
            tokio::fs::rename(&temp_path, &final_path)
                .await
                .map_err(|e| DownloadError::io(&final_path, e))?;
            tracing::debug!(url = %url, path = %final_path.display(), bytes, "download complete");
            Ok(final_path)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&temp_path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %temp_path.display(),
                        error = %remove_err,
                        "failed to remove partial download"
                    );
                }
            }
            Err(e)
        }
    }
}

/// Streams the response body for `url` into `path`, returning the byte count
async fn stream_to_file(client: &Client, url: &Url, path: &Path) -> Result<u64, DownloadError> {
    let response = fetch_response(client, url).await?;

    let file = File::create(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);

    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| DownloadError::io(path, e))?;

    Ok(bytes_written)
}
