//! Single-file download with retries, backoff and size verification

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use litefetch_hub::{HubApi, HubConfig, Repo};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::error::ModelError;

/// One file to bring from a repository to a local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub repo: Repo,
    pub remote_filename: String,
    pub target: PathBuf,
}

impl DownloadTask {
    pub fn new(repo: Repo, remote_filename: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            remote_filename: remote_filename.into(),
            target: target.into(),
        }
    }
}

/// Byte accounting reported while a file downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesDelta {
    /// A chunk of this many bytes was written
    Received(u64),
    /// A failed attempt is rolled back; these bytes no longer count
    Discarded(u64),
}

/// Removes a partially written file unless the download completed.
/// Covers both failed attempts and attempts dropped by cancellation.
struct PartialFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }

    async fn discard(mut self) {
        self.armed = false;
        match fs::remove_file(self.path).await {
            Ok(()) => debug!("Removed partial file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(self.path);
        }
    }
}

/// Downloads one file at a time, retrying failed attempts
pub struct Fetcher<H> {
    hub: Arc<H>,
    max_retries: u32,
    base_delay: Duration,
}

impl<H> Clone for Fetcher<H> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            max_retries: self.max_retries,
            base_delay: self.base_delay,
        }
    }
}

impl<H: HubApi + Send + Sync> Fetcher<H> {
    /// Fetcher using the retry policy of `config`
    pub fn new(hub: Arc<H>, config: &HubConfig) -> Self {
        Self {
            hub,
            max_retries: config.max_retries.max(1),
            base_delay: config.retry_base_delay,
        }
    }

    /// Download `task` until its size on disk equals `expected_size`.
    ///
    /// Each written chunk is reported as [`BytesDelta::Received`]; when an
    /// attempt fails, its bytes are reported as [`BytesDelta::Discarded`],
    /// the partial file is deleted and the download is retried after
    /// `base_delay * 2^attempt`. After `max_retries` failed attempts the
    /// file is given up with [`ModelError::FetchFailed`].
    pub async fn fetch<F>(
        &self,
        task: &DownloadTask,
        expected_size: u64,
        mut on_bytes: F,
    ) -> Result<(), ModelError>
    where
        F: FnMut(BytesDelta) + Send,
    {
        if let Some(parent) = task.target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut attempt: u32 = 0;
        loop {
            debug!("Downloading {} (attempt {})", task.remote_filename, attempt);

            let partial = PartialFile::new(&task.target);
            let mut received = 0u64;
            let result = self
                .attempt(task, expected_size, &mut received, &mut on_bytes)
                .await;

            let err = match result {
                Ok(()) => {
                    partial.keep();
                    info!(
                        "{} downloaded ({} bytes)",
                        task.remote_filename, expected_size
                    );
                    return Ok(());
                }
                Err(err) => err,
            };

            warn!(
                "Error downloading {} (attempt {}): {}",
                task.remote_filename, attempt, err
            );
            if received > 0 {
                on_bytes(BytesDelta::Discarded(received));
            }
            partial.discard().await;

            attempt += 1;
            if attempt >= self.max_retries {
                error!(
                    "Failed to download {} after {} attempts",
                    task.remote_filename, attempt
                );
                return Err(ModelError::FetchFailed {
                    file: task.remote_filename.clone(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.backoff(attempt);
            info!("Retrying {} in {:?}", task.remote_filename, delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn attempt<F>(
        &self,
        task: &DownloadTask,
        expected_size: u64,
        received: &mut u64,
        on_bytes: &mut F,
    ) -> Result<(), ModelError>
    where
        F: FnMut(BytesDelta) + Send,
    {
        let mut stream = self
            .hub
            .stream_file(&task.repo, &task.remote_filename)
            .await?;
        let mut file = fs::File::create(&task.target).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk).await?;
            let len = chunk.len() as u64;
            *received += len;
            on_bytes(BytesDelta::Received(len));
        }

        file.flush().await?;
        drop(file);

        let actual = fs::metadata(&task.target).await?.len();
        if actual != expected_size {
            return Err(ModelError::SizeMismatch {
                file: task.remote_filename.clone(),
                expected: expected_size,
                actual,
            });
        }

        Ok(())
    }
}
