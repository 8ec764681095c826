//! Multi-file snapshot of a repository into a local directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use litefetch_hub::{GlobFilters, HubApi, HubConfig, Repo};
use tokio::fs;
use tracing::{debug, info};

use crate::cache;
use crate::error::ModelError;
use crate::fetcher::{BytesDelta, DownloadTask, Fetcher};
use crate::progress::{Progress, ProgressStream, ProgressThrottle};

/// Highest value reported while a file is still in flight. Only a verified
/// file can complete the snapshot.
const IN_FLIGHT_CEILING: f32 = 0.999;

/// Combined progress: the mean of file-count completion and byte completion
fn combined_fraction(index: usize, total_files: usize, downloaded: u64, total_bytes: u64) -> f32 {
    let file_fraction = (index + 1) as f32 / total_files as f32;
    let byte_fraction = if total_bytes == 0 {
        1.0
    } else {
        downloaded as f32 / total_bytes as f32
    };
    (file_fraction + byte_fraction) / 2.0
}

/// Ensures a filtered set of remote files exists locally, downloading only
/// what is missing or has the wrong size
pub struct Snapshotter<H> {
    hub: Arc<H>,
    fetcher: Fetcher<H>,
}

impl<H> Clone for Snapshotter<H> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<H: HubApi + Send + Sync + 'static> Snapshotter<H> {
    pub fn new(hub: Arc<H>, config: &HubConfig) -> Self {
        let fetcher = Fetcher::new(Arc::clone(&hub), config);
        Self { hub, fetcher }
    }

    /// Start a snapshot on a background task and stream its progress.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn snapshot(&self, repo: Repo, filters: GlobFilters, base_dir: PathBuf) -> ProgressStream {
        let this = self.clone();
        ProgressStream::spawn(move |sink| async move {
            this.run(&repo, &filters, &base_dir, |p| sink.send(p)).await
        })
    }

    /// Download every file of `repo` matching `filters` into `base_dir`.
    ///
    /// Files are processed one at a time in listing order. The first file
    /// that exhausts its retries aborts the snapshot.
    pub async fn run<F>(
        &self,
        repo: &Repo,
        filters: &GlobFilters,
        base_dir: &Path,
        mut on_progress: F,
    ) -> Result<(), ModelError>
    where
        F: FnMut(Progress) + Send,
    {
        fs::create_dir_all(base_dir).await?;

        let files = self.hub.list_files(repo, filters).await?;
        if files.is_empty() {
            info!(
                "No files to download for {} with filters {}, finishing immediately",
                repo, filters
            );
            on_progress(Progress::DONE);
            return Ok(());
        }

        // Sizes up front so the byte total is known before the first transfer
        let mut sizes = Vec::with_capacity(files.len());
        for file in &files {
            let metadata = self.hub.file_metadata(repo, file).await?;
            debug!("  {} - {} bytes", file, metadata.size);
            sizes.push(metadata.size);
        }
        let total_bytes: u64 = sizes.iter().sum();
        let total_files = files.len();
        info!(
            "Snapshot of {}: {} files, {} bytes",
            repo, total_files, total_bytes
        );

        let mut downloaded: u64 = 0;
        let mut throttle = ProgressThrottle::new();

        for (index, (file, &size)) in files.iter().zip(&sizes).enumerate() {
            let task = DownloadTask::new(repo.clone(), file.as_str(), base_dir.join(file));

            if cache::is_cached(&task.target, size).await {
                debug!("{} is up to date, skipping", file);
                downloaded += size;
            } else {
                self.fetcher
                    .fetch(&task, size, |delta| {
                        match delta {
                            BytesDelta::Received(n) => downloaded += n,
                            BytesDelta::Discarded(n) => downloaded = downloaded.saturating_sub(n),
                        }
                        let fraction = combined_fraction(index, total_files, downloaded, total_bytes)
                            .min(IN_FLIGHT_CEILING);
                        if let Some(progress) = throttle.offer(fraction) {
                            on_progress(progress);
                        }
                    })
                    .await?;
            }

            let fraction = combined_fraction(index, total_files, downloaded, total_bytes);
            if let Some(progress) = throttle.offer(fraction) {
                on_progress(progress);
            }
        }

        info!("All files of {} are present in {}", repo, base_dir.display());
        Ok(())
    }
}
