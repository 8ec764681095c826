//! Variant downloads: four concurrent legs combined into one progress stream

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use litefetch_hub::{files_metadata, FileMetadata, HubApi, HubClient, HubConfig};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache;
use crate::error::ModelError;
use crate::progress::{lock, LegProgress, Progress, ProgressStream};
use crate::registry::{self, AssetLeg, ModelAssetPlan};
use crate::snapshot::Snapshotter;

/// Default destination of a variant: `<cache>/models/<variant with '/' replaced>`
pub fn default_destination(variant: &str) -> Result<PathBuf, ModelError> {
    let dirs = ProjectDirs::from("com", "litefetch", "litefetch").ok_or_else(|| {
        ModelError::CacheDirectoryError("Could not determine cache directory".to_string())
    })?;
    Ok(dirs
        .cache_dir()
        .join("models")
        .join(variant.replace('/', "_")))
}

/// Downloads model variants into flat directories
pub struct ModelDownloader<H = HubClient> {
    hub: Arc<H>,
    snapshotter: Snapshotter<H>,
}

impl<H> Clone for ModelDownloader<H> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            snapshotter: self.snapshotter.clone(),
        }
    }
}

impl ModelDownloader<HubClient> {
    /// Downloader talking to the host described by `config`
    pub fn new(config: HubConfig) -> Result<Self, ModelError> {
        let client = HubClient::new(config)?;
        let config = client.config().clone();
        Ok(Self::with_hub(Arc::new(client), &config))
    }

    /// Downloader configured from the environment
    pub fn from_env() -> Result<Self, ModelError> {
        Self::new(HubConfig::from_env()?)
    }
}

impl<H: HubApi + Send + Sync + 'static> ModelDownloader<H> {
    pub fn with_hub(hub: Arc<H>, config: &HubConfig) -> Self {
        let snapshotter = Snapshotter::new(Arc::clone(&hub), config);
        Self { hub, snapshotter }
    }

    /// Start downloading `variant` into `destination`.
    ///
    /// Unknown variants fail here, before any work starts. The returned
    /// stream ends with `Progress(1.0)` once every file is in place, or with
    /// an error; dropping it cancels all legs.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, the work is spawned
    /// immediately.
    pub fn start_download(
        &self,
        variant: &str,
        destination: impl Into<PathBuf>,
    ) -> Result<ProgressStream, ModelError> {
        let plan = registry::resolve(variant)?;
        let destination = destination.into();
        let this = self.clone();

        info!(
            "Starting download of {} into {}",
            plan.variant,
            destination.display()
        );
        Ok(ProgressStream::spawn(move |sink| async move {
            this.download_plan(&plan, &destination, |p| sink.send(p))
                .await
        }))
    }

    /// Run all legs of `plan` concurrently, reporting their unweighted mean.
    /// Leftover namespaced directories are removed afterwards, whatever the
    /// outcome. `Progress(1.0)` is reported last, after the cleanup.
    pub async fn download_plan<F>(
        &self,
        plan: &ModelAssetPlan,
        root: &Path,
        on_progress: F,
    ) -> Result<(), ModelError>
    where
        F: FnMut(Progress) + Send,
    {
        fs::create_dir_all(root).await?;

        let combined = Mutex::new(LegProgress::new(plan.legs.len()));
        let on_progress = Mutex::new(on_progress);
        let report = |leg: usize, progress: Progress| {
            let mean = lock(&combined).update(leg, progress);
            if let Some(mean) = mean.filter(|m| !m.is_done()) {
                let mut on_progress = lock(&on_progress);
                (*on_progress)(mean);
            }
        };
        let report = &report;

        let legs = plan
            .legs
            .iter()
            .enumerate()
            .map(|(i, leg)| self.download_leg(leg, root, move |p| report(i, p)));
        let result = futures::future::try_join_all(legs).await;

        self.cleanup(plan, root).await;

        result?;
        info!("{} is ready in {}", plan.variant, root.display());
        (*lock(&on_progress))(Progress::DONE);
        Ok(())
    }

    async fn download_leg<F>(
        &self,
        leg: &AssetLeg,
        root: &Path,
        mut on_progress: F,
    ) -> Result<(), ModelError>
    where
        F: FnMut(Progress) + Send,
    {
        let filters = leg.filters()?;
        let metadata = files_metadata(self.hub.as_ref(), &leg.repo, &filters).await?;

        if Self::leg_is_cached(leg, &metadata, root).await {
            info!("{} files of {} are up to date", leg.kind, leg.repo);
            on_progress(Progress::DONE);
            return Ok(());
        }

        // The leg is done once its files carry their canonical names
        self.snapshotter
            .run(&leg.repo, &filters, root, |p| {
                if !p.is_done() {
                    on_progress(p)
                }
            })
            .await?;
        Self::relocate(leg, root).await?;
        on_progress(Progress::DONE);
        Ok(())
    }

    /// Every canonical file exists with the size of its remote source
    async fn leg_is_cached(leg: &AssetLeg, metadata: &[FileMetadata], root: &Path) -> bool {
        let mut expected = Vec::with_capacity(leg.assets.len());
        for asset in &leg.assets {
            match metadata.iter().find(|m| m.filename == asset.remote_path) {
                Some(m) => expected.push((root.join(&asset.local_name), m.size)),
                None => return false,
            }
        }
        cache::all_cached(&expected).await
    }

    /// Move downloaded files to their canonical names
    async fn relocate(leg: &AssetLeg, root: &Path) -> Result<(), ModelError> {
        for asset in leg.assets.iter().filter(|a| a.needs_relocation()) {
            let from = root.join(&asset.remote_path);
            let to = root.join(&asset.local_name);

            if fs::try_exists(&from).await? {
                fs::rename(&from, &to).await?;
                debug!("Moved {} to {}", asset.remote_path, asset.local_name);
            } else if !fs::try_exists(&to).await? {
                warn!(
                    "{} was not downloaded from {}, {} is missing",
                    asset.remote_path, leg.repo, asset.local_name
                );
            }
        }
        Ok(())
    }

    async fn cleanup(&self, plan: &ModelAssetPlan, root: &Path) {
        for dir in &plan.cleanup_dirs {
            let path = root.join(dir);
            match fs::remove_dir_all(&path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}
