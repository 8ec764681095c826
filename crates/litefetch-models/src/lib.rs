//! Model variant downloads for litefetch
//!
//! Resolves a variant id to the files it needs, downloads them from the
//! repository host with retries and progress reporting, and lays them out
//! in one flat directory under canonical names.

pub mod cache;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod progress;
pub mod registry;
pub mod snapshot;
pub mod status;

#[cfg(test)]
mod testing;

pub use downloader::{default_destination, ModelDownloader};
pub use error::ModelError;
pub use fetcher::{BytesDelta, DownloadTask, Fetcher};
pub use progress::{Progress, ProgressStream};
pub use registry::{
    get_variant, resolve, variant_ids, AssetLeg, AssetRole, AssetSpec, LegKind, ModelAssetPlan,
    VariantConfig, VARIANTS,
};
pub use snapshot::Snapshotter;
pub use status::{inspect, AssetStatus, VariantStatus};
