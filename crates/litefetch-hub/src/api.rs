//! Repository API trait

use bytes::Bytes;
use futures::stream::BoxStream;
use tracing::debug;

use crate::error::HubError;
use crate::glob::GlobFilters;
use crate::repo::{FileMetadata, Repo};

/// Body of a streaming download, yielded chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Bytes, HubError>>;

/// Operations the downloader needs from an artifact host
#[trait_variant::make(HubApi: Send)]
pub trait LocalHubApi {
    /// Filenames matching `filters`, in server listing order
    async fn list_files(&self, repo: &Repo, filters: &GlobFilters)
        -> Result<Vec<String>, HubError>;

    /// Size and etag of one file
    async fn file_metadata(&self, repo: &Repo, filename: &str) -> Result<FileMetadata, HubError>;

    /// Open a streaming GET on a file
    async fn stream_file(&self, repo: &Repo, filename: &str) -> Result<ByteStream, HubError>;
}

/// Metadata for every file matching `filters`: one listing plus one
/// sequential metadata round-trip per file
pub async fn files_metadata<H: HubApi>(
    hub: &H,
    repo: &Repo,
    filters: &GlobFilters,
) -> Result<Vec<FileMetadata>, HubError> {
    let files = hub.list_files(repo, filters).await?;
    debug!("Fetching metadata for {} files in {}", files.len(), repo);

    let mut metadata = Vec::with_capacity(files.len());
    for file in &files {
        metadata.push(hub.file_metadata(repo, file).await?);
    }
    Ok(metadata)
}
