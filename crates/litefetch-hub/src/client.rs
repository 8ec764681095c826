//! reqwest-backed repository client

use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::api::{ByteStream, HubApi};
use crate::config::HubConfig;
use crate::error::HubError;
use crate::glob::GlobFilters;
use crate::repo::{FileMetadata, ModelInfo, Repo};

/// HTTP client for a HuggingFace-compatible host
#[derive(Debug, Clone)]
pub struct HubClient {
    client: Client,
    config: HubConfig,
}

impl HubClient {
    /// Build a client from configuration
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| HubError::Config(format!("Invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| HubError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Client with settings taken from the environment
    pub fn from_env() -> Result<Self, HubError> {
        Self::new(HubConfig::from_env()?)
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn api_url(&self, repo: &Repo) -> String {
        let mut url = format!(
            "{}/api/{}/{}",
            self.config.endpoint,
            repo.kind.api_name(),
            repo.id
        );
        if !repo.is_default_revision() {
            url.push_str("/revision/");
            url.push_str(&repo.revision);
        }
        url
    }

    /// Content URL of a file: `/{id}/resolve/{revision}/{filename}`
    pub fn resolve_url(&self, repo: &Repo, filename: &str) -> String {
        format!(
            "{}/{}{}/resolve/{}/{}",
            self.config.endpoint,
            repo.kind.url_prefix(),
            repo.id,
            repo.revision,
            filename
        )
    }

    /// Fetch the listing document of a repository
    pub async fn model_info(&self, repo: &Repo) -> Result<ModelInfo, HubError> {
        let url = self.api_url(repo);
        info!("Calling repository API at {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("full", "true")])
            .send()
            .await
            .map_err(|e| HubError::metadata(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::metadata(&url, format!("HTTP {}", status)));
        }

        response
            .json::<ModelInfo>()
            .await
            .map_err(|e| HubError::metadata(&url, e))
    }

    /// Metadata for every file matching `filters`
    pub async fn files_metadata(
        &self,
        repo: &Repo,
        filters: &GlobFilters,
    ) -> Result<Vec<FileMetadata>, HubError> {
        crate::api::files_metadata(self, repo, filters).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|v| v.trim().parse().ok())
}

impl HubApi for HubClient {
    async fn list_files(
        &self,
        repo: &Repo,
        filters: &GlobFilters,
    ) -> Result<Vec<String>, HubError> {
        let files = self.model_info(repo).await?.file_names(filters);
        debug!("{} files in {} match {}", files.len(), repo, filters);
        Ok(files)
    }

    async fn file_metadata(&self, repo: &Repo, filename: &str) -> Result<FileMetadata, HubError> {
        let url = self.resolve_url(repo, filename);

        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| HubError::metadata(&url, e))?;

        if !response.status().is_success() {
            warn!("HEAD {} returned {}", url, response.status());
        }

        let headers = response.headers();
        let size = header_u64(headers, "x-linked-size")
            .or_else(|| header_u64(headers, "content-length"))
            .unwrap_or(0);

        Ok(FileMetadata {
            filename: filename.to_string(),
            size,
            etag: header_str(headers, "etag").map(str::to_string),
            location: header_str(headers, "location").map(str::to_string),
        })
    }

    async fn stream_file(&self, repo: &Repo, filename: &str) -> Result<ByteStream, HubError> {
        let url = self.resolve_url(repo, filename);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.bytes_stream().map_err(HubError::from).boxed())
    }
}
