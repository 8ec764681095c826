//! In-memory artifact host used by the unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use futures::StreamExt;
use litefetch_hub::{ByteStream, FileMetadata, GlobFilters, HubApi, HubError, Repo};

use crate::progress::lock;

const CHUNK: usize = 1000;

#[derive(Debug, Clone)]
struct FakeFile {
    name: String,
    content: Vec<u8>,
    /// Attempts served truncated before the full body is sent
    truncate_first: usize,
    /// Send the first chunk, then never finish
    stall: bool,
    /// Metadata reports no size
    r#unsized: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHub {
    repos: HashMap<String, Vec<FakeFile>>,
    gets: Mutex<HashMap<(String, String), usize>>,
}

impl FakeHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(mut self, repo: &str, file: FakeFile) -> Self {
        self.repos.entry(repo.to_string()).or_default().push(file);
        self
    }

    /// A well-behaved file of `len` bytes
    pub(crate) fn with_file(self, repo: &str, name: &str, len: usize) -> Self {
        self.push(
            repo,
            FakeFile {
                name: name.to_string(),
                content: vec![b'x'; len],
                truncate_first: 0,
                stall: false,
                r#unsized: false,
            },
        )
    }

    /// A file whose first `attempts` downloads end early
    pub(crate) fn with_flaky_file(self, repo: &str, name: &str, len: usize, attempts: usize) -> Self {
        self.push(
            repo,
            FakeFile {
                name: name.to_string(),
                content: vec![b'x'; len],
                truncate_first: attempts,
                stall: false,
                r#unsized: false,
            },
        )
    }

    /// A file that always arrives with the wrong size
    pub(crate) fn with_corrupt_file(self, repo: &str, name: &str, len: usize) -> Self {
        self.with_flaky_file(repo, name, len, usize::MAX)
    }

    /// A file served in full whose size the host does not advertise
    pub(crate) fn with_unsized_file(self, repo: &str, name: &str, len: usize) -> Self {
        self.push(
            repo,
            FakeFile {
                name: name.to_string(),
                content: vec![b'x'; len],
                truncate_first: 0,
                stall: false,
                r#unsized: true,
            },
        )
    }

    /// A file whose download hangs after the first chunk
    pub(crate) fn with_stalling_file(self, repo: &str, name: &str, len: usize) -> Self {
        self.push(
            repo,
            FakeFile {
                name: name.to_string(),
                content: vec![b'x'; len],
                truncate_first: 0,
                stall: true,
                r#unsized: false,
            },
        )
    }

    /// Number of content requests made for one file
    pub(crate) fn gets(&self, repo: &str, name: &str) -> usize {
        lock(&self.gets)
            .get(&(repo.to_string(), name.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_gets(&self) -> usize {
        lock(&self.gets).values().sum()
    }

    fn file(&self, repo: &Repo, name: &str) -> Result<&FakeFile, HubError> {
        self.repos
            .get(&repo.id)
            .and_then(|files| files.iter().find(|f| f.name == name))
            .ok_or_else(|| HubError::Status {
                url: format!("{}/{}", repo.id, name),
                status: 404,
            })
    }
}

impl HubApi for FakeHub {
    async fn list_files(
        &self,
        repo: &Repo,
        filters: &GlobFilters,
    ) -> Result<Vec<String>, HubError> {
        let files = self.repos.get(&repo.id).ok_or_else(|| HubError::Metadata {
            url: repo.id.clone(),
            reason: "HTTP 404 Not Found".to_string(),
        })?;
        Ok(files
            .iter()
            .filter(|f| filters.is_match(&f.name))
            .map(|f| f.name.clone())
            .collect())
    }

    async fn file_metadata(&self, repo: &Repo, filename: &str) -> Result<FileMetadata, HubError> {
        let size = self
            .file(repo, filename)
            .map(|f| if f.r#unsized { 0 } else { f.content.len() as u64 })
            .unwrap_or(0);
        Ok(FileMetadata {
            filename: filename.to_string(),
            size,
            etag: None,
            location: None,
        })
    }

    async fn stream_file(&self, repo: &Repo, filename: &str) -> Result<ByteStream, HubError> {
        let file = self.file(repo, filename)?.clone();

        let attempt = {
            let mut gets = lock(&self.gets);
            let count = gets.entry((repo.id.clone(), filename.to_string())).or_insert(0);
            *count += 1;
            *count - 1
        };

        let body = if attempt < file.truncate_first {
            file.content[..file.content.len() / 2].to_vec()
        } else {
            file.content
        };

        let chunks: Vec<Result<Bytes, HubError>> = body
            .chunks(CHUNK)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        if file.stall {
            let first = chunks.into_iter().take(1);
            return Ok(futures::stream::iter(first)
                .chain(futures::stream::pending())
                .boxed());
        }

        Ok(futures::stream::iter(chunks).boxed())
    }
}
