//! Repository references and remote file descriptions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::glob::GlobFilters;

/// Revision used when none is given
pub const DEFAULT_REVISION: &str = "main";

/// Repository kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoKind {
    /// Machine learning models
    Models,
    /// Datasets
    Datasets,
    /// Interactive demos
    Spaces,
}

impl RepoKind {
    /// Name used in `/api/{kind}/...` paths
    pub fn api_name(&self) -> &'static str {
        match self {
            RepoKind::Models => "models",
            RepoKind::Datasets => "datasets",
            RepoKind::Spaces => "spaces",
        }
    }

    /// Prefix of content URLs. Model repos live at the host root.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            RepoKind::Models => "",
            RepoKind::Datasets => "datasets/",
            RepoKind::Spaces => "spaces/",
        }
    }
}

impl std::str::FromStr for RepoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" | "models" => Ok(RepoKind::Models),
            "dataset" | "datasets" => Ok(RepoKind::Datasets),
            "space" | "spaces" => Ok(RepoKind::Spaces),
            other => Err(format!("unknown repository kind: {}", other)),
        }
    }
}

/// A repository at a given revision. Identity is `(id, kind, revision)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repo {
    /// Repository id, usually `owner/name`
    pub id: String,
    /// Repository kind
    pub kind: RepoKind,
    /// Branch, tag or commit
    pub revision: String,
}

impl Repo {
    /// A model repository on the default revision
    pub fn model(id: impl Into<String>) -> Self {
        Self::new(id, RepoKind::Models, DEFAULT_REVISION)
    }

    /// Create a repository reference. An empty revision means the default one.
    pub fn new(id: impl Into<String>, kind: RepoKind, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        Self {
            id: id.into(),
            kind,
            revision: if revision.is_empty() {
                DEFAULT_REVISION.to_string()
            } else {
                revision
            },
        }
    }

    /// Same repository, pinned to another revision
    pub fn at_revision(mut self, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        if !revision.is_empty() {
            self.revision = revision;
        }
        self
    }

    /// Whether this reference points at the default revision
    pub fn is_default_revision(&self) -> bool {
        self.revision == DEFAULT_REVISION
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}@{}", self.kind.url_prefix(), self.id, self.revision)
    }
}

/// Metadata of one remote file, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Path of the file inside the repository
    pub filename: String,
    /// Authoritative size in bytes (0 when the host did not report one)
    pub size: u64,
    /// Entity tag
    pub etag: Option<String>,
    /// Redirect target, if the host answered with one
    pub location: Option<String>,
}

/// Listing document returned by `/api/{kind}/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub model_id: Option<String>,
    /// Commit the listing was taken at
    pub sha: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Files in the repository
    pub siblings: Option<Vec<Sibling>>,
}

/// One file entry of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sibling {
    /// Path relative to the repository root
    pub rfilename: Option<String>,
}

impl ModelInfo {
    fn all_file_names(&self) -> impl Iterator<Item = &str> {
        self.siblings
            .iter()
            .flatten()
            .filter_map(|s| s.rfilename.as_deref())
    }

    /// Files matching any of the filters, in listing order
    pub fn file_names(&self, filters: &GlobFilters) -> Vec<String> {
        self.all_file_names()
            .filter(|name| filters.is_match(name))
            .map(str::to_string)
            .collect()
    }
}
