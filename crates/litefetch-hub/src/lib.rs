//! Model repository client for litefetch
//!
//! This crate talks to a HuggingFace-compatible artifact host: it lists the
//! files of a repository, resolves per-file metadata (size, etag) and opens
//! streaming downloads.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod glob;
pub mod repo;

pub use api::{files_metadata, ByteStream, HubApi};
pub use client::HubClient;
pub use config::HubConfig;
pub use error::HubError;
pub use glob::GlobFilters;
pub use repo::{FileMetadata, ModelInfo, Repo, RepoKind, Sibling, DEFAULT_REVISION};
