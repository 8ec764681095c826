//! On-disk status of a downloaded variant

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::registry::{AssetRole, ModelAssetPlan};

/// One canonical file of a variant
#[derive(Debug, Clone, Serialize)]
pub struct AssetStatus {
    pub role: AssetRole,
    pub path: PathBuf,
    /// Size on disk, `None` when missing
    pub size: Option<u64>,
}

/// What is present in a variant's destination directory
#[derive(Debug, Clone, Serialize)]
pub struct VariantStatus {
    pub variant: String,
    pub root: PathBuf,
    pub assets: Vec<AssetStatus>,
    /// Bytes of all regular files under the root
    pub total_bytes: u64,
}

impl VariantStatus {
    /// Whether every canonical file is present
    pub fn is_complete(&self) -> bool {
        self.assets.iter().all(|a| a.size.is_some())
    }

    pub fn missing(&self) -> impl Iterator<Item = &AssetStatus> {
        self.assets.iter().filter(|a| a.size.is_none())
    }
}

/// Inspect `root` for the files `plan` produces
pub fn inspect(plan: &ModelAssetPlan, root: &Path) -> VariantStatus {
    let assets = plan
        .legs
        .iter()
        .flat_map(|leg| &leg.assets)
        .map(|asset| {
            let path = root.join(&asset.local_name);
            let size = std::fs::metadata(&path)
                .ok()
                .filter(|m| m.is_file())
                .map(|m| m.len());
            AssetStatus {
                role: asset.role,
                path,
                size,
            }
        })
        .collect();

    let total_bytes = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum();

    VariantStatus {
        variant: plan.variant.clone(),
        root: root.to_path_buf(),
        assets,
        total_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::resolve;

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let plan = resolve("qualcomm/Whisper_Base_En").unwrap();

        let status = inspect(&plan, &dir.path().join("absent"));

        assert!(!status.is_complete());
        assert_eq!(status.missing().count(), 5);
        assert_eq!(status.total_bytes, 0);
    }

    #[test]
    fn test_partial_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("AudioEncoder.tflite"), vec![0u8; 64]).unwrap();
        std::fs::create_dir(dir.path().join("openai_whisper-tiny")).unwrap();
        std::fs::write(dir.path().join("openai_whisper-tiny/TextDecoder.tflite"), vec![0u8; 8]).unwrap();
        let plan = resolve("whisperkit-litert/openai_whisper-tiny").unwrap();

        let status = inspect(&plan, dir.path());

        assert!(!status.is_complete());
        let missing: Vec<_> = status.missing().map(|a| a.role).collect();
        assert_eq!(
            missing,
            vec![
                AssetRole::Tokenizer,
                AssetRole::Decoder,
                AssetRole::FeatureExtractor
            ]
        );
        assert_eq!(status.total_bytes, 74);
    }

    #[test]
    fn test_complete() {
        let dir = tempfile::tempdir().unwrap();
        let plan = resolve("qualcomm/Whisper_Tiny_En").unwrap();
        for name in plan.canonical_files() {
            std::fs::write(dir.path().join(name), b"model").unwrap();
        }

        let status = inspect(&plan, dir.path());

        assert!(status.is_complete());
        assert_eq!(status.total_bytes, 25);
        assert_eq!(status.variant, "qualcomm/Whisper_Tiny_En");
    }
}
