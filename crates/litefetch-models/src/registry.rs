//! Model variant registry and download plans

use std::fmt;
use std::sync::LazyLock;

use litefetch_hub::{GlobFilters, HubError, Repo};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Repository holding the LiteRT conversions and feature extractors
pub const SHARED_REPO: &str = "argmaxinc/whisperkit-litert";

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const ENCODER_FILE: &str = "AudioEncoder.tflite";
pub const DECODER_FILE: &str = "TextDecoder.tflite";
pub const FEATURE_EXTRACTOR_FILE: &str = "MelSpectrogram.tflite";

const VENDOR_ENCODER_FILE: &str = "WhisperEncoder.tflite";
const VENDOR_DECODER_FILE: &str = "WhisperDecoder.tflite";

/// What a downloaded file is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Config,
    Tokenizer,
    Encoder,
    Decoder,
    FeatureExtractor,
}

/// One of the independent download flows of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    Config,
    Tokenizer,
    EncoderDecoder,
    FeatureExtractor,
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegKind::Config => write!(f, "config"),
            LegKind::Tokenizer => write!(f, "tokenizer"),
            LegKind::EncoderDecoder => write!(f, "encoder/decoder"),
            LegKind::FeatureExtractor => write!(f, "feature extractor"),
        }
    }
}

/// A remote file and the canonical local name it must end up under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub role: AssetRole,
    /// Path inside the source repository
    pub remote_path: String,
    /// File name inside the destination directory
    pub local_name: String,
}

impl AssetSpec {
    fn new(role: AssetRole, remote_path: impl Into<String>, local_name: &str) -> Self {
        Self {
            role,
            remote_path: remote_path.into(),
            local_name: local_name.to_string(),
        }
    }

    /// Whether the file is renamed or moved after download
    pub fn needs_relocation(&self) -> bool {
        self.remote_path != self.local_name
    }
}

/// Files fetched together from one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLeg {
    pub kind: LegKind,
    pub repo: Repo,
    pub assets: Vec<AssetSpec>,
}

impl AssetLeg {
    /// Filters selecting exactly this leg's remote files
    pub fn filters(&self) -> Result<GlobFilters, HubError> {
        GlobFilters::literal(self.assets.iter().map(|a| a.remote_path.as_str()))
    }
}

/// Everything needed to materialise a variant in a flat directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAssetPlan {
    pub variant: String,
    pub legs: Vec<AssetLeg>,
    /// Namespaced directories left behind by relocation
    pub cleanup_dirs: Vec<String>,
}

impl ModelAssetPlan {
    /// Leg and spec providing `role`
    pub fn asset(&self, role: AssetRole) -> Option<(&AssetLeg, &AssetSpec)> {
        self.legs.iter().find_map(|leg| {
            leg.assets
                .iter()
                .find(|a| a.role == role)
                .map(|asset| (leg, asset))
        })
    }

    /// Canonical file names present once the plan has completed
    pub fn canonical_files(&self) -> Vec<&str> {
        self.legs
            .iter()
            .flat_map(|leg| leg.assets.iter().map(|a| a.local_name.as_str()))
            .collect()
    }
}

/// Where a variant's encoder and decoder come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderDecoderSource {
    /// Vendor-optimised binaries downloaded from the vendor's repository and renamed
    Vendor {
        repo: &'static str,
        /// Empty for the default revision
        revision: &'static str,
    },
    /// Reference conversions in a directory of [`SHARED_REPO`], moved to the flat layout
    Reference { dir: &'static str },
}

/// Static description of a model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantConfig {
    /// Variant identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub config_repo: &'static str,
    pub tokenizer_repo: &'static str,
    pub encoder_decoder: EncoderDecoderSource,
    /// Directory of [`SHARED_REPO`] holding the feature extractor
    pub feature_extractor_dir: &'static str,
}

impl VariantConfig {
    /// Whether the encoder/decoder pair comes from a vendor repository
    pub fn is_vendor(&self) -> bool {
        matches!(self.encoder_decoder, EncoderDecoderSource::Vendor { .. })
    }

    /// Build the download plan for this variant
    pub fn plan(&self) -> ModelAssetPlan {
        let config = AssetLeg {
            kind: LegKind::Config,
            repo: Repo::model(self.config_repo),
            assets: vec![AssetSpec::new(AssetRole::Config, CONFIG_FILE, CONFIG_FILE)],
        };

        let tokenizer = AssetLeg {
            kind: LegKind::Tokenizer,
            repo: Repo::model(self.tokenizer_repo),
            assets: vec![AssetSpec::new(
                AssetRole::Tokenizer,
                TOKENIZER_FILE,
                TOKENIZER_FILE,
            )],
        };

        let mut cleanup_dirs = Vec::new();
        let encoder_decoder = match self.encoder_decoder {
            EncoderDecoderSource::Vendor { repo, revision } => AssetLeg {
                kind: LegKind::EncoderDecoder,
                repo: Repo::model(repo).at_revision(revision),
                assets: vec![
                    AssetSpec::new(AssetRole::Encoder, VENDOR_ENCODER_FILE, ENCODER_FILE),
                    AssetSpec::new(AssetRole::Decoder, VENDOR_DECODER_FILE, DECODER_FILE),
                ],
            },
            EncoderDecoderSource::Reference { dir } => {
                cleanup_dirs.push(dir.to_string());
                AssetLeg {
                    kind: LegKind::EncoderDecoder,
                    repo: Repo::model(SHARED_REPO),
                    assets: vec![
                        AssetSpec::new(
                            AssetRole::Encoder,
                            format!("{}/{}", dir, ENCODER_FILE),
                            ENCODER_FILE,
                        ),
                        AssetSpec::new(
                            AssetRole::Decoder,
                            format!("{}/{}", dir, DECODER_FILE),
                            DECODER_FILE,
                        ),
                    ],
                }
            }
        };

        let feature_extractor = AssetLeg {
            kind: LegKind::FeatureExtractor,
            repo: Repo::model(SHARED_REPO),
            assets: vec![AssetSpec::new(
                AssetRole::FeatureExtractor,
                format!("{}/{}", self.feature_extractor_dir, FEATURE_EXTRACTOR_FILE),
                FEATURE_EXTRACTOR_FILE,
            )],
        };
        if !cleanup_dirs.iter().any(|d| d == self.feature_extractor_dir) {
            cleanup_dirs.push(self.feature_extractor_dir.to_string());
        }

        ModelAssetPlan {
            variant: self.id.to_string(),
            legs: vec![config, tokenizer, encoder_decoder, feature_extractor],
            cleanup_dirs,
        }
    }
}

const fn reference(
    id: &'static str,
    name: &'static str,
    openai_repo: &'static str,
    dir: &'static str,
) -> VariantConfig {
    VariantConfig {
        id,
        name,
        config_repo: openai_repo,
        tokenizer_repo: openai_repo,
        encoder_decoder: EncoderDecoderSource::Reference { dir },
        feature_extractor_dir: dir,
    }
}

const fn vendor(
    id: &'static str,
    name: &'static str,
    openai_repo: &'static str,
    repo: &'static str,
    revision: &'static str,
    feature_extractor_dir: &'static str,
) -> VariantConfig {
    VariantConfig {
        id,
        name,
        config_repo: openai_repo,
        tokenizer_repo: openai_repo,
        encoder_decoder: EncoderDecoderSource::Vendor { repo, revision },
        feature_extractor_dir,
    }
}

/// Registered variants
pub static VARIANTS: LazyLock<Vec<VariantConfig>> = LazyLock::new(|| {
    vec![
        reference(
            "whisperkit-litert/openai_whisper-tiny.en",
            "Whisper Tiny (English)",
            "openai/whisper-tiny.en",
            "openai_whisper-tiny.en",
        ),
        reference(
            "whisperkit-litert/openai_whisper-base.en",
            "Whisper Base (English)",
            "openai/whisper-base.en",
            "openai_whisper-base.en",
        ),
        reference(
            "whisperkit-litert/openai_whisper-tiny",
            "Whisper Tiny",
            "openai/whisper-tiny",
            "openai_whisper-tiny",
        ),
        reference(
            "whisperkit-litert/openai_whisper-base",
            "Whisper Base",
            "openai/whisper-base",
            "openai_whisper-base",
        ),
        reference(
            "whisperkit-litert/openai_whisper-small.en",
            "Whisper Small (English)",
            "openai/whisper-small.en",
            "openai_whisper-small.en",
        ),
        vendor(
            "qualcomm/Whisper_Tiny_En",
            "Whisper Tiny (English, Qualcomm)",
            "openai/whisper-tiny.en",
            "qualcomm/Whisper-Tiny-En",
            "8309cf4d4c30c69132f4f5e83ca8dcb7c17407ae",
            "quic_openai_whisper-tiny.en",
        ),
        vendor(
            "qualcomm/Whisper_Base_En",
            "Whisper Base (English, Qualcomm)",
            "openai/whisper-base.en",
            "qualcomm/Whisper-Base-En",
            "4bc89f2f841ee034383a543b954a432febf10ccc",
            "quic_openai_whisper-base.en",
        ),
        vendor(
            "qualcomm/Whisper_Small_En",
            "Whisper Small (English, Qualcomm)",
            "openai/whisper-small.en",
            "qualcomm/Whisper-Small-En",
            "",
            "quic_openai_whisper-small.en",
        ),
    ]
});

/// Get a variant by id
pub fn get_variant(id: &str) -> Option<&'static VariantConfig> {
    VARIANTS.iter().find(|v| v.id == id)
}

/// Ids of all registered variants
pub fn variant_ids() -> Vec<&'static str> {
    VARIANTS.iter().map(|v| v.id).collect()
}

/// Resolve a variant id to its download plan
pub fn resolve(variant: &str) -> Result<ModelAssetPlan, ModelError> {
    get_variant(variant)
        .map(VariantConfig::plan)
        .ok_or_else(|| ModelError::UnknownVariant(variant.to_string()))
}
