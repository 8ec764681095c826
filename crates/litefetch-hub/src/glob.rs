//! Client-side glob filtering of repository listings

use std::fmt;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::HubError;

/// A set of glob patterns; a filename is selected if any pattern matches it.
///
/// `*` and `?` never cross a `/`, so `*.json` only selects top-level files.
/// An empty set selects nothing.
#[derive(Debug, Clone)]
pub struct GlobFilters {
    patterns: Vec<String>,
    set: GlobSet,
}

impl GlobFilters {
    /// Compile a list of patterns
    pub fn new<I, S>(patterns: I) -> Result<Self, HubError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| HubError::InvalidGlob {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
            kept.push(pattern.to_string());
        }

        let set = builder.build().map_err(|e| HubError::InvalidGlob {
            pattern: kept.join(","),
            reason: e.to_string(),
        })?;

        Ok(Self { patterns: kept, set })
    }

    /// Filters that select exactly the given paths
    pub fn literal<I, S>(paths: I) -> Result<Self, HubError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = paths
            .into_iter()
            .map(|p| globset::escape(p.as_ref()))
            .collect();
        Self::new(escaped)
    }

    /// Whether `filename` is selected
    pub fn is_match(&self, filename: &str) -> bool {
        self.set.is_match(filename)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl fmt::Display for GlobFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.patterns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_does_not_cross_directories() {
        let filters = GlobFilters::new(["*.tflite"]).unwrap();
        assert!(filters.is_match("AudioEncoder.tflite"));
        assert!(!filters.is_match("openai_whisper-tiny/AudioEncoder.tflite"));
    }

    #[test]
    fn test_literal_paths() {
        let filters =
            GlobFilters::new(["WhisperEncoder.tflite", "WhisperDecoder.tflite"]).unwrap();
        assert!(filters.is_match("WhisperDecoder.tflite"));
        assert!(!filters.is_match("WhisperEncoder.onnx"));
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let filters = GlobFilters::literal(["weights[v2].bin"]).unwrap();
        assert!(filters.is_match("weights[v2].bin"));
        assert!(!filters.is_match("weightsv.bin"));
    }

    #[test]
    fn test_double_star() {
        let filters = GlobFilters::new(["**/MelSpectrogram.tflite"]).unwrap();
        assert!(filters.is_match("quic_openai_whisper-tiny.en/MelSpectrogram.tflite"));
    }

    #[test]
    fn test_empty_selects_nothing() {
        let filters = GlobFilters::new(Vec::<String>::new()).unwrap();
        assert!(filters.is_empty());
        assert!(!filters.is_match("config.json"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = GlobFilters::new(["model[.bin"]).unwrap_err();
        assert!(matches!(err, HubError::InvalidGlob { .. }));
    }
}
