//! Repository client configuration

use std::time::Duration;

use secrecy::SecretString;

use crate::error::HubError;

const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Longest allowed silence between two packets of a response
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client and download policy settings
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base URL of the artifact host
    pub endpoint: String,
    /// Bearer token for private or gated repositories
    pub token: Option<SecretString>,
    /// Attempts per file before a download is abandoned
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `retry_base_delay * 2^n`
    pub retry_base_delay: Duration,
    /// Socket inactivity timeout
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: concat!("litefetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HubConfig {
    /// Defaults overridden by `HF_ENDPOINT`, `HF_TOKEN`,
    /// `LITEFETCH_MAX_RETRIES` and `LITEFETCH_READ_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, HubError> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("HF_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }

        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                config.token = Some(SecretString::new(token));
            }
        }

        if let Ok(value) = std::env::var("LITEFETCH_MAX_RETRIES") {
            config.max_retries = value.parse().map_err(|_| {
                HubError::Config(format!("Invalid LITEFETCH_MAX_RETRIES: {}", value))
            })?;
        }

        if let Ok(value) = std::env::var("LITEFETCH_READ_TIMEOUT_MS") {
            let millis: u64 = value.parse().map_err(|_| {
                HubError::Config(format!("Invalid LITEFETCH_READ_TIMEOUT_MS: {}", value))
            })?;
            config.read_timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Point the client at another host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Reject settings the downloader cannot work with
    pub fn validate(&self) -> Result<(), HubError> {
        if self.max_retries == 0 {
            return Err(HubError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(HubError::Config(format!(
                "Endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.endpoint, "https://huggingface.co");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert!(config.token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = HubConfig::default().with_endpoint("http://127.0.0.1:8080/");
        assert_eq!(config.endpoint, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let config = HubConfig::default().with_max_retries(0);
        assert!(matches!(config.validate(), Err(HubError::Config(_))));
    }

    #[test]
    fn test_token_is_redacted() {
        let config = HubConfig::default().with_token("hf_secret");
        assert!(!format!("{:?}", config).contains("hf_secret"));
    }
}
