use super::{Provider, ProviderConfig};
use anyhow::{Result, anyhow};

/// Environment variable read by [`EndpointProvider::from_env`]
pub const ENDPOINT_ENV: &str = "PATHY_S3_ENDPOINT";

/// Any S3-compatible service reachable at a custom URL (MinIO, LocalStack, ...)
#[derive(Debug, Clone, Default)]
pub struct EndpointProvider {
    endpoint_url: Option<String>,
    anonymous: bool,
}

impl EndpointProvider {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            anonymous: false,
        }
    }

    /// Endpoint taken from `PATHY_S3_ENDPOINT`, if set
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var(ENDPOINT_ENV).ok().filter(|s| !s.is_empty()),
            anonymous: false,
        }
    }

    /// Skip credentials, for public buckets
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }
}

#[async_trait::async_trait]
impl Provider for EndpointProvider {
    fn name(&self) -> &str {
        "endpoint"
    }

    fn description(&self) -> &str {
        "S3-compatible service at a custom endpoint"
    }

    async fn build_config(&self) -> Result<ProviderConfig> {
        let endpoint_url = self
            .endpoint_url
            .clone()
            .ok_or_else(|| anyhow!("no endpoint configured; set {ENDPOINT_ENV} or pass --endpoint-url"))?;

        Ok(ProviderConfig {
            endpoint_url: Some(endpoint_url),
            force_path_style: true,
            anonymous: self.anonymous,
            default_region: Some("us-east-1".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_provider_config() {
        let provider = EndpointProvider::new("http://localhost:4566").anonymous(true);
        let config = provider.build_config().await.unwrap();
        assert_eq!(
            config.endpoint_url,
            Some("http://localhost:4566".to_string())
        );
        assert!(config.anonymous);
        assert!(config.force_path_style);
        assert_eq!(config.default_region, Some("us-east-1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_an_error() {
        let err = EndpointProvider::default().build_config().await.unwrap_err();
        assert!(err.to_string().contains(ENDPOINT_ENV));
    }
}
