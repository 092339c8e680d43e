//! Object-store client configuration.

mod aws;
mod endpoint;

pub use aws::AwsProvider;
pub use endpoint::{ENDPOINT_ENV, EndpointProvider};

use anyhow::Result;
use aws_sdk_s3::Client;
use std::collections::HashMap;

use crate::s3::S3Client;

/// Configuration for creating an S3 client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Optional custom endpoint URL
    pub endpoint_url: Option<String>,
    /// Whether to use path-style addressing (required for most S3-compatible services)
    pub force_path_style: bool,
    /// Whether to skip credentials (for anonymous/public access)
    pub anonymous: bool,
    /// Optional region override
    pub default_region: Option<String>,
}

/// Supplies the configuration an S3 client is built from
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn build_config(&self) -> Result<ProviderConfig>;
}

/// Build an [`S3Client`] from a provider configuration
pub async fn create_s3_client(config: ProviderConfig) -> Result<S3Client> {
    let mut sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if config.anonymous {
        sdk_config = sdk_config.no_credentials();
    }

    if let Some(region) = config.default_region {
        sdk_config = sdk_config.region(aws_config::Region::new(region));
    }

    let base_config = sdk_config.load().await;

    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&base_config);

    if let Some(endpoint) = config.endpoint_url {
        log::debug!("using S3 endpoint {endpoint}");
        s3_config_builder = s3_config_builder.endpoint_url(endpoint);
    }

    if config.force_path_style {
        s3_config_builder = s3_config_builder.force_path_style(true);
    }

    let client = Client::from_conf(s3_config_builder.build());
    Ok(S3Client::from_client(client))
}

/// Registry of available providers
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create a new registry with all built-in providers
    pub fn new() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };

        registry.register(Box::new(AwsProvider::new()));
        registry.register(Box::new(EndpointProvider::from_env()));

        registry
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Provider> {
        self.providers.get(name).map(|p| p.as_ref())
    }

    /// Provider names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
