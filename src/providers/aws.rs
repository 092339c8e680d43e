use super::{Provider, ProviderConfig};
use anyhow::Result;

/// AWS S3 with the default credential chain
#[derive(Debug, Default)]
pub struct AwsProvider;

impl AwsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn description(&self) -> &str {
        "Amazon Web Services S3 (default)"
    }

    async fn build_config(&self) -> Result<ProviderConfig> {
        Ok(ProviderConfig::default())
    }
}
