use std::sync::Arc;

use ff_core::{Error, ImageGenerator, Result, TextRewriter};
use tracing::info;

use crate::policy::Guarded;
use crate::{Config, Provider};

pub mod dummy;
pub mod gateway;

pub use dummy::DummyModel;
pub use gateway::GatewayModel;

pub fn create_image_generator(config: &Config) -> Result<Arc<dyn ImageGenerator>> {
    let generator: Arc<dyn ImageGenerator> = match config.provider {
        Provider::Gateway => Arc::new(Guarded::new(GatewayModel::new(config)?, config.policy)),
        Provider::Dummy => Arc::new(Guarded::new(DummyModel::new(), config.policy)),
    };
    info!("🎨 Image generation via {}", generator.name());
    Ok(generator)
}

pub fn create_rewriter(config: &Config) -> Result<Arc<dyn TextRewriter>> {
    let rewriter: Arc<dyn TextRewriter> = match config.provider {
        Provider::Gateway => Arc::new(Guarded::new(GatewayModel::new(config)?, config.policy)),
        Provider::Dummy => Arc::new(Guarded::new(DummyModel::new(), config.policy)),
    };
    info!("🤖 Copy rewriting via {}", rewriter.name());
    Ok(rewriter)
}

pub(crate) fn missing_key() -> Error {
    Error::Config("AI gateway API key is required (set AI_GATEWAY_API_KEY)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_requires_key() {
        let config = Config::default();
        assert!(matches!(create_image_generator(&config), Err(Error::Config(_))));
        assert!(matches!(create_rewriter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_factories() {
        let config = Config {
            provider: Provider::Dummy,
            ..Config::default()
        };
        assert_eq!(create_image_generator(&config).unwrap().name(), "Dummy");

        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert_eq!(create_rewriter(&config).unwrap().name(), "AI Gateway");
    }
}
