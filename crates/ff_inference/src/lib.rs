use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod models;
pub mod policy;
pub mod prompts;

pub use models::{create_image_generator, create_rewriter};
pub use policy::{CallPolicy, Guarded};

/// Which backend serves image and text generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-compatible chat completions gateway.
    Gateway,
    /// Offline placeholder output, no network.
    Dummy,
}

impl Default for Provider {
    fn default() -> Self {
        Self::Gateway
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_model: String,
    pub text_model: String,
    pub policy: CallPolicy,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "https://ai.gateway.lovable.dev/v1";
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            image_model: "google/gemini-2.5-flash-image-preview".to_string(),
            text_model: "google/gemini-2.5-flash".to_string(),
            policy: CallPolicy::new(Duration::from_secs(30), 1, Duration::from_millis(500)),
        }
    }
}

pub mod prelude {
    pub use super::{Config, Provider};
    pub use super::models::{create_image_generator, create_rewriter};
    pub use ff_core::{Error, ImageGenerator, Result, RewrittenCopy, TextRewriter};
}
