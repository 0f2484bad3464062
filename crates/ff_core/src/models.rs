use async_trait::async_trait;

use crate::types::RewrittenCopy;
use crate::Result;

/// Produces an illustrative image for an article.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a URL (or data URL) for an image matching the prompt.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// Rewrites article copy in a formal register.
#[async_trait]
pub trait TextRewriter: Send + Sync {
    fn name(&self) -> &str;

    async fn rewrite_text(&self, title: &str, description: &str) -> Result<RewrittenCopy>;
}
