use std::fmt;

use async_trait::async_trait;
use ff_core::{ImageGenerator, Result, RewrittenCopy, TextRewriter};

/// Offline stand-in: a fixed placeholder image and copy passed through unchanged.
pub struct DummyModel;

pub const PLACEHOLDER_IMAGE: &str =
    "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciLz4=";

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        Ok(PLACEHOLDER_IMAGE.to_string())
    }
}

#[async_trait]
impl TextRewriter for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn rewrite_text(&self, title: &str, description: &str) -> Result<RewrittenCopy> {
        Ok(RewrittenCopy {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        assert_eq!(model.generate_image("anything").await.unwrap(), PLACEHOLDER_IMAGE);

        let copy = model.rewrite_text(" Bitcoin rallies ", "Up 5%").await.unwrap();
        assert_eq!(copy.title, "Bitcoin rallies");
        assert_eq!(copy.description, "Up 5%");
    }
}
