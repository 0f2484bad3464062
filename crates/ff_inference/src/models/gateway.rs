use std::fmt;

use async_trait::async_trait;
use ff_core::{Error, ImageGenerator, Result, RewrittenCopy, TextRewriter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::prompts::{parse_rewrite, rewrite_prompt, REWRITE_SYSTEM_PROMPT};
use crate::Config;

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<[&'static str; 2]>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ImagePart>,
}

#[derive(Debug, Deserialize)]
struct ImagePart {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

impl ChatResponse {
    fn first_image(&self) -> Option<&str> {
        let url = self.choices.first()?.message.images.first()?.image_url.url.trim();
        (!url.is_empty()).then_some(url)
    }

    fn first_text(&self) -> Option<&str> {
        let text = self.choices.first()?.message.content.as_deref()?.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// OpenAI-compatible chat completions gateway serving both image and text models.
pub struct GatewayModel {
    client: Client,
    api_key: String,
    endpoint: Url,
    image_model: String,
    text_model: String,
}

impl fmt::Debug for GatewayModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .finish()
    }
}

impl GatewayModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(super::missing_key)?;
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint,
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
        })
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        debug!("POST {} model={}", self.endpoint, request.model);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Enrichment(format!(
                "{} answered {}: {}",
                request.model,
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response.json::<ChatResponse>().await?)
    }
}

#[async_trait]
impl ImageGenerator for GatewayModel {
    fn name(&self) -> &str {
        "AI Gateway"
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.image_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            modalities: Some(["image", "text"]),
        };
        let response = self.complete(&request).await?;
        response
            .first_image()
            .map(str::to_string)
            .ok_or_else(|| Error::Enrichment("no image in gateway response".to_string()))
    }
}

#[async_trait]
impl TextRewriter for GatewayModel {
    fn name(&self) -> &str {
        "AI Gateway"
    }

    async fn rewrite_text(&self, title: &str, description: &str) -> Result<RewrittenCopy> {
        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: REWRITE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: rewrite_prompt(title, description),
                },
            ],
            modalities: None,
        };
        let response = self.complete(&request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| Error::Enrichment("no text in gateway response".to_string()))?;
        parse_rewrite(text)
    }
}
