//! Image description service.

use std::sync::Arc;

use {async_trait::async_trait, tracing::debug};

use crate::{
    error::Error,
    json::{extract_json_object, str_field},
    model::{ChatMessage, ContentPart},
    openai::OpenAiProvider,
};

pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

const DESCRIBE_PROMPT: &str = "Describe this image. Respond with a JSON object \
containing a short \"title\" and a detailed \"description\", and nothing else.";

/// Title and description of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
    pub title: String,
    pub description: String,
}

impl ImageDescription {
    /// Parse model output into a description.
    ///
    /// Prefers a JSON `{title, description}` object; anything else becomes the
    /// description under the title `Image`. Returns `None` for empty output.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(obj) = extract_json_object(text)
            && let Some(description) = str_field(&obj, "description")
        {
            return Some(Self {
                title: str_field(&obj, "title").unwrap_or("Image").to_string(),
                description: description.to_string(),
            });
        }
        let raw = text.trim();
        (!raw.is_empty()).then(|| Self {
            title: "Image".into(),
            description: raw.to_string(),
        })
    }
}

/// Turns an image URL into a textual description.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image_url: &str) -> anyhow::Result<ImageDescription>;
}

/// Describes images with an OpenAI-compatible vision model.
pub struct OpenAiVisionDescriber {
    provider: Arc<OpenAiProvider>,
    model: String,
}

impl OpenAiVisionDescriber {
    pub fn new(provider: Arc<OpenAiProvider>, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl ImageDescriber for OpenAiVisionDescriber {
    async fn describe(&self, image_url: &str) -> anyhow::Result<ImageDescription> {
        let messages = [ChatMessage::user_multimodal(vec![
            ContentPart::Text(DESCRIBE_PROMPT.into()),
            ContentPart::ImageUrl(image_url.into()),
        ])];
        let resp = self
            .provider
            .complete_with_model(&self.model, &messages)
            .await?;
        let text = resp.text.unwrap_or_default();
        let description = ImageDescription::parse(&text)
            .ok_or_else(|| Error::message("vision model returned no description"))?;
        debug!(model = %self.model, title = %description.title, "described image");
        Ok(description)
    }
}
