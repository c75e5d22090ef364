//! The generation client seam.
//!
//! [`CreatureGenerator`] is everything the lab needs from the AI services:
//! prompt helpers, validated creature profiles and artwork. [`GeminiGenerator`]
//! implements it over the Gemini API; tests use [`crate::testing::MockGenerator`].

use crate::creature::{parse_creature, CreatureRecord, InvalidResponse, Requirement};
use crate::prompts;
use crate::style::ArtStyle;
use async_trait::async_trait;
use gemini::{Gemini, Request};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Errors from the generation services.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidResponse(#[from] InvalidResponse),

    #[error("Failed to generate image")]
    ImageGenerationFailed,

    #[error("Generation service error: {0}")]
    Service(#[from] gemini::Error),
}

/// The AI services behind the lab.
#[async_trait]
pub trait CreatureGenerator: Send + Sync {
    /// Rewrite a short description into a richer one.
    async fn optimize_prompt(&self, input: &str) -> Result<String, GenerationError>;

    /// Invent a creature description from nothing.
    async fn random_prompt(&self) -> Result<String, GenerationError>;

    /// Generate a new creature. Fails with `InvalidResponse` without `name`, `stats` or `types`.
    async fn generate_creature(
        &self,
        prompt: &str,
        custom_name: Option<&str>,
    ) -> Result<CreatureRecord, GenerationError>;

    /// Generate the next (or ultimate) form. Fails without `name`, `stats` or `evolutionChain`.
    async fn generate_evolution(
        &self,
        previous: &CreatureRecord,
        ultimate: bool,
    ) -> Result<CreatureRecord, GenerationError>;

    /// Generate a younger form named `target_name`. Same validation as evolution.
    async fn generate_pre_evolution(
        &self,
        current: &CreatureRecord,
        target_name: &str,
    ) -> Result<CreatureRecord, GenerationError>;

    /// Render artwork, returned as a `data:` URI.
    async fn generate_image(
        &self,
        description: &str,
        record: &CreatureRecord,
        style: &ArtStyle,
    ) -> Result<String, GenerationError>;
}

/// [`CreatureGenerator`] backed by the Gemini API.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Gemini,
    text_model: String,
    image_model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Gemini::new(api_key))
    }

    pub fn with_client(client: Gemini) -> Self {
        Self {
            client,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    async fn text(&self, request: Request) -> Result<String, GenerationError> {
        let response = self
            .client
            .generate(request.with_model(self.text_model.clone()))
            .await?;
        Ok(response.text())
    }

    async fn structured(
        &self,
        prompt: String,
        requirement: Requirement,
    ) -> Result<CreatureRecord, GenerationError> {
        let request = Request::text(prompt).with_json_schema(CreatureRecord::response_schema());
        let text = self.text(request).await?;
        let record = parse_creature(&text, requirement)?;
        debug!(name = %record.name, id = %record.id, "parsed creature profile");
        Ok(record)
    }
}

#[async_trait]
impl CreatureGenerator for GeminiGenerator {
    async fn optimize_prompt(&self, input: &str) -> Result<String, GenerationError> {
        let text = self.text(Request::text(prompts::optimize_prompt(input))).await?;
        Ok(non_empty_or(text, input))
    }

    async fn random_prompt(&self) -> Result<String, GenerationError> {
        let request = Request::text(prompts::random_prompt()).with_temperature(1.2);
        let text = self.text(request).await?;
        Ok(non_empty_or(text, prompts::DEFAULT_RANDOM_PROMPT))
    }

    async fn generate_creature(
        &self,
        prompt: &str,
        custom_name: Option<&str>,
    ) -> Result<CreatureRecord, GenerationError> {
        self.structured(
            prompts::creature_prompt(prompt, custom_name),
            Requirement::NewCreature,
        )
        .await
    }

    async fn generate_evolution(
        &self,
        previous: &CreatureRecord,
        ultimate: bool,
    ) -> Result<CreatureRecord, GenerationError> {
        self.structured(
            prompts::evolution_prompt(previous, ultimate),
            Requirement::Lineage,
        )
        .await
    }

    async fn generate_pre_evolution(
        &self,
        current: &CreatureRecord,
        target_name: &str,
    ) -> Result<CreatureRecord, GenerationError> {
        let record = self
            .structured(
                prompts::pre_evolution_prompt(current, target_name),
                Requirement::Lineage,
            )
            .await?;
        if record.name != target_name {
            warn!(expected = target_name, got = %record.name, "pre-evolution name differs from the requested one");
        }
        Ok(record)
    }

    async fn generate_image(
        &self,
        description: &str,
        record: &CreatureRecord,
        style: &ArtStyle,
    ) -> Result<String, GenerationError> {
        let request = Request::text(prompts::image_prompt(description, record, style))
            .with_model(self.image_model.clone())
            .with_aspect_ratio("1:1");
        let response = self.client.generate(request).await?;

        response
            .inline_data()
            .map(|blob| blob.as_data_uri())
            .ok_or(GenerationError::ImageGenerationFailed)
    }
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text.trim().to_string()
    }
}
