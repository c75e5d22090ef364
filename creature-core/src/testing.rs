//! Testing utilities for the creature lab.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic testing without API calls
//! - `mock_lab` for an in-memory lab with retries disabled
//! - Assertion helpers for verifying lab state

use crate::creature::{
    creature_from_value, parse_creature, CreatureRecord, InvalidResponse, Requirement,
};
use crate::generator::{CreatureGenerator, GenerationError};
use crate::history::HistoryStore;
use crate::lab::{CreatureLab, GenerationStatus};
use crate::retry::RetryPolicy;
use crate::style::ArtStyle;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A scripted reply from the mock generator.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A decoded creature profile, validated like a real response.
    Creature(Value),
    /// Raw text: a prompt for the text helpers, JSON text for profiles.
    Text(String),
    /// An image `data:` URI.
    Image(String),
    /// A response that carried no image payload.
    NoImage,
    /// A transport or service failure.
    Fail(String),
}

/// A call the mock generator received.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    OptimizePrompt(String),
    RandomPrompt,
    Creature {
        prompt: String,
        custom_name: Option<String>,
    },
    Evolution {
        from: String,
        ultimate: bool,
    },
    PreEvolution {
        from: String,
        target: String,
    },
    Image {
        name: String,
        description: String,
        style: &'static str,
    },
}

/// A generator that returns scripted replies in order.
///
/// Replies are queued per kind (text helpers, profiles, images). An empty
/// queue answers with a failure.
#[derive(Debug, Default)]
pub struct MockGenerator {
    text: Mutex<VecDeque<MockReply>>,
    data: Mutex<VecDeque<MockReply>>,
    images: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a profile for the next creature/evolution/pre-evolution call.
    pub fn with_creature(mut self, value: Value) -> Self {
        self.data.get_mut().push_back(MockReply::Creature(value));
        self
    }

    /// Queue raw profile text (for malformed JSON cases).
    pub fn with_creature_text(mut self, text: impl Into<String>) -> Self {
        self.data.get_mut().push_back(MockReply::Text(text.into()));
        self
    }

    pub fn with_data_failure(mut self, message: impl Into<String>) -> Self {
        self.data.get_mut().push_back(MockReply::Fail(message.into()));
        self
    }

    pub fn with_image(mut self, data_uri: impl Into<String>) -> Self {
        self.images.get_mut().push_back(MockReply::Image(data_uri.into()));
        self
    }

    pub fn with_no_image(mut self) -> Self {
        self.images.get_mut().push_back(MockReply::NoImage);
        self
    }

    pub fn with_image_failure(mut self, message: impl Into<String>) -> Self {
        self.images.get_mut().push_back(MockReply::Fail(message.into()));
        self
    }

    /// Queue a reply for the next optimize/random prompt call.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text.get_mut().push_back(MockReply::Text(text.into()));
        self
    }

    pub fn with_text_failure(mut self, message: impl Into<String>) -> Self {
        self.text.get_mut().push_back(MockReply::Fail(message.into()));
        self
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: MockCall) {
        self.calls.lock().await.push(call);
    }

    async fn next(queue: &Mutex<VecDeque<MockReply>>) -> MockReply {
        queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::Fail("no scripted reply".to_string()))
    }

    async fn next_text(&self) -> Result<String, GenerationError> {
        match Self::next(&self.text).await {
            MockReply::Text(text) => Ok(text),
            other => Err(unexpected(other)),
        }
    }

    async fn next_creature(&self, requirement: Requirement) -> Result<CreatureRecord, GenerationError> {
        match Self::next(&self.data).await {
            MockReply::Creature(value) => Ok(creature_from_value(value, requirement)?),
            MockReply::Text(text) => Ok(parse_creature(&text, requirement)?),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: MockReply) -> GenerationError {
    match reply {
        MockReply::Fail(message) => GenerationError::Service(gemini::Error::Network(message)),
        MockReply::NoImage => GenerationError::ImageGenerationFailed,
        other => InvalidResponse::Malformed(format!("unexpected scripted reply: {other:?}")).into(),
    }
}

#[async_trait]
impl CreatureGenerator for MockGenerator {
    async fn optimize_prompt(&self, input: &str) -> Result<String, GenerationError> {
        self.record(MockCall::OptimizePrompt(input.to_string())).await;
        self.next_text().await
    }

    async fn random_prompt(&self) -> Result<String, GenerationError> {
        self.record(MockCall::RandomPrompt).await;
        self.next_text().await
    }

    async fn generate_creature(
        &self,
        prompt: &str,
        custom_name: Option<&str>,
    ) -> Result<CreatureRecord, GenerationError> {
        self.record(MockCall::Creature {
            prompt: prompt.to_string(),
            custom_name: custom_name.map(str::to_string),
        })
        .await;
        self.next_creature(Requirement::NewCreature).await
    }

    async fn generate_evolution(
        &self,
        previous: &CreatureRecord,
        ultimate: bool,
    ) -> Result<CreatureRecord, GenerationError> {
        self.record(MockCall::Evolution {
            from: previous.name.clone(),
            ultimate,
        })
        .await;
        self.next_creature(Requirement::Lineage).await
    }

    async fn generate_pre_evolution(
        &self,
        current: &CreatureRecord,
        target_name: &str,
    ) -> Result<CreatureRecord, GenerationError> {
        self.record(MockCall::PreEvolution {
            from: current.name.clone(),
            target: target_name.to_string(),
        })
        .await;
        self.next_creature(Requirement::Lineage).await
    }

    async fn generate_image(
        &self,
        description: &str,
        record: &CreatureRecord,
        style: &ArtStyle,
    ) -> Result<String, GenerationError> {
        self.record(MockCall::Image {
            name: record.name.clone(),
            description: description.to_string(),
            style: style.id,
        })
        .await;
        match Self::next(&self.images).await {
            MockReply::Image(uri) => Ok(uri),
            other => Err(unexpected(other)),
        }
    }
}

/// A complete creature profile as the text model would return it.
pub fn creature_json(name: &str, types: &[&str], evolution_chain: &[&str]) -> Value {
    json!({
        "name": name,
        "englishName": format!("{name} (EN)"),
        "types": types,
        "species": "幻兽",
        "height": "1.2m",
        "weight": "30kg",
        "stats": {"vitality": 60, "power": 55, "armor": 50, "magic": 70, "spirit": 65, "agility": 60},
        "trait": {"name": "天赋", "description": "与生俱来的力量"},
        "skills": [
            {"name": "冲击", "type": types.first().copied().unwrap_or("无"), "description": "全力撞击"}
        ],
        "archiveLog": format!("关于{name}的档案。"),
        "evolutionChain": evolution_chain
    })
}

/// An in-memory lab over `generator` with retries disabled.
pub fn mock_lab(generator: MockGenerator) -> CreatureLab<MockGenerator> {
    CreatureLab::new(generator, HistoryStore::in_memory()).with_retry(RetryPolicy::no_retry())
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the lab is in the given status.
#[track_caller]
pub fn assert_status<G: CreatureGenerator>(lab: &CreatureLab<G>, expected: GenerationStatus) {
    assert_eq!(
        lab.status(),
        expected,
        "Expected status {expected:?}, got {:?} (last error: {:?})",
        lab.status(),
        lab.last_error()
    );
}

/// Assert the current creature has the given name.
#[track_caller]
pub fn assert_current<G: CreatureGenerator>(lab: &CreatureLab<G>, name: &str) {
    let actual = lab.current().map(|c| c.name.as_str());
    assert_eq!(actual, Some(name), "Expected current creature '{name}'");
}

/// Assert the gallery holds exactly these names, newest first.
#[track_caller]
pub fn assert_history<G: CreatureGenerator>(lab: &CreatureLab<G>, names: &[&str]) {
    assert_eq!(lab.history().available_forms(), names, "Unexpected history");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let generator = MockGenerator::new()
            .with_text("第一")
            .with_text_failure("offline");

        assert_eq!(generator.random_prompt().await.unwrap(), "第一");
        assert!(matches!(
            generator.random_prompt().await,
            Err(GenerationError::Service(_))
        ));
        assert!(generator.random_prompt().await.is_err());
        assert_eq!(generator.calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_validates_profiles() {
        let mut value = creature_json("岩龟", &["岩"], &["岩龟"]);
        value.as_object_mut().unwrap().remove("stats");
        let generator = MockGenerator::new().with_creature(value);

        let err = generator.generate_creature("岩石乌龟", None).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::InvalidResponse(InvalidResponse::MissingField("stats"))
        ));
    }

    #[tokio::test]
    async fn test_mock_no_image() {
        let generator = MockGenerator::new().with_no_image();
        let record = CreatureRecord::default();
        let err = generator
            .generate_image("desc", &record, ArtStyle::resolve("realistic"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ImageGenerationFailed));
        assert_eq!(
            generator.calls().await,
            vec![MockCall::Image {
                name: String::new(),
                description: "desc".to_string(),
                style: "realistic",
            }]
        );
    }
}
