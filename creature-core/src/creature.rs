//! Creature data model and response validation.
//!
//! A [`CreatureRecord`] is what the text model produces for one creature.
//! Field doc comments double as the descriptions sent to the model in the
//! response schema, so they are written for the model, not for Rust readers.

use chrono::Utc;
use creature_macros::ResponseSchema;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Six combat attributes. Any numeric value the model returns is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ResponseSchema)]
#[serde(default)]
pub struct CreatureStats {
    pub vitality: f64,
    pub power: f64,
    pub armor: f64,
    pub magic: f64,
    pub spirit: f64,
    pub agility: f64,
}

impl CreatureStats {
    /// Sum of all six attributes.
    pub fn total(&self) -> f64 {
        self.vitality + self.power + self.armor + self.magic + self.spirit + self.agility
    }

    /// Attributes paired with their display labels, in card order.
    pub fn labeled(&self) -> [(&'static str, f64); 6] {
        [
            ("体力", self.vitality),
            ("力量", self.power),
            ("护甲", self.armor),
            ("魔力", self.magic),
            ("精神", self.spirit),
            ("敏捷", self.agility),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ResponseSchema)]
#[serde(default)]
pub struct Trait {
    /// Trait/Passive Ability name in Chinese
    pub name: String,
    /// Trait description in Chinese
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ResponseSchema)]
#[serde(default)]
pub struct Skill {
    /// Skill name in Chinese
    pub name: String,
    /// Skill elemental type in Chinese
    #[serde(rename = "type")]
    #[schema(rename = "type")]
    pub element: String,
    /// Skill description in Chinese
    pub description: String,
}

/// The structured profile of one generated creature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ResponseSchema)]
#[serde(default, rename_all = "camelCase")]
#[schema(rename_all = "camelCase")]
pub struct CreatureRecord {
    #[schema(skip)]
    pub id: String,
    /// Creature Name in Simplified Chinese (e.g. 炎魔龙)
    pub name: String,
    /// Creature English/Latin Name
    pub english_name: String,
    /// List of elemental types in Chinese, e.g. ['炎', '龙']
    pub types: Vec<String>,
    /// Species classification in Chinese, e.g. '古代龙种'
    pub species: String,
    /// Height in m
    pub height: String,
    /// Weight in kg
    pub weight: String,
    pub stats: CreatureStats,
    #[serde(rename = "trait")]
    #[schema(rename = "trait")]
    pub creature_trait: Trait,
    pub skills: Vec<Skill>,
    /// A lore entry for the creature archives in Simplified Chinese
    pub archive_log: String,
    /// Full evolution/ascension line names in Chinese including this one
    pub evolution_chain: Vec<String>,
}

impl CreatureRecord {
    /// Generate a fresh local id: `0x` followed by 40 hex digits.
    pub fn generate_id() -> String {
        let mut rng = rand::thread_rng();
        let digits: String = (0..40)
            .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
            .collect();
        format!("0x{digits}")
    }

    /// The first elemental type, which drives the card theme.
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}

/// Which fields a response must carry to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// A brand new creature: `name`, `stats`, `types`.
    NewCreature,
    /// An evolved or pre-evolved form: `name`, `stats`, `evolutionChain`.
    Lineage,
}

impl Requirement {
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Requirement::NewCreature => &["name", "stats", "types"],
            Requirement::Lineage => &["name", "stats", "evolutionChain"],
        }
    }
}

/// The model returned something that is not a usable creature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidResponse {
    #[error("Invalid data structure returned from AI: missing `{0}`")]
    MissingField(&'static str),

    #[error("Invalid data structure returned from AI: {0}")]
    Malformed(String),
}

/// Parse the model's JSON text into a validated record with a fresh id.
pub fn parse_creature(text: &str, requirement: Requirement) -> Result<CreatureRecord, InvalidResponse> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    let value: Value =
        serde_json::from_str(text).map_err(|e| InvalidResponse::Malformed(e.to_string()))?;
    creature_from_value(value, requirement)
}

/// Validate an already-decoded JSON value and assign a fresh id.
pub fn creature_from_value(value: Value, requirement: Requirement) -> Result<CreatureRecord, InvalidResponse> {
    if !value.is_object() {
        return Err(InvalidResponse::Malformed("expected a JSON object".to_string()));
    }

    for field in requirement.required_fields() {
        if !is_present(value.get(*field)) {
            return Err(InvalidResponse::MissingField(field));
        }
    }

    let mut record: CreatureRecord =
        serde_json::from_value(value).map_err(|e| InvalidResponse::Malformed(e.to_string()))?;
    record.id = CreatureRecord::generate_id();
    Ok(record)
}

// Missing, null, false, zero and "" all count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// One saved gallery entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub data: CreatureRecord,
    pub image_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HistoryRecord {
    /// Wrap a finished creature, stamped with the current time.
    pub fn new(data: CreatureRecord, image_url: Option<String>) -> Self {
        Self {
            id: data.id.clone(),
            data,
            image_url,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
