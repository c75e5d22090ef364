//! Creature generation engine backed by Gemini.
//!
//! This crate provides:
//! - AI-synthesized creature profiles validated against a response schema
//! - Artwork generation in a choice of art styles
//! - Evolution lineage (evolve, ultimate evolve, pre-evolve)
//! - A local gallery of every generated creature
//!
//! # Quick Start
//!
//! ```ignore
//! use creature_core::{CreatureLab, LabConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LabConfig::from_env().with_style("ink_wash");
//!     let mut lab = CreatureLab::open(&config).await?;
//!
//!     let saved = lab.create("一只会发光的水母龙", None).await?;
//!     println!("{} joined the gallery", saved.data.name);
//!
//!     if lab.lineage().is_some_and(|l| l.eligibility.can_evolve) {
//!         lab.evolve(false).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod creature;
pub mod generator;
pub mod history;
pub mod lab;
pub mod lineage;
pub mod prompts;
pub mod retry;
pub mod style;
pub mod testing;

// Re-export for convenience
pub use creature_macros::ResponseSchema;

// Primary public API
pub use config::{ConfigError, CredentialStore, LabConfig};
pub use creature::{CreatureRecord, CreatureStats, HistoryRecord, InvalidResponse, Skill, Trait};
pub use generator::{CreatureGenerator, GeminiGenerator, GenerationError};
pub use history::{HistoryError, HistoryStore};
pub use lab::{Action, CreatureLab, GenerationStatus, LabError};
pub use lineage::{Eligibility, LineageView};
pub use retry::RetryPolicy;
pub use style::{ArtStyle, ART_STYLES};
pub use testing::{MockGenerator, MockReply};
