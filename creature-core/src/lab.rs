//! CreatureLab - the generation orchestrator.
//!
//! The lab owns the "current creature" and "current image" for one user and
//! runs generation cycles: a data call followed by an image call, each wrapped
//! in the retry policy. Successful cycles land in the [`HistoryStore`].
//!
//! Failure handling is asymmetric:
//! - a failed *data* call during evolution or pre-evolution restores the
//!   creature that was current before the call;
//! - a failed *image* call keeps the freshly generated creature current, so
//!   the image can be retried with [`CreatureLab::retry_image`].
//!
//! A cycle future dropped before it finishes (a timeout, a cancelled task)
//! leaves the lab in `Error` rather than busy.

use crate::config::{ConfigError, LabConfig};
use crate::creature::{CreatureRecord, HistoryRecord};
use crate::generator::{CreatureGenerator, GeminiGenerator, GenerationError};
use crate::history::{HistoryError, HistoryStore};
use crate::lineage::LineageView;
use crate::prompts;
use crate::retry::RetryPolicy;
use crate::style::ArtStyle;
use gemini::Gemini;
use std::ops::{Deref, DerefMut};
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{error, info, warn};

/// Where a generation cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    GeneratingData,
    GeneratingImage,
    Complete,
    Error,
}

impl GenerationStatus {
    /// A cycle is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::GeneratingData | Self::GeneratingImage)
    }
}

/// The user action that started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Evolve,
    UltimateEvolve,
    PreEvolve,
    RetryImage,
}

impl Action {
    /// Message prefix for a failed data step.
    fn data_failure_prefix(self) -> &'static str {
        match self {
            Action::Create => "生成失败",
            Action::Evolve => "幻化失败",
            Action::UltimateEvolve => "觉醒失败",
            Action::PreEvolve => "生成前置形态失败",
            Action::RetryImage => IMAGE_FAILURE_PREFIX,
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Action::Create => "generate_creature",
            Action::Evolve | Action::UltimateEvolve => "generate_evolution",
            Action::PreEvolve => "generate_pre_evolution",
            Action::RetryImage => "generate_image",
        }
    }
}

const IMAGE_FAILURE_PREFIX: &str = "绘制失败";
const SAVE_FAILURE_PREFIX: &str = "保存失败";
const CANCELLED_MESSAGE: &str = "生成已取消";

/// Which suspension point of a cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Data,
    Image,
}

/// Errors from lab operations.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("A prompt or name is required")]
    EmptyInput,

    #[error("A generation cycle is already in progress")]
    Busy,

    #[error("No current creature")]
    NoCurrentCreature,

    #[error("No failed image to retry")]
    NoPendingImage,

    #[error("No saved creature named {0}")]
    UnknownCreature(String),

    #[error("Unknown art style: {0}")]
    UnknownStyle(String),

    #[error("{message}")]
    Generation {
        action: Action,
        stage: CycleStage,
        message: String,
        #[source]
        source: GenerationError,
    },

    #[error("保存失败: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The creature generation session.
pub struct CreatureLab<G> {
    generator: G,
    history: HistoryStore,
    retry: RetryPolicy,
    style: &'static ArtStyle,
    status: GenerationStatus,
    current: Option<CreatureRecord>,
    current_image: Option<String>,
    last_error: Option<String>,
    pending_image: Option<String>,
}

/// Exclusive access to the lab for one cycle. Dropping it while the cycle
/// is still busy moves the lab to `Error`.
struct CycleGuard<'a, G> {
    lab: &'a mut CreatureLab<G>,
}

impl<G> Deref for CycleGuard<'_, G> {
    type Target = CreatureLab<G>;

    fn deref(&self) -> &Self::Target {
        self.lab
    }
}

impl<G> DerefMut for CycleGuard<'_, G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lab
    }
}

impl<G> Drop for CycleGuard<'_, G> {
    fn drop(&mut self) {
        if self.lab.status.is_busy() {
            warn!(status = ?self.lab.status, "generation cycle cancelled");
            self.lab.status = GenerationStatus::Error;
            self.lab.last_error = Some(CANCELLED_MESSAGE.to_string());
        }
    }
}

impl CreatureLab<GeminiGenerator> {
    /// Open a Gemini-backed lab: resolve the API key, load the gallery.
    pub async fn open(config: &LabConfig) -> Result<Self, LabError> {
        let api_key = config.credentials().resolve().await?;
        let generator = GeminiGenerator::with_client(Gemini::new(api_key))
            .with_text_model(config.text_model.clone())
            .with_image_model(config.image_model.clone());
        let history = HistoryStore::load_from_dir(&config.data_dir).await;

        Ok(Self::new(generator, history)
            .with_retry(config.retry.clone())
            .with_style(ArtStyle::resolve(&config.style_id)))
    }
}

impl<G: CreatureGenerator> CreatureLab<G> {
    pub fn new(generator: G, history: HistoryStore) -> Self {
        Self {
            generator,
            history,
            retry: RetryPolicy::default(),
            style: &crate::style::ART_STYLES[0],
            status: GenerationStatus::Idle,
            current: None,
            current_image: None,
            last_error: None,
            pending_image: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_style(mut self, style: &'static ArtStyle) -> Self {
        self.style = style;
        self
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn current(&self) -> Option<&CreatureRecord> {
        self.current.as_ref()
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_image.as_deref()
    }

    /// User-facing message of the last failed cycle.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn style(&self) -> &'static ArtStyle {
        self.style
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Whether an image failure left something for [`Self::retry_image`].
    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }

    /// Lineage of the current creature, reconciled against the gallery.
    pub fn lineage(&self) -> Option<LineageView> {
        self.current
            .as_ref()
            .map(|current| LineageView::new(current, self.history.records()))
    }

    pub fn set_style(&mut self, style_id: &str) -> Result<(), LabError> {
        self.style =
            ArtStyle::find(style_id).ok_or_else(|| LabError::UnknownStyle(style_id.to_string()))?;
        Ok(())
    }

    /// Return from `Error` to `Idle`, clearing the message.
    pub fn dismiss_error(&mut self) {
        if self.status == GenerationStatus::Error {
            self.status = GenerationStatus::Idle;
            self.last_error = None;
        }
    }

    /// Rewrite a short description. Falls back to the input on failure.
    pub async fn optimize_prompt(&self, input: &str) -> Result<String, LabError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LabError::EmptyInput);
        }

        match self
            .retry
            .run("optimize_prompt", || self.generator.optimize_prompt(input))
            .await
        {
            Ok(optimized) => Ok(optimized),
            Err(e) => {
                warn!(error = %e, "prompt optimization failed, keeping the original");
                Ok(input.to_string())
            }
        }
    }

    /// Invent a prompt. Falls back to a local list on failure.
    pub async fn random_prompt(&self) -> String {
        match self
            .retry
            .run("random_prompt", || self.generator.random_prompt())
            .await
        {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "random prompt failed, using a local one");
                prompts::FALLBACK_PROMPTS
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(prompts::DEFAULT_RANDOM_PROMPT)
                    .to_string()
            }
        }
    }

    /// Generate a brand new creature from `prompt`.
    ///
    /// The current creature is cleared first. If only the image fails, the
    /// new creature stays current.
    pub async fn create(
        &mut self,
        prompt: &str,
        custom_name: Option<&str>,
    ) -> Result<HistoryRecord, LabError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(LabError::EmptyInput);
        }
        let custom_name = custom_name.map(str::trim).filter(|n| !n.is_empty());

        let mut lab = self.begin(Action::Create)?;
        lab.current = None;
        lab.current_image = None;
        lab.pending_image = None;

        let data = match lab
            .retry
            .run(Action::Create.operation(), || {
                lab.generator.generate_creature(prompt, custom_name)
            })
            .await
        {
            Ok(data) => data,
            Err(e) => return Err(lab.fail(Action::Create, CycleStage::Data, e)),
        };

        lab.current = Some(data.clone());
        lab.finish_with_image(Action::Create, prompt.to_string(), data)
            .await
    }

    /// Evolve the current creature one stage, or into its ultimate form.
    pub async fn evolve(&mut self, ultimate: bool) -> Result<HistoryRecord, LabError> {
        let previous = self.current.clone().ok_or(LabError::NoCurrentCreature)?;
        let action = if ultimate {
            Action::UltimateEvolve
        } else {
            Action::Evolve
        };
        let mut lab = self.begin(action)?;
        lab.pending_image = None;

        let evolved = match lab
            .retry
            .run(action.operation(), || {
                lab.generator.generate_evolution(&previous, ultimate)
            })
            .await
        {
            Ok(data) => data,
            Err(e) => {
                lab.current = Some(previous);
                return Err(lab.fail(action, CycleStage::Data, e));
            }
        };

        let description = prompts::evolution_image_description(&previous, &evolved, ultimate);
        lab.current = Some(evolved.clone());
        lab.finish_with_image(action, description, evolved).await
    }

    /// Generate the younger form `target_name` of the current creature.
    pub async fn generate_pre_evolution(
        &mut self,
        target_name: &str,
    ) -> Result<HistoryRecord, LabError> {
        let target_name = target_name.trim();
        if target_name.is_empty() {
            return Err(LabError::EmptyInput);
        }
        let current = self.current.clone().ok_or(LabError::NoCurrentCreature)?;
        let mut lab = self.begin(Action::PreEvolve)?;
        lab.pending_image = None;

        let younger = match lab
            .retry
            .run(Action::PreEvolve.operation(), || {
                lab.generator.generate_pre_evolution(&current, target_name)
            })
            .await
        {
            Ok(data) => data,
            Err(e) => {
                lab.current = Some(current);
                return Err(lab.fail(Action::PreEvolve, CycleStage::Data, e));
            }
        };

        let description = prompts::pre_evolution_image_description(&current, target_name, &younger);
        lab.current = Some(younger.clone());
        lab.finish_with_image(Action::PreEvolve, description, younger)
            .await
    }

    /// Re-run the image step that failed for the current creature.
    ///
    /// Only the image step runs, so the status goes straight to
    /// `GeneratingImage`.
    pub async fn retry_image(&mut self) -> Result<HistoryRecord, LabError> {
        let description = self.pending_image.clone().ok_or(LabError::NoPendingImage)?;
        let data = self.current.clone().ok_or(LabError::NoCurrentCreature)?;

        let mut lab = self.begin(Action::RetryImage)?;
        lab.finish_with_image(Action::RetryImage, description, data)
            .await
    }

    /// Make the newest saved creature called `name` current.
    pub fn select(&mut self, name: &str) -> Result<&CreatureRecord, LabError> {
        if self.status.is_busy() {
            return Err(LabError::Busy);
        }
        let record = self
            .history
            .find_by_name(name)
            .ok_or_else(|| LabError::UnknownCreature(name.to_string()))?;

        self.current_image = record.image_url.clone();
        self.pending_image = None;
        Ok(&*self.current.insert(record.data.clone()))
    }

    /// Delete a gallery entry. Unknown ids are ignored.
    pub async fn delete(&mut self, id: &str) -> Result<bool, LabError> {
        Ok(self.history.remove(id).await?)
    }

    fn begin(&mut self, action: Action) -> Result<CycleGuard<'_, G>, LabError> {
        if self.status.is_busy() {
            return Err(LabError::Busy);
        }
        info!(?action, "generation cycle started");
        self.status = match action {
            Action::RetryImage => GenerationStatus::GeneratingImage,
            _ => GenerationStatus::GeneratingData,
        };
        self.last_error = None;
        Ok(CycleGuard { lab: self })
    }

    async fn finish_with_image(
        &mut self,
        action: Action,
        description: String,
        data: CreatureRecord,
    ) -> Result<HistoryRecord, LabError> {
        self.status = GenerationStatus::GeneratingImage;
        self.current_image = None;
        self.pending_image = Some(description.clone());

        let style = self.style;
        let image = match self
            .retry
            .run("generate_image", || {
                self.generator.generate_image(&description, &data, style)
            })
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(self.fail(action, CycleStage::Image, e)),
        };

        self.current_image = Some(image.clone());
        self.pending_image = None;

        let record = HistoryRecord::new(data, Some(image));
        if let Err(e) = self.history.append(record.clone()).await {
            error!(error = %e, "failed to persist history");
            self.status = GenerationStatus::Error;
            self.last_error = Some(format!("{SAVE_FAILURE_PREFIX}: {e}"));
            return Err(e.into());
        }

        self.status = GenerationStatus::Complete;
        info!(?action, name = %record.data.name, id = %record.id, "generation cycle complete");
        Ok(record)
    }

    fn fail(&mut self, action: Action, stage: CycleStage, source: GenerationError) -> LabError {
        let prefix = match stage {
            CycleStage::Data => action.data_failure_prefix(),
            CycleStage::Image => IMAGE_FAILURE_PREFIX,
        };
        let message = format!("{prefix}: {source}");
        error!(?action, ?stage, error = %source, "generation cycle failed");

        self.status = GenerationStatus::Error;
        self.last_error = Some(message.clone());
        LabError::Generation {
            action,
            stage,
            message,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{creature_json, mock_lab, MockGenerator};

    #[test]
    fn test_status_busy() {
        assert!(GenerationStatus::GeneratingData.is_busy());
        assert!(GenerationStatus::GeneratingImage.is_busy());
        assert!(!GenerationStatus::Error.is_busy());
        assert!(!GenerationStatus::Complete.is_busy());
    }

    #[tokio::test]
    async fn test_empty_prompt_never_starts() {
        let mut lab = mock_lab(MockGenerator::new());
        assert!(matches!(lab.create("   ", None).await, Err(LabError::EmptyInput)));
        assert_eq!(lab.status(), GenerationStatus::Idle);
        assert!(lab.generator().calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_busy_guard_rejects_overlap() {
        let mut lab = mock_lab(MockGenerator::new());
        lab.status = GenerationStatus::GeneratingImage;
        assert!(matches!(lab.create("水母龙", None).await, Err(LabError::Busy)));
    }

    #[tokio::test]
    async fn test_retry_image_skips_data_step() {
        let generator = MockGenerator::new()
            .with_creature(creature_json("雷鸟", &["雷"], &["雷鸟"]))
            .with_image_failure("safety filter")
            .with_image("data:image/png;base64,AA");
        let mut lab = mock_lab(generator);
        lab.create("雷鸟", None).await.unwrap_err();

        let guard = lab.begin(Action::RetryImage).unwrap();
        assert_eq!(guard.status, GenerationStatus::GeneratingImage);
        assert!(guard.pending_image.is_some());
        drop(guard);

        assert_eq!(lab.status(), GenerationStatus::Error);
        assert_eq!(lab.last_error(), Some(CANCELLED_MESSAGE));
        assert!(lab.has_pending_image());

        lab.dismiss_error();
        lab.retry_image().await.unwrap();
        assert_eq!(lab.status(), GenerationStatus::Complete);
        assert!(!lab.has_pending_image());
    }

    #[tokio::test]
    async fn test_finished_cycle_guard_is_inert() {
        let mut lab = mock_lab(MockGenerator::new());
        let mut guard = lab.begin(Action::Create).unwrap();
        guard.status = GenerationStatus::Complete;
        drop(guard);
        assert_eq!(lab.status(), GenerationStatus::Complete);
        assert!(lab.last_error().is_none());
    }

    #[tokio::test]
    async fn test_evolve_requires_current() {
        let mut lab = mock_lab(MockGenerator::new());
        assert!(matches!(lab.evolve(false).await, Err(LabError::NoCurrentCreature)));
        assert!(matches!(
            lab.generate_pre_evolution("幼年").await,
            Err(LabError::NoCurrentCreature)
        ));
    }

    #[tokio::test]
    async fn test_failure_prefixes() {
        let generator = MockGenerator::new()
            .with_creature(creature_json("雷鸟", &["雷"], &["雷鸟"]))
            .with_image("data:image/png;base64,AA")
            .with_data_failure("quota exceeded");
        let mut lab = mock_lab(generator);

        lab.create("雷鸟", None).await.unwrap();
        let err = lab.evolve(true).await.unwrap_err();

        assert!(err.to_string().starts_with("觉醒失败: "));
        assert_eq!(lab.last_error(), Some(err.to_string().as_str()));

        lab.dismiss_error();
        assert_eq!(lab.status(), GenerationStatus::Idle);
        assert!(lab.last_error().is_none());
    }

    #[tokio::test]
    async fn test_set_style() {
        let mut lab = mock_lab(MockGenerator::new());
        lab.set_style("blueprint").unwrap();
        assert_eq!(lab.style().id, "blueprint");
        assert!(matches!(lab.set_style("watercolour"), Err(LabError::UnknownStyle(_))));
        assert_eq!(lab.style().id, "blueprint");
    }
}
