//! Lab configuration and API credential selection.

use crate::generator::{DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::retry::RetryPolicy;
use crate::style::DEFAULT_STYLE_ID;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// File holding a user-supplied API key inside the data directory.
pub const CUSTOM_KEY_FILE: &str = "custom_api_key";

/// Errors from configuration and credential handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key configured - set GEMINI_API_KEY or store a custom key")]
    NoApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for a [`crate::CreatureLab`].
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Directory holding the gallery and the custom key.
    pub data_dir: PathBuf,

    /// Model for profiles and prompt helpers.
    pub text_model: String,

    /// Model for artwork.
    pub image_model: String,

    /// Initial art style id.
    pub style_id: String,

    /// Retry policy wrapped around every generation call.
    pub retry: RetryPolicy,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".creature-lab"),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            style_id: DEFAULT_STYLE_ID.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl LabConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `CREATURE_LAB_DATA_DIR`, `GEMINI_TEXT_MODEL`
    /// and `GEMINI_IMAGE_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("CREATURE_LAB_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("GEMINI_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Ok(model) = std::env::var("GEMINI_IMAGE_MODEL") {
            config.image_model = model;
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_style(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = style_id.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Credential store inside this config's data directory.
    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(&self.data_dir)
    }
}

/// The optional user-supplied API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CUSTOM_KEY_FILE),
        }
    }

    /// The stored key, if one is present and non-empty.
    pub async fn load(&self) -> Option<String> {
        let key = fs::read_to_string(&self.path).await.ok()?;
        let key = key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    pub async fn set(&self, key: &str) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, key.trim()).await?;
        Ok(())
    }

    /// Forget the stored key. Clearing an absent key is fine.
    pub async fn clear(&self) -> Result<(), ConfigError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The custom key when present, else `GEMINI_API_KEY`, else `API_KEY`.
    /// Blank values count as unset.
    pub async fn resolve(&self) -> Result<String, ConfigError> {
        let custom = self.load().await;
        resolve_key(custom, |name| std::env::var(name).ok())
    }
}

fn resolve_key(
    custom: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    gemini::first_key([custom, env("GEMINI_API_KEY"), env("API_KEY")]).ok_or(ConfigError::NoApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = LabConfig::new("/tmp/lab")
            .with_text_model("gemini-test")
            .with_style("ink_wash")
            .with_retry(RetryPolicy::no_retry());

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lab"));
        assert_eq!(config.text_model, "gemini-test");
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.style_id, "ink_wash");
        assert_eq!(config.retry.max_retries, 0);
    }

    #[tokio::test]
    async fn test_custom_key_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = CredentialStore::new(temp_dir.path());

        assert!(store.load().await.is_none());
        store.set("  my-key\n").await.unwrap();
        assert_eq!(store.load().await.as_deref(), Some("my-key"));
        assert_eq!(store.resolve().await.unwrap(), "my-key");

        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
        store.clear().await.unwrap();
    }

    #[test]
    fn test_blank_env_key_falls_back() {
        let env = |name: &str| match name {
            "GEMINI_API_KEY" => Some(String::new()),
            "API_KEY" => Some("real-key".to_string()),
            _ => None,
        };
        assert_eq!(resolve_key(None, env).unwrap(), "real-key");
        assert_eq!(resolve_key(Some("custom".to_string()), env).unwrap(), "custom");
        assert!(matches!(
            resolve_key(None, |_| Some("  ".to_string())),
            Err(ConfigError::NoApiKey)
        ));
    }

    #[tokio::test]
    async fn test_blank_key_is_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = CredentialStore::new(temp_dir.path());
        store.set("   ").await.unwrap();
        assert!(store.load().await.is_none());
    }
}
