use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::ollama::DEFAULT_OLLAMA_URL;
use crate::provider::Provider;
use crate::session::ImagePolicy;
use crate::vision::weights::{DEFAULT_CLASSIFIER_FILE, DEFAULT_CLASSIFIER_REPO};

pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub classifier_repo: Option<String>,
    pub classifier_file: Option<String>,
    pub keep_upload_open: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Apply `change` to the file at `config_path` and write it back.
    /// A file that cannot be read or parsed is left untouched.
    pub fn update_at(config_path: &Path, change: impl FnOnce(&mut Config)) -> Result<()> {
        let mut config = Self::load_from(config_path).with_context(|| {
            format!("Not overwriting unreadable config {}", config_path.display())
        })?;
        change(&mut config);
        config.save_to(config_path)
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        Self::update_at(&Self::get_config_path()?, |config| {
            config.default_model = Some(model.to_string());
        })
    }

    pub fn save_provider(provider: Provider) -> Result<()> {
        Self::update_at(&Self::get_config_path()?, |config| {
            config.provider = Some(provider.as_str().to_string());
        })
    }

    pub fn save_gemini_api_key(api_key: &str) -> Result<()> {
        Self::update_at(&Self::get_config_path()?, |config| {
            config.gemini_api_key = Some(api_key.to_string());
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    /// Configured model, falling back to the provider default
    pub fn model_for(&self, provider: Provider) -> String {
        match (&self.default_model, self.provider()) {
            (Some(model), configured) if configured == provider => model.clone(),
            _ => provider.default_model().to_string(),
        }
    }

    /// Environment variable first, then the config file
    pub fn gemini_api_key(&self) -> Option<String> {
        std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }

    pub fn ollama_url(&self) -> String {
        std::env::var(OLLAMA_HOST_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| self.ollama_url.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    pub fn classifier_repo(&self) -> &str {
        self.classifier_repo.as_deref().unwrap_or(DEFAULT_CLASSIFIER_REPO)
    }

    pub fn classifier_file(&self) -> &str {
        self.classifier_file.as_deref().unwrap_or(DEFAULT_CLASSIFIER_FILE)
    }

    pub fn image_policy(&self) -> ImagePolicy {
        if self.keep_upload_open.unwrap_or(false) {
            ImagePolicy::Sticky
        } else {
            ImagePolicy::SingleShot
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("mrdoc").join("config.json"))
    }
}
