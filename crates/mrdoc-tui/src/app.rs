use std::path::{Path, PathBuf};
use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use mrdoc_core::{
    Config, Consultation, Diagnosis, DoctorError, GeminiClient, ImageClassifier, ModelWeights, OllamaClient,
    Provider, Responder, TextGenerator, UploadedImage, VitClassifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Input,
    Upload,
}

/// One-line status shown under the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// What the result panel shows about the last decoded upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Chat state
    pub query_input: String,
    pub query_cursor: usize,
    pub query_loading: bool,
    pub query_scroll: u16,
    pub query_chat_height: u16,
    pub query_chat_width: u16,
    pub query_task: Option<tokio::task::JoinHandle<mrdoc_core::Result<String>>>,

    // Upload state
    pub upload_input: String,
    pub upload_cursor: usize,
    pub pending_upload: Option<PathBuf>,
    pub last_upload: Option<UploadSummary>,
    pub diagnosis: Option<Diagnosis>,

    pub notice: Option<Notice>,

    // Animation state
    pub animation_frame: u8,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Provider state
    pub current_provider: Provider,
    pub selected_model: String,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,

    // Updated during render for mouse hit-testing
    pub chat_area: Option<Rect>,

    // Data
    pub consultation: Consultation,
    pub config: Config,
    pub weights: ModelWeights,
    pub classifier: Option<Box<dyn ImageClassifier>>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let weights = ModelWeights::cached(config.classifier_repo(), config.classifier_file())?;
        let provider = config.provider();
        let model = config.model_for(provider);
        let generator = build_generator(provider, &model, &config);
        let consultation = Consultation::new(Responder::new(generator), config.image_policy());

        tracing::info!(provider = provider.as_str(), model = %model, "starting consultation");
        Ok(Self::with_consultation(consultation, config, weights, None))
    }

    /// Assemble an app around an existing consultation.
    /// The classifier is loaded from `weights` on first upload when `classifier` is `None`.
    pub fn with_consultation(
        consultation: Consultation,
        config: Config,
        weights: ModelWeights,
        classifier: Option<Box<dyn ImageClassifier>>,
    ) -> Self {
        let current_provider = config.provider();
        let selected_model = config.model_for(current_provider);

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,
            query_input: String::new(),
            query_cursor: 0,
            query_loading: false,
            query_scroll: 0,
            query_chat_height: 0,
            query_chat_width: 0,
            query_task: None,
            upload_input: String::new(),
            upload_cursor: 0,
            pending_upload: None,
            last_upload: None,
            diagnosis: None,
            notice: None,
            animation_frame: 0,
            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            current_provider,
            selected_model,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),
            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            chat_area: None,
            consultation,
            config,
            weights,
            classifier,
        }
    }

    pub fn awaiting_image(&self) -> bool {
        self.consultation.session().awaiting_image()
    }

    /// The result panel stays up after a single-shot upload closes the path input
    pub fn show_upload_panel(&self) -> bool {
        self.awaiting_image() || self.last_upload.is_some()
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(message = %text, "shown to user");
        self.notice = Some(Notice {
            text,
            is_error: true,
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.query_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Pick up the reply once the background request has finished
    pub async fn poll_reply(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            self.query_loading = false;
            match task.await {
                Ok(Ok(reply)) => {
                    self.consultation.finish_turn(reply);
                    self.scroll_query_to_bottom();
                }
                Ok(Err(err)) => self.set_error(format!("Could not get a reply: {}", err)),
                Err(err) => self.set_error(format!("Reply task failed: {}", err)),
            }
        }
    }

    /// Decode and classify the upload queued by the handler.
    /// Runs after a frame showing "Analyzing image..." has been drawn.
    pub async fn process_pending_upload(&mut self) {
        if let Some(path) = self.pending_upload.take() {
            self.examine_upload(&path).await;
        }
    }

    pub async fn examine_upload(&mut self, path: &Path) {
        let upload = match UploadedImage::open(path) {
            Ok(upload) => upload,
            Err(err) => {
                self.set_error(upload_failure(&path.display().to_string(), &err));
                return;
            }
        };

        if let Err(err) = self.ensure_classifier().await {
            self.set_error(format!("Could not load the image classifier: {}", err));
            return;
        }

        let Some(classifier) = self.classifier.as_deref_mut() else {
            return;
        };

        // The panel keeps the previous image and result until a new one classifies
        match self.consultation.examine(classifier, &upload) {
            Ok(diagnosis) => {
                let (width, height) = upload.dimensions();
                self.last_upload = Some(UploadSummary {
                    name: upload.name().to_string(),
                    width,
                    height,
                });
                self.diagnosis = Some(diagnosis);
                self.notice = None;
            }
            Err(err) => self.set_error(upload_failure(upload.name(), &err)),
        }
    }

    async fn ensure_classifier(&mut self) -> mrdoc_core::Result<()> {
        if self.classifier.is_none() {
            let path = self.weights.ensure().await?;
            tracing::info!(path = %path.display(), "loading image classifier");
            self.classifier = Some(Box::new(VitClassifier::load(&path)?));
        }
        Ok(())
    }

    /// Swap the text generator after a provider, model or key change
    pub fn rebuild_generator(&mut self) {
        let generator = build_generator(self.current_provider, &self.selected_model, &self.config);
        self.consultation.responder_mut().set_generator(generator);
        tracing::info!(
            generator = %self.consultation.responder().generator_label(),
            "text generator changed"
        );
    }

    /// Scroll chat to bottom so "Thinking..." is visible
    pub fn scroll_query_to_bottom(&mut self) {
        let wrap_width = if self.query_chat_width > 0 {
            self.query_chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for turn in self.consultation.session().turns() {
            total_lines = total_lines.saturating_add(1); // role line
            for line in turn.content.lines() {
                let wrapped = line.chars().count() / wrap_width + 1;
                let wrapped = u16::try_from(wrapped).unwrap_or(u16::MAX);
                total_lines = total_lines.saturating_add(wrapped);
            }
            total_lines = total_lines.saturating_add(1);
        }
        if self.query_loading {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.query_chat_height > 0 {
            self.query_chat_height
        } else {
            20
        };

        self.query_scroll = total_lines.saturating_sub(visible_height);
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub async fn open_model_picker(&mut self) {
        let models = match self.current_provider {
            Provider::Gemini => GeminiClient::list_models(),
            Provider::Ollama => {
                let client = OllamaClient::new(&self.config.ollama_url(), &self.selected_model);
                match client.list_models().await {
                    Ok(models) => models,
                    Err(err) => {
                        self.set_error(format!("Could not list Ollama models: {}", err));
                        return;
                    }
                }
            }
        };

        if models.is_empty() {
            self.set_notice("No models available for this provider");
            return;
        }

        let current_idx = models
            .iter()
            .position(|m| m == &self.selected_model)
            .unwrap_or(0);
        self.available_models = models;
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        {
            self.selected_model = model;
            self.config.default_model = Some(self.selected_model.clone());
            self.show_model_picker = false;
            self.rebuild_generator();
            if let Err(err) = Config::save_default_model(&self.selected_model) {
                tracing::warn!(error = %err, "could not save default model");
            }
        }
    }

    // Provider picker methods
    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_provider_picker(&mut self) {
        let current_idx = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider)
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current_idx));
        self.show_provider_picker = true;
    }

    /// Switch to `provider`, asking for a key first when it needs one
    pub fn choose_provider(&mut self, provider: Provider) {
        self.show_provider_picker = false;
        if self.key_source(provider).is_none() {
            self.show_api_key_input = true;
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            return;
        }
        self.switch_provider(provider);
    }

    fn switch_provider(&mut self, provider: Provider) {
        self.current_provider = provider;
        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = None;
        self.selected_model = provider.default_model().to_string();
        self.rebuild_generator();
        let saved = Config::save_provider(provider)
            .and_then(|_| Config::save_default_model(&self.selected_model));
        if let Err(err) = saved {
            tracing::warn!(error = %err, "could not save provider");
        }
    }

    pub fn submit_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        if key.is_empty() {
            return;
        }

        self.config.gemini_api_key = Some(key.clone());
        if let Err(err) = Config::save_gemini_api_key(&key) {
            tracing::warn!(error = %err, "could not save Gemini API key");
        }
        self.switch_provider(Provider::Gemini);
    }

    /// Where the credentials for `provider` come from: "env", "config", "local" or nowhere
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        if !provider.needs_api_key() {
            return Some("local");
        }
        let from_env = std::env::var(mrdoc_core::config::GEMINI_API_KEY_ENV)
            .map(|k| !k.is_empty())
            .unwrap_or(false);
        if from_env {
            Some("env")
        } else if self.config.gemini_api_key.is_some() {
            Some("config")
        } else {
            None
        }
    }

    pub fn transcript_is_empty(&self) -> bool {
        self.consultation.session().turns().is_empty()
    }
}

/// Notice text for a failed upload. File problems ask for another file; anything
/// later is reported as a classification failure.
pub fn upload_failure(name: &str, err: &DoctorError) -> String {
    if err.is_upload_error() {
        format!("Could not open {}: {}. Choose a jpg, jpeg or png file.", name, err)
    } else {
        format!("Could not classify {}: {}", name, err)
    }
}

/// Text generator for `provider`. A missing Gemini key surfaces when the first
/// request is made.
pub fn build_generator(provider: Provider, model: &str, config: &Config) -> Arc<dyn TextGenerator> {
    match provider {
        Provider::Gemini => {
            let api_key = config.gemini_api_key().unwrap_or_default();
            Arc::new(GeminiClient::new(&api_key, model))
        }
        Provider::Ollama => Arc::new(OllamaClient::new(&config.ollama_url(), model)),
    }
}
