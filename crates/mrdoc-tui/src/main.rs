use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mrdoc_core::vision::weights::download_classifier_weights;
use mrdoc_core::{
    Config, Diagnosis, ImageClassifier, ModelWeights, Provider, UploadedImage, VitClassifier,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

/// Filter directives for the log file, e.g. `MRDOC_LOG=mrdoc_core=debug`
const LOG_ENV: &str = "MRDOC_LOG";

#[derive(Parser)]
#[command(name = "mrdoc", version)]
#[command(about = "Mr Doctor: a virtual healthcare assistant for the terminal")]
struct Cli {
    /// Text generation provider for this run (gemini or ollama)
    #[arg(long)]
    provider: Option<String>,

    /// Model identifier for this run
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and cache the image classifier weights
    FetchModel,
    /// Classify a single image and print the diagnosis
    Classify {
        /// Path to a jpg, jpeg or png file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_logging();

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read config, using defaults");
        Config::new()
    });
    apply_overrides(&mut config, cli.provider.as_deref(), cli.model.as_deref())?;

    match cli.command {
        Some(Commands::FetchModel) => {
            let weights = ModelWeights::cached(config.classifier_repo(), config.classifier_file())?;
            download_classifier_weights(&weights).await?;
        }
        Some(Commands::Classify { path }) => classify_once(&config, &path).await?,
        None => run_tui(config).await?,
    }

    Ok(())
}

/// Logs go to `<cache_dir>/mrdoc/mrdoc.log`; the terminal belongs to the TUI
fn init_logging() {
    let Some(log_dir) = dirs::cache_dir().map(|d| d.join("mrdoc")) else {
        return;
    };
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("mrdoc.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

/// Command-line flags win over the config file for this run only
fn apply_overrides(config: &mut Config, provider: Option<&str>, model: Option<&str>) -> Result<()> {
    if let Some(name) = provider {
        let provider = Provider::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider '{}' (expected gemini or ollama)", name))?;
        if provider != config.provider() {
            config.default_model = None;
        }
        config.provider = Some(provider.as_str().to_string());
    }
    if let Some(model) = model {
        config.default_model = Some(model.to_string());
    }
    Ok(())
}

async fn classify_once(config: &Config, path: &std::path::Path) -> Result<()> {
    let upload = UploadedImage::open(path)?;
    let weights = ModelWeights::cached(config.classifier_repo(), config.classifier_file())?;
    let model_path = download_classifier_weights(&weights).await?;

    let mut classifier = VitClassifier::load(&model_path)?;
    let class_index = classifier.classify(upload.image())?;
    let (width, height) = upload.dimensions();

    println!("Uploaded Image: {} ({}x{})", upload.name(), width, height);
    println!("{}", Diagnosis::from_class(class_index));
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let mut app = App::new(config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    events: &mut tui::EventHandler,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // The frame above already shows "Analyzing image..."
        if app.pending_upload.is_some() {
            app.process_pending_upload().await;
            continue;
        }

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
        app.poll_reply().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_override_resets_model() {
        let mut config = Config {
            provider: Some("gemini".to_string()),
            default_model: Some("gemini-1.5-flash".to_string()),
            ..Config::default()
        };
        apply_overrides(&mut config, Some("ollama"), None).unwrap();
        assert_eq!(config.provider(), Provider::Ollama);
        assert_eq!(config.model_for(Provider::Ollama), Provider::Ollama.default_model());
    }

    #[test]
    fn test_model_override() {
        let mut config = Config::new();
        apply_overrides(&mut config, None, Some("gemini-1.5-flash")).unwrap();
        assert_eq!(config.model_for(Provider::Gemini), "gemini-1.5-flash");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut config = Config::new();
        assert!(apply_overrides(&mut config, Some("claude"), None).is_err());
    }

    #[test]
    fn test_cli_parses_classify() {
        let cli = Cli::try_parse_from(["mrdoc", "--provider", "ollama", "classify", "rash.png"]).unwrap();
        assert_eq!(cli.provider.as_deref(), Some("ollama"));
        assert!(matches!(cli.command, Some(Commands::Classify { path }) if path == PathBuf::from("rash.png")));
    }
}
