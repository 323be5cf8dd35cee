pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use async_trait::async_trait;

use crate::error::Result;

/// A hosted or local text-generation model
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short "provider: model" label for display
    fn label(&self) -> String;
}
