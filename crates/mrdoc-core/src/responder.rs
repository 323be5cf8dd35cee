use std::sync::Arc;

use crate::ai::TextGenerator;
use crate::error::Result;
use crate::prompt::PromptTemplate;
use crate::state::ChatTurn;

/// Renders the healthcare prompt and hands it to the configured text generator.
/// Cloning is cheap so a reply can be produced on a background task.
#[derive(Clone)]
pub struct Responder {
    template: PromptTemplate,
    generator: Arc<dyn TextGenerator>,
}

/// A rendered prompt waiting to be sent
pub struct PendingReply {
    prompt: String,
    generator: Arc<dyn TextGenerator>,
}

impl Responder {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            template: PromptTemplate::healthcare(),
            generator,
        }
    }

    pub fn generator_label(&self) -> String {
        self.generator.label()
    }

    pub fn set_generator(&mut self, generator: Arc<dyn TextGenerator>) {
        self.generator = generator;
    }

    pub fn prepare(&self, question: &str, history: &[ChatTurn]) -> PendingReply {
        PendingReply {
            prompt: self.template.render(history, question),
            generator: Arc::clone(&self.generator),
        }
    }

    /// Answer `question` given the turns that came before it.
    /// Provider failures are returned as-is; there is no retry.
    pub async fn respond(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        self.prepare(question, history).resolve().await
    }
}

impl PendingReply {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub async fn resolve(self) -> Result<String> {
        let label = self.generator.label();
        match self.generator.generate(&self.prompt).await {
            Ok(reply) => {
                tracing::info!(generator = %label, reply_chars = reply.len(), "reply received");
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(generator = %label, error = %e, "text generation failed");
                Err(e)
            }
        }
    }
}
