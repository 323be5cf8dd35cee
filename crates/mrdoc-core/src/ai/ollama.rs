use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::error::{DoctorError, Result};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const PROVIDER: &str = "Ollama";

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(DoctorError::Provider {
                provider: PROVIDER,
                status,
                body: "failed to list models".to_string(),
            });
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        Ok(models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!(model = %self.model, url = %url, "sending Ollama request");

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DoctorError::Provider {
                provider: PROVIDER,
                status,
                body: format!("{} (is `ollama serve` running?)", body),
            });
        }

        let ollama_response: OllamaResponse = response.json().await?;
        if ollama_response.response.is_empty() {
            return Err(DoctorError::EmptyResponse(PROVIDER));
        }
        Ok(ollama_response.response)
    }

    fn label(&self) -> String {
        format!("Ollama: {}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_not_streamed() {
        let request = OllamaRequest {
            model: "llama3.2:latest",
            prompt: "hi",
            stream: false,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], serde_json::json!(false));
        assert_eq!(body["model"], "llama3.2:latest");
    }

    #[test]
    fn test_parse_model_list() {
        let parsed: OllamaModelsResponse =
            serde_json::from_str(r#"{"models":[{"name":"llama3.2:latest","size":1},{"name":"gemma3:latest"}]}"#)
                .unwrap();
        let names: Vec<String> = parsed.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3.2:latest", "gemma3:latest"]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", "m");
        assert_eq!(client.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(client.label(), "Ollama: m");
    }
}
