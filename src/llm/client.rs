use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Anything that can turn a single user prompt into generated text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<LlmResponse>;
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// OpenAI-compatible chat completions format (used by OpenRouter)
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    cost: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelCatalog {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    architecture: Option<ModelArchitecture>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelArchitecture {
    #[serde(default)]
    modality: Option<String>,
    #[serde(default)]
    output_modalities: Vec<String>,
}

impl ModelEntry {
    /// Catalog entries without architecture metadata are assumed to chat.
    fn is_chat_capable(&self) -> bool {
        match &self.architecture {
            None => true,
            Some(arch) => {
                arch.output_modalities.iter().any(|m| m == "text")
                    || arch
                        .modality
                        .as_deref()
                        .is_some_and(|m| m.ends_with("->text"))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
}

impl LlmClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Lists catalog model ids that can serve chat completions.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .send()
            .await
            .context("Failed to send request to model catalog")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model catalog error ({}): {}", status, body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read model catalog response")?;
        parse_model_catalog(&body)
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            max_tokens: 4096,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read LLM API response")?;
        parse_completion(&body)
    }
}

/// A reply without any text counts as a failed call so it can be retried.
pub(crate) fn parse_completion(body: &str) -> Result<LlmResponse> {
    let api_response: ChatCompletionResponse =
        serde_json::from_str(body).context("Failed to parse LLM API response")?;

    let text = api_response
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    if text.is_empty() {
        anyhow::bail!("LLM API returned no content");
    }

    let (input_tokens, output_tokens, cost) = match api_response.usage {
        Some(usage) => (
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.cost.unwrap_or(0.0),
        ),
        None => (0, 0, 0.0),
    };

    Ok(LlmResponse {
        text,
        input_tokens,
        output_tokens,
        cost,
    })
}

fn parse_model_catalog(body: &str) -> Result<Vec<String>> {
    let catalog: ModelCatalog =
        serde_json::from_str(body).context("Failed to parse model catalog")?;

    Ok(catalog
        .data
        .into_iter()
        .filter(|m| m.is_chat_capable())
        .map(|m| m.id)
        .collect())
}
