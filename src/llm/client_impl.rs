use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::LlmClient;
use crate::util::SecretString;

/// Sampling knobs shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.3,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

// ============================================================================
// Ollama Client
// ============================================================================

pub struct OllamaClient {
    base_url: String,
    model: String,
    params: GenerationParams,
    api_key: SecretString,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaClient {
    pub fn new(
        base_url: String,
        model: String,
        params: GenerationParams,
        api_key: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
            api_key: api_key.into(),
            client: build_http_client(timeout_secs)?,
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_blank() {
            req
        } else {
            req.bearer_auth(self.api_key.expose())
        }
    }
}

/// "codellama:7b" matches "codellama:7b"; "codellama" matches "codellama:latest".
fn ollama_model_listed(available: &[OllamaModel], wanted: &str) -> bool {
    available.iter().any(|m| {
        m.name == wanted || m.name.strip_suffix(":latest") == Some(wanted)
    })
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.params.temperature,
                num_predict: self.params.max_tokens,
                top_p: self.params.top_p,
                repeat_penalty: self.params.repeat_penalty,
            },
        };

        debug!(
            "Calling Ollama at {} with model: {}",
            self.base_url, self.model
        );

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .authorize(self.client.post(&url).json(&request))
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, error_text);
        }

        let api_response: OllamaGenerateResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(api_response.response.trim().to_string())
    }

    async fn health(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Ollama is not reachable at {}", self.base_url))?;

        if !response.status().is_success() {
            bail!("Ollama API error {} listing models", response.status());
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .context("Failed to parse Ollama model list")?;

        if !ollama_model_listed(&tags.models, &self.model) {
            bail!(
                "Model {} is not available in Ollama (run `ollama pull {}`)",
                self.model,
                self.model
            );
        }
        Ok(())
    }
}

// ============================================================================
// Hugging Face Inference Client
// ============================================================================

pub struct HuggingFaceClient {
    base_url: String,
    model: String,
    params: GenerationParams,
    api_key: SecretString,
    client: Client,
}

#[derive(Debug, Serialize)]
struct HfRequest {
    inputs: String,
    parameters: HfParameters,
}

#[derive(Debug, Serialize)]
struct HfParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct HfGeneration {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Generations(Vec<HfGeneration>),
    Single(HfGeneration),
    Error { error: String },
}

impl HuggingFaceClient {
    pub fn new(
        base_url: String,
        model: String,
        params: GenerationParams,
        api_key: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
            api_key: api_key.into(),
            client: build_http_client(timeout_secs)?,
        })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

/// Some endpoints echo the prompt even with return_full_text=false.
fn strip_prompt_echo(generated: &str, prompt: &str) -> String {
    generated
        .strip_prefix(prompt)
        .unwrap_or(generated)
        .trim()
        .to_string()
}

#[async_trait]
impl LlmClient for HuggingFaceClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = HfRequest {
            inputs: prompt.to_string(),
            parameters: HfParameters {
                max_new_tokens: self.params.max_tokens,
                temperature: self.params.temperature,
                top_p: self.params.top_p,
                do_sample: true,
                return_full_text: false,
            },
        };

        debug!("Calling Hugging Face Inference API with model: {}", self.model);

        let mut req = self.client.post(self.model_url()).json(&request);
        if !self.api_key.is_blank() {
            req = req.bearer_auth(self.api_key.expose());
        }

        let response = req
            .send()
            .await
            .context("Failed to send request to Hugging Face Inference API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Hugging Face API error {}: {}", status, error_text);
        }

        let api_response: HfResponse = response
            .json()
            .await
            .context("Failed to parse Hugging Face response")?;

        match api_response {
            HfResponse::Generations(generations) => generations
                .first()
                .map(|g| strip_prompt_echo(&g.generated_text, prompt))
                .context("No generations in Hugging Face response"),
            HfResponse::Single(generation) => {
                Ok(strip_prompt_echo(&generation.generated_text, prompt))
            }
            HfResponse::Error { error } => bail!("Hugging Face API error: {}", error),
        }
    }

    async fn health(&self) -> Result<()> {
        let mut req = self.client.get(self.model_url());
        if !self.api_key.is_blank() {
            req = req.bearer_auth(self.api_key.expose());
        }
        let response = req
            .send()
            .await
            .context("Hugging Face Inference API is not reachable")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Model {} unavailable ({}): {}", self.model, status, error_text);
        }
        Ok(())
    }
}

// ============================================================================
// OpenAI-compatible Client
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    params: GenerationParams,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIClient {
    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        params: GenerationParams,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            params,
            client: build_http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            max_tokens: self.params.max_tokens,
        };

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, self.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(&request);

        // Only add authorization if a key is present
        if !self.api_key.is_blank() {
            req = req.bearer_auth(self.api_key.expose());
        }

        let response = req
            .send()
            .await
            .context("Failed to send request to OpenAI-compatible API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("OpenAI-compatible API error {}: {}", status, error_text);
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI-compatible response")?;

        api_response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .context("No choices in OpenAI-compatible response")
    }

    async fn health(&self) -> Result<()> {
        let mut req = self.client.get(format!("{}/models", self.base_url));
        if !self.api_key.is_blank() {
            req = req.bearer_auth(self.api_key.expose());
        }
        let response = req
            .send()
            .await
            .with_context(|| format!("OpenAI-compatible API at {} is not reachable", self.base_url))?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("OpenAI-compatible API error {}: {}", status, error_text);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
