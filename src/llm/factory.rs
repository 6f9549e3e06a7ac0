use anyhow::Result;
use tracing::debug;

use super::client::LlmClient;
use super::client::MockLlmClient;
use super::client_impl::{GenerationParams, HuggingFaceClient, OllamaClient, OpenAIClient};
use crate::config::{Config, LlmConfig, Provider};

/// Sampling parameters resolved from config, with per-provider defaults filled in.
pub fn generation_params(llm_config: &LlmConfig) -> GenerationParams {
    GenerationParams {
        max_tokens: llm_config.get_max_tokens(),
        temperature: llm_config.get_temperature(),
        top_p: llm_config.top_p,
        repeat_penalty: llm_config.repeat_penalty,
    }
}

/// Create an LLM client from LlmConfig
pub fn create_client_from_llm_config(
    llm_config: &LlmConfig,
    dry_run: bool,
) -> Result<Box<dyn LlmClient>> {
    if dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let api_key = llm_config.get_api_key();
    let params = generation_params(llm_config);
    let base_url = llm_config.get_base_url();
    let timeout = llm_config.timeout_secs;

    debug!(
        "Creating {} client for model {} at {}",
        llm_config.provider, llm_config.model, base_url
    );

    match llm_config.provider {
        Provider::Ollama => Ok(Box::new(OllamaClient::new(
            base_url,
            llm_config.model.clone(),
            params,
            api_key,
            timeout,
        )?)),

        Provider::HuggingFace => Ok(Box::new(HuggingFaceClient::new(
            base_url,
            llm_config.model.clone(),
            params,
            api_key,
            timeout,
        )?)),

        Provider::OpenAICompatible => Ok(Box::new(OpenAIClient::with_base_url(
            api_key,
            llm_config.model.clone(),
            base_url,
            params,
            timeout,
        )?)),
    }
}

/// Create an LLM client based on configuration
pub fn create_client(config: &Config, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    create_client_from_llm_config(&config.llm, dry_run)
}
