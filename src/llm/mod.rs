pub mod client;
pub mod client_impl;
pub mod factory;
pub mod prompts;

pub use client::{LlmClient, MockLlmClient};
pub use factory::{create_client, create_client_from_llm_config};
