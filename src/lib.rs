//! codetutor - Educational feedback on student code
//!
//! Wraps a code-review language model (Ollama, Hugging Face or any
//! OpenAI-compatible endpoint) with level-aware prompts, a three-step
//! feedback flow, rule-based fallbacks and light static analysis. Served as
//! a CLI and as an HTTP API, with helpers for preparing fine-tuning corpora.

pub mod analyzer;
pub mod assessment;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod feedback;
pub mod level;
pub mod llm;
pub mod server;
pub mod util;
