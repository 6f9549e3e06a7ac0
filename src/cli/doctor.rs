use anyhow::Result;
use std::env;

use crate::config::{Config, FeedbackMode, LlmConfig, Provider};
use crate::llm::factory;
use crate::server;

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

/// Diagnose config, credentials and model reachability.
pub async fn run(config_path: Option<String>) -> Result<()> {
    let results = diagnose(config_path).await;
    print_results(&results);

    if !results.errors.is_empty() {
        anyhow::bail!("{} problem(s) found", results.errors.len());
    }
    Ok(())
}

async fn diagnose(config_path: Option<String>) -> CheckResult {
    let mut results = CheckResult::new();

    let mut config = match Config::load_with_source(config_path) {
        Ok((config, source)) => {
            results.pass(format!("Config loaded from {}", source));
            config
        }
        Err(e) => {
            results.error(format!("Failed to load config: {:#}", e));
            return results;
        }
    };
    if let Err(e) = config.apply_env_overrides() {
        results.error(format!("Environment override: {:#}", e));
        return results;
    }

    results.pass(format!(
        "LLM provider: {} (model: {}, base URL: {})",
        config.llm.provider,
        config.llm.model,
        config.llm.get_base_url()
    ));
    check_api_key(&config.llm, &mut results);

    if config.feedback.max_input_chars < 100 {
        results.warn(format!(
            "max_input_chars = {} truncates almost every submission",
            config.feedback.max_input_chars
        ));
    }

    match server::cors_layer(&config.server.cors_origins) {
        Ok(_) => results.pass(format!(
            "Server: {}:{} (CORS: {})",
            config.server.host,
            config.server.port,
            config.server.cors_origins.join(", ")
        )),
        Err(e) => results.error(format!("{:#}", e)),
    }

    if config.feedback.mode == FeedbackMode::Demo {
        results.pass("Feedback mode: demo (model is not called)");
        return results;
    }
    check_model(&config.llm, &mut results).await;

    results
}

fn check_api_key(llm: &LlmConfig, results: &mut CheckResult) {
    let Some(var) = llm.resolved_api_key_env() else {
        results.pass("API key: no API key needed");
        return;
    };
    let explicit = llm.api_key_env.is_some();
    let set = env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);

    if set {
        let origin = if explicit { "" } else { " (inferred from provider)" };
        results.pass(format!("API key: {} is set{}", var, origin));
        return;
    }
    if explicit {
        results.error(format!("API key: {} is configured but not set", var));
        return;
    }
    match llm.provider {
        Provider::Ollama => results.pass(format!(
            "API key: {} is not set (OK for a local Ollama daemon)",
            var
        )),
        Provider::HuggingFace => results.warn(format!(
            "API key: {} is not set (public models only, heavily rate limited)",
            var
        )),
        Provider::OpenAICompatible => results.warn(format!(
            "API key: {} is not set (OK for local models, needed for gateways)",
            var
        )),
    }
}

async fn check_model(llm: &LlmConfig, results: &mut CheckResult) {
    let client = match factory::create_client_from_llm_config(llm, false) {
        Ok(client) => client,
        Err(e) => {
            results.error(format!("Failed to create {} client: {:#}", llm.provider, e));
            return;
        }
    };
    match client.health().await {
        Ok(()) => results.pass(format!("Model {} is reachable", llm.model)),
        Err(e) => results.error(format!("Model {} is not reachable: {:#}", llm.model, e)),
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that mutate HF_TOKEN must not run in parallel.
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// RAII guard: acquires ENV_MUTEX, saves the env var, and restores on drop.
    struct EnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        var: &'static str,
        saved: Option<String>,
    }

    impl EnvGuard {
        fn new(var: &'static str) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = env::var(var).ok();
            Self {
                _lock: lock,
                var,
                saved,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.saved {
                Some(val) => env::set_var(self.var, val),
                None => env::remove_var(self.var),
            }
        }
    }

    fn llm(provider: Provider, api_key_env: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key_env: api_key_env.map(String::from),
            ..LlmConfig::default()
        }
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> Option<String> {
        let path = dir.path().join("codetutor.toml");
        std::fs::write(&path, body).unwrap();
        Some(path.to_string_lossy().into_owned())
    }

    #[test]
    fn test_check_result_collects() {
        let mut r = CheckResult::new();
        r.pass("ok");
        r.warn("hmm");
        r.error("bad");
        assert_eq!(
            (r.passed.len(), r.warnings.len(), r.errors.len()),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_check_api_key_disabled() {
        let mut r = CheckResult::new();
        check_api_key(&llm(Provider::HuggingFace, Some("none")), &mut r);
        assert!(r.passed[0].contains("no API key needed"));
    }

    #[test]
    fn test_check_api_key_inferred_and_set() {
        let _guard = EnvGuard::new("HF_TOKEN");
        env::set_var("HF_TOKEN", "hf_test");
        let mut r = CheckResult::new();
        check_api_key(&llm(Provider::HuggingFace, None), &mut r);
        assert_eq!(r.passed.len(), 1);
        assert!(r.passed[0].contains("inferred from provider"));
    }

    #[test]
    fn test_check_api_key_missing_huggingface_warns() {
        let _guard = EnvGuard::new("HF_TOKEN");
        env::remove_var("HF_TOKEN");
        let mut r = CheckResult::new();
        check_api_key(&llm(Provider::HuggingFace, None), &mut r);
        assert_eq!(r.warnings.len(), 1);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_check_api_key_explicit_missing_is_error() {
        let mut r = CheckResult::new();
        check_api_key(
            &llm(Provider::OpenAICompatible, Some("CODETUTOR_NONEXISTENT_KEY_999")),
            &mut r,
        );
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].contains("configured but not set"));
    }

    #[tokio::test]
    async fn test_diagnose_missing_config() {
        let r = diagnose(Some("/nonexistent/codetutor.toml".to_string())).await;
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].contains("Failed to load config"));
    }

    #[tokio::test]
    async fn test_diagnose_demo_mode_skips_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[llm]\napi_key_env = \"none\"\n\n[feedback]\nmode = \"demo\"\n",
        );
        let r = diagnose(path).await;
        assert!(r.errors.is_empty(), "errors: {:?}", r.errors);
        assert!(r.passed.iter().any(|m| m.contains("demo")));
    }

    #[tokio::test]
    async fn test_diagnose_unreachable_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[llm]\nprovider = \"openai-compatible\"\nbase_url = \"http://127.0.0.1:1/v1\"\napi_key_env = \"none\"\ntimeout_secs = 2\n",
        );
        let r = diagnose(path).await;
        assert!(r.errors.iter().any(|m| m.contains("not reachable")));
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, "[server]\ncors_origins = [\"bad\\norigin\"]\n");
        let err = run(path).await.unwrap_err();
        assert!(err.to_string().contains("problem(s) found"));
    }
}
