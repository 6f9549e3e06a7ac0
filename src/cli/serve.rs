use anyhow::Result;
use tracing::info;

use crate::config::FeedbackMode;
use crate::server;

/// Start the HTTP API. `--host`/`--port` win over config and environment.
pub async fn run(
    host: Option<String>,
    port: Option<u16>,
    demo: bool,
    config_path: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let mut config = super::load_config(config_path, model_override)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if demo {
        config.feedback.mode = FeedbackMode::Demo;
    }

    if dry_run {
        info!("Using mock LLM client");
    } else {
        info!("Using {}/{}", config.llm.provider, config.llm.model);
    }
    let client = super::build_client(&config, dry_run)?;
    server::serve(config, client).await
}
