use anyhow::Result;
use tracing::info;

use super::OutputFormat;
use crate::config::FeedbackMode;
use crate::feedback::render;
use crate::feedback::tutor::Tutor;
use crate::util::read_source;

/// Full three-step feedback for one file (or stdin with `-`).
#[allow(clippy::too_many_arguments)]
pub async fn run(
    path: String,
    level: Option<String>,
    demo: bool,
    format: OutputFormat,
    config_path: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let output = generate(
        &path,
        level,
        demo,
        format,
        config_path,
        model_override,
        dry_run,
    )
    .await?;
    println!("{}", output);
    Ok(())
}

async fn generate(
    path: &str,
    level: Option<String>,
    demo: bool,
    format: OutputFormat,
    config_path: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<String> {
    let code = read_source(path)?;
    let mut config = super::load_config(config_path, model_override)?;
    if demo {
        config.feedback.mode = FeedbackMode::Demo;
    }
    let level = super::resolve_level(level, &config)?;

    if config.feedback.mode == FeedbackMode::Model {
        info!("Using {}/{}", config.llm.provider, config.llm.model);
    }
    let client = super::build_client(&config, dry_run)?;
    let tutor = Tutor::new(client, config.feedback.clone());
    let feedback = tutor.generate_comprehensive_feedback(&code, level).await?;

    match format {
        OutputFormat::Markdown => Ok(render::to_markdown(&feedback)),
        OutputFormat::Json => render::to_json(&feedback),
    }
}
