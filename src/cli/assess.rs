use anyhow::Result;
use std::str::FromStr;
use tracing::info;

use crate::assessment::{AssessmentService, CodeSubmission, FeedbackType};
use crate::detector::{detect_language, Language};
use crate::util::read_source;

/// Scored assessment of one file, printed as JSON.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    path: String,
    language: Option<String>,
    context: Option<String>,
    feedback_type: String,
    level: Option<String>,
    config_path: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let code = read_source(&path)?;
    let config = super::load_config(config_path, model_override)?;

    let submission = CodeSubmission {
        language: match language {
            Some(raw) => Language::from_str(&raw)?,
            None => {
                let detected = detect_language(&code);
                info!("Detected language: {}", detected);
                detected
            }
        },
        code,
        assignment_context: context,
        feedback_type: FeedbackType::from_str(&feedback_type)?,
        student_level: super::resolve_level(level, &config)?,
    };

    let service = AssessmentService::new(
        super::build_client(&config, dry_run)?,
        config.feedback.max_input_chars,
    );
    let assessment = service.assess(&submission).await?;
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
