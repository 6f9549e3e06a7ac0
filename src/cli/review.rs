use anyhow::Result;

use crate::feedback::tutor::Tutor;
use crate::feedback::{render, rules};
use crate::util::read_source;

/// Model code review plus educational guidance, adapted to the student level.
pub async fn run(
    path: String,
    level: Option<String>,
    config_path: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let code = read_source(&path)?;
    let config = super::load_config(config_path, model_override)?;
    let level = super::resolve_level(level, &config)?;

    let tutor = Tutor::new(super::build_client(&config, dry_run)?, config.feedback.clone());
    let items: Vec<_> = tutor
        .analyze_student_code(&code, level)
        .await?
        .into_iter()
        .map(|item| rules::adapt_feedback_complexity(item, level))
        .collect();

    print!("{}", render::code_feedback_to_markdown(&items));
    Ok(())
}
