use anyhow::{bail, Result};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    Assessment, CodeSubmission, FeedbackCategories, Suggestion, DEFAULT_SCORE, DEFAULT_SUMMARY,
};
use crate::analyzer::{AnalysisReport, Severity, StaticAnalyzer};
use crate::feedback::extract_json_block;
use crate::llm::{prompts, LlmClient};
use crate::util::truncate_chars;

const SUMMARY_LIMIT: usize = 500;

/// Accepts 82, 82.5 or "82".
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|score: &f64| score.is_finite()))
}

/// What the model returns; every field may be missing.
#[derive(Debug, Default, Deserialize)]
struct AssessmentReply {
    #[serde(default, deserialize_with = "lenient_score")]
    overall_score: Option<f64>,
    #[serde(default)]
    feedback_categories: Option<FeedbackCategories>,
    #[serde(default)]
    specific_suggestions: Option<Vec<Suggestion>>,
    #[serde(default)]
    corrected_code: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    strengths: Option<Vec<String>>,
    #[serde(default)]
    areas_for_improvement: Option<Vec<String>>,
}

/// Scores a submission with the model, then folds in static analysis.
pub struct AssessmentService {
    client: Arc<dyn LlmClient>,
    analyzer: StaticAnalyzer,
    max_input_chars: usize,
}

impl AssessmentService {
    pub fn new(client: Arc<dyn LlmClient>, max_input_chars: usize) -> Self {
        Self {
            client,
            analyzer: StaticAnalyzer::new(),
            max_input_chars,
        }
    }

    pub async fn assess(&self, submission: &CodeSubmission) -> Result<Assessment> {
        if submission.code.trim().is_empty() {
            bail!("No code provided");
        }

        let mut submission = submission.clone();
        let limited = truncate_chars(&submission.code, self.max_input_chars);
        if limited.len() < submission.code.len() {
            warn!(
                "Code truncated to {} characters before sending to the model",
                self.max_input_chars
            );
            submission.code = limited.to_string();
        }

        info!("Analyzing {} code submission", submission.language);
        let raw = self
            .client
            .complete(&prompts::assessment_prompt(&submission))
            .await?;

        let assessment = parse_assessment(&raw);
        let report = self.analyzer.analyze(&submission.code, submission.language);
        debug!(
            "Static analysis found {} issue(s), adjustment {}",
            report.issues.len(),
            report.score_adjustment
        );

        Ok(enhance(assessment, &report))
    }
}

/// Parse a model reply, falling back to a summary-only assessment when it
/// contains no usable JSON.
pub fn parse_assessment(raw: &str) -> Assessment {
    let json = extract_json_block(raw);
    match serde_json::from_str::<AssessmentReply>(&json) {
        Ok(reply) => Assessment {
            overall_score: reply
                .overall_score
                .unwrap_or(DEFAULT_SCORE)
                .clamp(0.0, 100.0),
            feedback_categories: reply.feedback_categories.unwrap_or_default(),
            specific_suggestions: reply.specific_suggestions.unwrap_or_default(),
            corrected_code: reply.corrected_code.filter(|c| !c.trim().is_empty()),
            summary: reply
                .summary
                .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            strengths: reply.strengths.unwrap_or_default(),
            areas_for_improvement: reply.areas_for_improvement.unwrap_or_default(),
            generated_at: Utc::now(),
        },
        Err(e) => {
            warn!("Failed to parse JSON from model response: {}", e);
            fallback_assessment(raw)
        }
    }
}

pub fn fallback_assessment(raw: &str) -> Assessment {
    let summary = if raw.chars().count() > SUMMARY_LIMIT {
        format!("{}...", truncate_chars(raw, SUMMARY_LIMIT))
    } else {
        raw.to_string()
    };

    Assessment {
        overall_score: DEFAULT_SCORE,
        feedback_categories: FeedbackCategories {
            correctness: Some("Analysis provided in summary".to_string()),
            style: Some("Style feedback included in summary".to_string()),
            efficiency: Some("Efficiency notes in summary".to_string()),
            best_practices: Some("Best practices mentioned in summary".to_string()),
            debugging: None,
        },
        specific_suggestions: vec![Suggestion {
            line_number: None,
            issue_type: "general".to_string(),
            description: "Detailed analysis provided".to_string(),
            suggestion: "See summary for specific recommendations".to_string(),
            severity: Severity::Medium,
        }],
        corrected_code: None,
        summary,
        strengths: vec!["Code submitted for review".to_string()],
        areas_for_improvement: vec!["See detailed feedback above".to_string()],
        generated_at: Utc::now(),
    }
}

/// Append static issues as suggestions and apply the score adjustment.
pub fn enhance(mut assessment: Assessment, report: &AnalysisReport) -> Assessment {
    assessment
        .specific_suggestions
        .extend(report.issues.iter().map(|issue| Suggestion {
            line_number: issue.line_number,
            issue_type: "static_analysis".to_string(),
            description: issue.description.clone(),
            suggestion: issue.suggestion.clone(),
            severity: issue.severity,
        }));
    assessment.overall_score =
        (assessment.overall_score + f64::from(report.score_adjustment)).clamp(0.0, 100.0);
    assessment
}
